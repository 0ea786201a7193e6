use confy::ConfyError;
use serde::{Deserialize, Serialize};
use stake_ledger::constants::DEFAULT_EVENT_LOG_CAPACITY;
use stake_ledger::Configuration;
use std::time::Duration;
use stake_shared_types::Address;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "stake-ledger";
pub const CONFIG_NAME: &str = "node-config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub rpc_addr: SocketAddr,
    pub rpc_threads: usize,
    pub data_dir: PathBuf,
    pub snapshot_file: String,
    /// Receives the administrator capability when the node starts without a snapshot.
    pub admin: Address,
    /// Events kept in memory for `get_events`; older ones are evicted.
    pub event_log_capacity: usize,
    /// Seconds between periodic snapshots. `0` writes a snapshot only at shutdown.
    pub snapshot_interval_secs: u64,
    /// Policy for a fresh ledger. A restored ledger keeps the policy from its snapshot.
    pub ledger: Configuration,
    /// API key -> principal the key acts as.
    pub api_keys: BTreeMap<String, Address>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_addr: SocketAddr::from(([127, 0, 0, 1], 8545)),
            rpc_threads: 4,
            data_dir: PathBuf::from("./stake-data"),
            snapshot_file: "ledger.snapshot".to_string(),
            admin: Address::ZERO,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            snapshot_interval_secs: 300,
            ledger: Configuration::default(),
            api_keys: BTreeMap::new(),
        }
    }
}

impl NodeConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    pub fn snapshot_interval(&self) -> Option<Duration> {
        (self.snapshot_interval_secs > 0).then(|| Duration::from_secs(self.snapshot_interval_secs))
    }
}

/// Loads from `path`, or from the per-user confy location when no path is given.
/// A missing file is created with defaults.
pub fn load(path: Option<&Path>) -> Result<NodeConfig, ConfyError> {
    match path {
        Some(path) => confy::load_path(path),
        None => confy::load(APP_NAME, CONFIG_NAME),
    }
}

pub fn store(path: Option<&Path>, cfg: &NodeConfig) -> Result<(), ConfyError> {
    match path {
        Some(path) => confy::store_path(path, cfg),
        None => confy::store(APP_NAME, CONFIG_NAME, cfg),
    }
}

pub fn file_path(path: Option<&Path>) -> Result<PathBuf, ConfyError> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => confy::get_configuration_file_path(APP_NAME, CONFIG_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node-config.toml");
        assert_eq!(load(Some(&path)).unwrap(), NodeConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_store_then_load_keeps_keys_and_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node-config.toml");

        let mut cfg = NodeConfig::default();
        cfg.admin = Address([0xAA; 20]);
        cfg.ledger = Configuration::new(250, 3_600);
        cfg.event_log_capacity = 64;
        cfg.snapshot_interval_secs = 0;
        cfg.api_keys.insert("admin-key".to_string(), Address([0xAA; 20]));
        cfg.api_keys.insert("staker-key".to_string(), Address([0x01; 20]));
        store(Some(&path), &cfg).unwrap();

        assert_eq!(load(Some(&path)).unwrap(), cfg);
        assert_eq!(cfg.snapshot_path(), PathBuf::from("./stake-data").join("ledger.snapshot"));
        assert_eq!(cfg.snapshot_interval(), None);
        assert_eq!(NodeConfig::default().snapshot_interval(), Some(Duration::from_secs(300)));
    }
}
