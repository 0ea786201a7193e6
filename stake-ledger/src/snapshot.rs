//! Point-in-time copies of the full ledger state.
//!
//! File layout: `magic (4) | version (u32 LE) | bincode payload | blake3(payload) (32)`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stake_registry::{RegistryError, RoleStore};
use stake_shared_types::{Address, Amount, Role, StakerAccount, Timestamp};
use thiserror::Error;

use crate::audit_log;
use crate::clock::Clock;
use crate::config::Configuration;
use crate::constants::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use crate::events::EventSink;
use crate::ledger::StakingLedger;
use crate::transfer::ValueTransfer;

const HEADER_LEN: usize = 8;
const CHECKSUM_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot too short: {0} bytes")]
    Truncated(usize),

    #[error("Not a ledger snapshot (bad magic)")]
    BadMagic,

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("Snapshot checksum mismatch")]
    ChecksumMismatch,

    #[error("Snapshot role table rejected by registry: {0}")]
    Registry(#[from] RegistryError),
}

impl From<bincode::Error> for SnapshotError {
    fn from(err: bincode::Error) -> Self {
        SnapshotError::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub taken_at: Timestamp,
    pub config: Configuration,
    pub slashed_total: Amount,
    /// Sorted by address.
    pub accounts: Vec<(Address, StakerAccount)>,
    /// Sorted by address.
    pub roles: Vec<(Address, Vec<Role>)>,
}

impl LedgerSnapshot {
    fn payload(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// blake3 hash of the ledger state. `taken_at` is left out, so the same state
    /// captured at different times hashes identically.
    pub fn state_hash(&self) -> Result<[u8; 32], SnapshotError> {
        let state = bincode::serialize(&(&self.config, self.slashed_total, &self.accounts, &self.roles))?;
        Ok(blake3::hash(&state).into())
    }

    /// Staked, pending and slashed value owed at the time of the snapshot. A vault
    /// backing the restored ledger must hold exactly this much.
    pub fn total_holdings(&self) -> u128 {
        let owed: u128 = self
            .accounts
            .iter()
            .map(|(_, account)| account.staked_balance as u128 + account.pending_withdrawal_balance as u128)
            .sum();
        owed + self.slashed_total as u128
    }

    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let payload = self.payload()?;
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
        out.extend_from_slice(&SNAPSHOT_MAGIC);
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(blake3::hash(&payload).as_bytes());
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(SnapshotError::Truncated(bytes.len()));
        }
        if bytes[..4] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let (payload, checksum) = bytes[HEADER_LEN..].split_at(bytes.len() - HEADER_LEN - CHECKSUM_LEN);
        if blake3::hash(payload).as_bytes() != checksum {
            return Err(SnapshotError::ChecksumMismatch);
        }
        Ok(bincode::deserialize(payload)?)
    }

    /// Writes the snapshot next to `path` and renames it into place.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SnapshotError> {
        let encoded = self.encode()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &encoded)?;
        fs::rename(&tmp, path)?;
        audit_log::log_snapshot("written", self.accounts.len(), &self.state_hash()?);
        Ok(())
    }

    /// Returns `Ok(None)` when no snapshot exists at `path`.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = Self::decode(&bytes)?;
        audit_log::log_snapshot("loaded", snapshot.accounts.len(), &snapshot.state_hash()?);
        Ok(Some(snapshot))
    }
}

impl<R: RoleStore> StakingLedger<R> {
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut accounts: Vec<(Address, StakerAccount)> =
            self.accounts().map(|(address, account)| (*address, *account)).collect();
        accounts.sort_by(|a, b| a.0.cmp(&b.0));

        LedgerSnapshot {
            taken_at: self.now(),
            config: self.configuration(),
            slashed_total: self.slashed_total(),
            accounts,
            roles: self.role_store().members(),
        }
    }

    /// Rebuilds a ledger from `snapshot`. `roles` should be empty; every membership in
    /// the snapshot is granted into it.
    pub fn restore(
        snapshot: LedgerSnapshot,
        mut roles: R,
        transfer: Box<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
        events: Box<dyn EventSink>,
    ) -> Result<Self, SnapshotError> {
        for (principal, held) in &snapshot.roles {
            for role in held {
                roles.grant(principal, role.id())?;
            }
        }
        let accounts: HashMap<Address, StakerAccount> = snapshot.accounts.into_iter().collect();
        Ok(StakingLedger::from_parts(
            snapshot.config,
            accounts,
            snapshot.slashed_total,
            roles,
            transfer,
            clock,
            events,
        ))
    }
}
