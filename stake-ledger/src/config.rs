use serde::{Deserialize, Serialize};
use stake_shared_types::Amount;

use crate::constants::{DEFAULT_REGISTRATION_DEPOSIT_AMOUNT, DEFAULT_WITHDRAWAL_WAIT_TIME};

/// Ledger policy. Owned by the ledger instance and replaced only through the
/// admin-gated `set_configuration`. Zero disables the corresponding guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Minimum value a principal without any staker role must attach to `register`.
    pub registration_deposit_amount: Amount,
    /// Seconds between `unstake` and the moment the pending balance unlocks.
    pub withdrawal_wait_time: u64,
}

impl Configuration {
    pub fn new(registration_deposit_amount: Amount, withdrawal_wait_time: u64) -> Self {
        Configuration { registration_deposit_amount, withdrawal_wait_time }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            registration_deposit_amount: DEFAULT_REGISTRATION_DEPOSIT_AMOUNT,
            withdrawal_wait_time: DEFAULT_WITHDRAWAL_WAIT_TIME,
        }
    }
}
