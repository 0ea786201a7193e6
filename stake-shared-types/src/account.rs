use serde::{Deserialize, Serialize};

use crate::{Amount, Timestamp};

/// Balances and timelock of a single principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StakerAccount {
    /// Value currently at risk.
    pub staked_balance: Amount,
    /// Value unstaked but not yet withdrawn.
    pub pending_withdrawal_balance: Amount,
    /// Earliest time `pending_withdrawal_balance` may be withdrawn. Meaningless while
    /// the pending balance is zero.
    pub withdrawal_unlock_time: Timestamp,
}

/// Lifecycle position of a principal, derived from its roles and balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakerState {
    Unregistered,
    Registered,
    Staked,
    PendingWithdrawal,
    StakedWithPendingWithdrawal,
}

impl StakerAccount {
    pub fn is_empty(&self) -> bool {
        self.staked_balance == 0 && self.pending_withdrawal_balance == 0
    }

    pub fn is_unlocked(&self, now: Timestamp) -> bool {
        now >= self.withdrawal_unlock_time
    }

    pub fn state(&self, registered: bool) -> StakerState {
        if !registered {
            return StakerState::Unregistered;
        }
        match (self.staked_balance > 0, self.pending_withdrawal_balance > 0) {
            (false, false) => StakerState::Registered,
            (true, false) => StakerState::Staked,
            (false, true) => StakerState::PendingWithdrawal,
            (true, true) => StakerState::StakedWithPendingWithdrawal,
        }
    }
}
