use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Role, RoleId, Timestamp};

/// Notifications emitted by the ledger after a state change commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Registered {
        principal: Address,
        /// The role ids as requested by the caller.
        role_ids: Vec<RoleId>,
    },
    Unregistered {
        principal: Address,
    },
    Staked {
        principal: Address,
        amount: Amount,
    },
    Unstaked {
        principal: Address,
        amount: Amount,
        unlock_time: Timestamp,
    },
    Withdrawn {
        principal: Address,
        amount: Amount,
    },
    Slashed {
        principal: Address,
        amount: Amount,
        admin: Address,
    },
    SlashedSwept {
        recipient: Address,
        amount: Amount,
        admin: Address,
    },
    RoleGranted {
        principal: Address,
        role: Role,
        admin: Address,
    },
    RoleRevoked {
        principal: Address,
        role: Role,
        admin: Address,
    },
    ConfigurationUpdated {
        registration_deposit_amount: Amount,
        withdrawal_wait_time: u64,
        admin: Address,
    },
}

impl LedgerEvent {
    /// The principal whose account or roles the event concerns.
    pub fn subject(&self) -> Option<&Address> {
        match self {
            LedgerEvent::Registered { principal, .. }
            | LedgerEvent::Unregistered { principal }
            | LedgerEvent::Staked { principal, .. }
            | LedgerEvent::Unstaked { principal, .. }
            | LedgerEvent::Withdrawn { principal, .. }
            | LedgerEvent::Slashed { principal, .. }
            | LedgerEvent::RoleGranted { principal, .. }
            | LedgerEvent::RoleRevoked { principal, .. } => Some(principal),
            LedgerEvent::SlashedSwept { recipient, .. } => Some(recipient),
            LedgerEvent::ConfigurationUpdated { .. } => None,
        }
    }
}
