//! Error types for the staking ledger.

use stake_shared_types::{Address, Amount, Role, RoleId, Timestamp};
use thiserror::Error;

use crate::transfer::TransferError;

/// Every way a ledger operation can be refused. None of these are retried by the
/// ledger; the caller corrects its input or waits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // Authorization
    #[error("Caller {0} does not hold the administrator capability")]
    AdminRequired(Address),

    #[error("Principal {0} is not registered")]
    NotRegistered(Address),

    // Validation
    /// `granted` lists the roles of the same call that were already applied and stay
    /// in effect.
    #[error("Unknown role id {role_id} (roles already granted by this call: {granted:?})")]
    UnknownRole { role_id: RoleId, granted: Vec<Role> },

    #[error("Role {role} is already held (roles already granted by this call: {granted:?})")]
    RoleAlreadyHeld { role: Role, granted: Vec<Role> },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Stake amount must be greater than zero")]
    ZeroStakeAmount,

    #[error("Invalid transfer recipient")]
    InvalidRecipient,

    // Insufficient funds or state
    #[error("Registration deposit too small: required {required}, provided {provided}")]
    InsufficientDeposit { required: Amount, provided: Amount },

    #[error("Staked balance must be zero, found {0}")]
    NonZeroBalance(Amount),

    #[error("Pending withdrawal balance must be zero, found {0}")]
    PendingWithdrawalNonZero(Amount),

    #[error("Nothing to unstake")]
    NothingToUnstake,

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Insufficient staked balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Amount, requested: Amount },

    #[error("No slashed funds to sweep")]
    NothingToSweep,

    #[error("Balance arithmetic overflow")]
    BalanceOverflow,

    // Timing
    #[error("Withdrawal wait time not elapsed: now {now}, unlocks at {unlock_time}")]
    WaitTimeNotElapsed { now: Timestamp, unlock_time: Timestamp },

    // External
    #[error("Value transfer failed: {0}")]
    TransferFailed(#[from] TransferError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
