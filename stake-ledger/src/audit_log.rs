//! Audit logging for ledger state changes.

use stake_shared_types::{Address, Amount, LedgerEvent, Role};
use tracing::{event, Level};

use crate::error::LedgerError;
use crate::transfer::TransferError;

/// Logs a committed ledger event.
#[tracing::instrument(level = "info", skip(ledger_event))]
pub fn log_ledger_event(ledger_event: &LedgerEvent) {
    match ledger_event {
        LedgerEvent::Registered { principal, role_ids } => {
            event!(Level::INFO, "Staker registered: principal={}, role_ids={:?}", principal, role_ids);
        }
        LedgerEvent::Unregistered { principal } => {
            event!(Level::INFO, "Staker unregistered: principal={}", principal);
        }
        LedgerEvent::Staked { principal, amount } => {
            event!(Level::INFO, "Stake added: principal={}, amount={}", principal, amount);
        }
        LedgerEvent::Unstaked { principal, amount, unlock_time } => {
            event!(
                Level::INFO,
                "Stake moved to pending withdrawal: principal={}, amount={}, unlock_time={}",
                principal,
                amount,
                unlock_time
            );
        }
        LedgerEvent::Withdrawn { principal, amount } => {
            event!(Level::INFO, "Withdrawal paid: principal={}, amount={}", principal, amount);
        }
        LedgerEvent::Slashed { principal, amount, admin } => {
            event!(Level::WARN, "Staker slashed: principal={}, amount={}, admin={}", principal, amount, admin);
        }
        LedgerEvent::SlashedSwept { recipient, amount, admin } => {
            event!(Level::INFO, "Slashed pool swept: recipient={}, amount={}, admin={}", recipient, amount, admin);
        }
        LedgerEvent::RoleGranted { principal, role, admin } => {
            event!(Level::INFO, "Role granted: principal={}, role={}, admin={}", principal, role, admin);
        }
        LedgerEvent::RoleRevoked { principal, role, admin } => {
            event!(Level::INFO, "Role revoked: principal={}, role={}, admin={}", principal, role, admin);
        }
        LedgerEvent::ConfigurationUpdated { registration_deposit_amount, withdrawal_wait_time, admin } => {
            event!(
                Level::INFO,
                "Configuration updated: registration_deposit_amount={}, withdrawal_wait_time={}, admin={}",
                registration_deposit_amount,
                withdrawal_wait_time,
                admin
            );
        }
    }
}

/// Logs an operation the ledger refused.
#[tracing::instrument(level = "debug", skip(caller, error))]
pub fn log_operation_rejected(operation: &str, caller: &Address, error: &LedgerError) {
    event!(Level::DEBUG, "Ledger operation rejected: operation={}, caller={}, error={}", operation, caller, error);
}

/// Logs a register call that failed after some of its roles were granted.
#[tracing::instrument(level = "warn", skip(principal, granted))]
pub fn log_partial_registration(principal: &Address, granted: &[Role]) {
    event!(Level::WARN, "Registration failed with roles left granted: principal={}, granted={:?}", principal, granted);
}

/// Logs an outbound transfer the collaborator refused.
#[tracing::instrument(level = "warn", skip(recipient, error))]
pub fn log_transfer_failed(recipient: &Address, amount: Amount, error: &TransferError) {
    event!(Level::WARN, "Outbound transfer failed: recipient={}, amount={}, error={}", recipient, amount, error);
}

/// Logs a snapshot written to or read from disk.
#[tracing::instrument(level = "info", skip(state_hash))]
pub fn log_snapshot(action: &str, accounts: usize, state_hash: &[u8; 32]) {
    event!(Level::INFO, "Ledger snapshot {}: accounts={}, state_hash={}", action, accounts, hex::encode(state_hash));
}
