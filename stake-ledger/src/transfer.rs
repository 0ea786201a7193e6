//! Value movement into and out of the ledger.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use stake_shared_types::{Address, Amount};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Vault balance {available} cannot cover {requested}")]
    InsufficientVaultBalance { available: Amount, requested: Amount },

    #[error("Recipient {0} rejected the transfer")]
    RecipientRejected(Address),

    #[error("Transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// Native value collaborator.
///
/// `credit` records value that accompanied an inbound call and cannot fail. `debit`
/// pays out of the ledger and must be checked; the ledger commits the matching state
/// change only after it returns `Ok`.
pub trait ValueTransfer: Send {
    fn credit(&mut self, from: &Address, amount: Amount);

    fn debit(&mut self, recipient: &Address, amount: Amount) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct VaultState {
    balance: Amount,
    total_credited: u128,
    total_paid_out: u128,
    deposits: HashMap<Address, Amount>,
    payouts: HashMap<Address, Amount>,
    blocked: HashSet<Address>,
}

/// In-process vault holding the value attached to ledger calls.
///
/// Cloning yields another handle on the same vault, so a host can keep one handle for
/// inspection while the ledger owns the other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVault {
    state: Arc<Mutex<VaultState>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        InMemoryVault::default()
    }

    /// A vault already holding `balance`, e.g. when resuming from a snapshot.
    pub fn with_balance(balance: Amount) -> Self {
        let vault = InMemoryVault::default();
        {
            let mut state = vault.lock();
            state.balance = balance;
            state.total_credited = balance as u128;
        }
        vault
    }

    fn lock(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn balance(&self) -> Amount {
        self.lock().balance
    }

    pub fn total_credited(&self) -> u128 {
        self.lock().total_credited
    }

    pub fn total_paid_out(&self) -> u128 {
        self.lock().total_paid_out
    }

    pub fn deposited_by(&self, principal: &Address) -> Amount {
        self.lock().deposits.get(principal).copied().unwrap_or(0)
    }

    pub fn paid_to(&self, recipient: &Address) -> Amount {
        self.lock().payouts.get(recipient).copied().unwrap_or(0)
    }

    /// Makes every later debit to `recipient` fail with `RecipientRejected`.
    pub fn block_recipient(&self, recipient: Address) {
        self.lock().blocked.insert(recipient);
    }

    pub fn unblock_recipient(&self, recipient: &Address) {
        self.lock().blocked.remove(recipient);
    }
}

impl ValueTransfer for InMemoryVault {
    fn credit(&mut self, from: &Address, amount: Amount) {
        let mut state = self.lock();
        state.balance = state.balance.saturating_add(amount);
        state.total_credited += amount as u128;
        let deposited = state.deposits.entry(*from).or_insert(0);
        *deposited = deposited.saturating_add(amount);
        debug!("Vault credited {} from {}", amount, from);
    }

    fn debit(&mut self, recipient: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.lock();
        if state.blocked.contains(recipient) {
            return Err(TransferError::RecipientRejected(*recipient));
        }
        if state.balance < amount {
            return Err(TransferError::InsufficientVaultBalance { available: state.balance, requested: amount });
        }
        state.balance -= amount;
        state.total_paid_out += amount as u128;
        let paid = state.payouts.entry(*recipient).or_insert(0);
        *paid = paid.saturating_add(amount);
        debug!("Vault paid {} to {}", amount, recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_tracks_flows() {
        let mut vault = InMemoryVault::new();
        let handle = vault.clone();
        let alice = Address([1u8; 20]);

        vault.credit(&alice, 150);
        vault.debit(&alice, 100).unwrap();

        assert_eq!(handle.balance(), 50);
        assert_eq!(handle.total_credited(), 150);
        assert_eq!(handle.total_paid_out(), 100);
        assert_eq!(handle.deposited_by(&alice), 150);
        assert_eq!(handle.paid_to(&alice), 100);
    }

    #[test]
    fn test_vault_refuses_overdraft_and_blocked_recipients() {
        let mut vault = InMemoryVault::with_balance(10);
        let bob = Address([2u8; 20]);

        assert_eq!(
            vault.debit(&bob, 11),
            Err(TransferError::InsufficientVaultBalance { available: 10, requested: 11 })
        );

        vault.block_recipient(bob);
        assert_eq!(vault.debit(&bob, 5), Err(TransferError::RecipientRejected(bob)));
        assert_eq!(vault.balance(), 10);

        vault.unblock_recipient(&bob);
        assert!(vault.debit(&bob, 5).is_ok());
    }
}
