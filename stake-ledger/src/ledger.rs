//! The staker lifecycle state machine.
//!
//! A principal's position is inferred from its roles and balances:
//! `Unregistered -> Registered -> Staked <-> PendingWithdrawal -> Unregistered`.
//! Every operation checks authorization against the role store first, then mutates
//! ledger state, then talks to the value-transfer collaborator. Outbound transfers are
//! confirmed before the matching balance is zeroed, so a refused transfer leaves the
//! ledger exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use stake_registry::{MemoryRoleRegistry, RegistryError, RoleStore};
use stake_shared_types::{
    Address, Amount, LedgerEvent, Role, RoleId, StakerAccount, StakerState, Timestamp, STAKER_ROLES,
};

use crate::audit_log;
use crate::clock::Clock;
use crate::config::Configuration;
use crate::error::{LedgerError, Result};
use crate::events::EventSink;
use crate::transfer::ValueTransfer;

pub struct StakingLedger<R: RoleStore = MemoryRoleRegistry> {
    config: Configuration,
    accounts: HashMap<Address, StakerAccount>,
    slashed_total: Amount,
    roles: R,
    transfer: Box<dyn ValueTransfer>,
    clock: Arc<dyn Clock>,
    events: Box<dyn EventSink>,
}

impl<R: RoleStore> StakingLedger<R> {
    /// Creates a ledger and grants the administrator capability to `admin`.
    pub fn new(
        config: Configuration,
        admin: Address,
        roles: R,
        transfer: Box<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
        events: Box<dyn EventSink>,
    ) -> Self {
        let mut ledger = Self::from_parts(config, HashMap::new(), 0, roles, transfer, clock, events);
        match ledger.roles.grant(&admin, Role::Admin.id()) {
            Ok(_) => info!("Bootstrap administrator {} installed", admin),
            Err(RegistryError::AlreadyHeld { .. }) => debug!("Bootstrap administrator {} already present", admin),
            Err(e) => debug!("Bootstrap grant for {} skipped: {}", admin, e),
        }
        ledger
    }

    pub(crate) fn from_parts(
        config: Configuration,
        accounts: HashMap<Address, StakerAccount>,
        slashed_total: Amount,
        roles: R,
        transfer: Box<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
        events: Box<dyn EventSink>,
    ) -> Self {
        StakingLedger { config, accounts, slashed_total, roles, transfer, clock, events }
    }

    // ---------------------------------------------------------------------
    // Staker operations
    // ---------------------------------------------------------------------

    /// Grants the requested staker roles to `caller` and stakes `attached_value`.
    ///
    /// A caller holding no staker role must attach at least the registration deposit.
    /// Roles are granted one at a time in request order; if a later role is unknown or
    /// already held, the roles granted before it stay granted and are listed in the
    /// returned error. A caller that ends up holding no staker role is refused with
    /// `NotRegistered`.
    pub fn register(&mut self, caller: &Address, role_ids: &[RoleId], attached_value: Amount) -> Result<()> {
        let result = self.try_register(caller, role_ids, attached_value);
        self.note_rejection("register", caller, &result);
        result
    }

    fn try_register(&mut self, caller: &Address, role_ids: &[RoleId], attached_value: Amount) -> Result<()> {
        if !self.roles.is_registered(caller) && attached_value < self.config.registration_deposit_amount {
            return Err(LedgerError::InsufficientDeposit {
                required: self.config.registration_deposit_amount,
                provided: attached_value,
            });
        }
        if attached_value > 0 {
            self.account(caller)
                .staked_balance
                .checked_add(attached_value)
                .ok_or(LedgerError::BalanceOverflow)?;
        }

        let mut granted: Vec<Role> = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            let role = match Role::staker_from_id(*role_id) {
                Ok(role) => role,
                Err(_) => {
                    return Err(self.partial_registration(
                        caller,
                        LedgerError::UnknownRole { role_id: *role_id, granted },
                    ))
                }
            };
            match self.roles.grant(caller, role.id()) {
                Ok(role) => granted.push(role),
                Err(RegistryError::AlreadyHeld { role, .. }) => {
                    return Err(self.partial_registration(caller, LedgerError::RoleAlreadyHeld { role, granted }))
                }
                Err(RegistryError::UnknownRole(role_id)) => {
                    return Err(self.partial_registration(caller, LedgerError::UnknownRole { role_id, granted }))
                }
            }
        }

        if !self.roles.is_registered(caller) {
            return Err(LedgerError::NotRegistered(*caller));
        }

        self.accounts.entry(*caller).or_default();
        debug!("Registered {} with roles {:?}", caller, granted);
        self.emit(LedgerEvent::Registered { principal: *caller, role_ids: role_ids.to_vec() });

        if attached_value > 0 {
            self.credit_stake(caller, attached_value)?;
        }
        Ok(())
    }

    fn partial_registration(&self, caller: &Address, error: LedgerError) -> LedgerError {
        let granted = match &error {
            LedgerError::UnknownRole { granted, .. } | LedgerError::RoleAlreadyHeld { granted, .. } => {
                granted.as_slice()
            }
            _ => &[],
        };
        if !granted.is_empty() {
            audit_log::log_partial_registration(caller, granted);
        }
        error
    }

    /// Revokes every staker role of a caller whose balances are both zero.
    pub fn unregister(&mut self, caller: &Address) -> Result<()> {
        let result = self.try_unregister(caller);
        self.note_rejection("unregister", caller, &result);
        result
    }

    fn try_unregister(&mut self, caller: &Address) -> Result<()> {
        self.require_registered(caller)?;
        let account = self.account(caller);
        if account.staked_balance > 0 {
            return Err(LedgerError::NonZeroBalance(account.staked_balance));
        }
        if account.pending_withdrawal_balance > 0 {
            return Err(LedgerError::PendingWithdrawalNonZero(account.pending_withdrawal_balance));
        }

        for role in STAKER_ROLES {
            self.roles.revoke(caller, role.id());
        }
        self.emit(LedgerEvent::Unregistered { principal: *caller });
        Ok(())
    }

    /// Adds `amount` of attached value to the caller's staked balance.
    pub fn stake(&mut self, caller: &Address, amount: Amount) -> Result<()> {
        let result = self.try_stake(caller, amount);
        self.note_rejection("stake", caller, &result);
        result
    }

    fn try_stake(&mut self, caller: &Address, amount: Amount) -> Result<()> {
        self.require_registered(caller)?;
        if amount == 0 {
            return Err(LedgerError::ZeroStakeAmount);
        }
        self.credit_stake(caller, amount)
    }

    fn credit_stake(&mut self, caller: &Address, amount: Amount) -> Result<()> {
        let staked = self
            .account(caller)
            .staked_balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        self.transfer.credit(caller, amount);
        self.accounts.entry(*caller).or_default().staked_balance = staked;
        self.emit(LedgerEvent::Staked { principal: *caller, amount });
        Ok(())
    }

    /// Moves the whole staked balance into the pending withdrawal balance.
    ///
    /// Pending amounts accumulate across calls, and every call restarts the wait for
    /// the whole accumulated pending balance.
    pub fn unstake(&mut self, caller: &Address) -> Result<()> {
        let result = self.try_unstake(caller);
        self.note_rejection("unstake", caller, &result);
        result
    }

    fn try_unstake(&mut self, caller: &Address) -> Result<()> {
        self.require_registered(caller)?;
        let account = self.account(caller);
        if account.staked_balance == 0 {
            return Err(LedgerError::NothingToUnstake);
        }
        let amount = account.staked_balance;
        let pending = account
            .pending_withdrawal_balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let unlock_time = self.clock.now().saturating_add(self.config.withdrawal_wait_time);

        let entry = self.accounts.entry(*caller).or_default();
        entry.staked_balance = 0;
        entry.pending_withdrawal_balance = pending;
        entry.withdrawal_unlock_time = unlock_time;

        self.emit(LedgerEvent::Unstaked { principal: *caller, amount, unlock_time });
        Ok(())
    }

    /// Pays the unlocked pending balance out to the caller.
    pub fn withdraw(&mut self, caller: &Address) -> Result<Amount> {
        let result = self.try_withdraw(caller);
        self.note_rejection("withdraw", caller, &result);
        result
    }

    fn try_withdraw(&mut self, caller: &Address) -> Result<Amount> {
        self.require_registered(caller)?;
        let account = self.account(caller);
        let now = self.clock.now();
        if !account.is_unlocked(now) {
            return Err(LedgerError::WaitTimeNotElapsed { now, unlock_time: account.withdrawal_unlock_time });
        }
        if account.pending_withdrawal_balance == 0 {
            return Err(LedgerError::NothingToWithdraw);
        }

        let amount = account.pending_withdrawal_balance;
        self.pay_out(caller, amount)?;
        self.accounts.entry(*caller).or_default().pending_withdrawal_balance = 0;
        self.emit(LedgerEvent::Withdrawn { principal: *caller, amount });
        Ok(amount)
    }

    // ---------------------------------------------------------------------
    // Administrative operations
    // ---------------------------------------------------------------------

    /// Moves `amount` from the principal's staked balance into the slashed pool.
    /// Pending withdrawals are never touched.
    pub fn slash(&mut self, admin: &Address, principal: &Address, amount: Amount) -> Result<()> {
        let result = self.try_slash(admin, principal, amount);
        self.note_rejection("slash", admin, &result);
        result
    }

    fn try_slash(&mut self, admin: &Address, principal: &Address, amount: Amount) -> Result<()> {
        self.require_admin(admin)?;
        self.require_registered(principal)?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.account(principal).staked_balance;
        if available < amount {
            return Err(LedgerError::InsufficientBalance { available, requested: amount });
        }
        let slashed_total = self.slashed_total.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?;

        self.accounts.entry(*principal).or_default().staked_balance = available - amount;
        self.slashed_total = slashed_total;
        self.emit(LedgerEvent::Slashed { principal: *principal, amount, admin: *admin });
        Ok(())
    }

    /// Pays the whole slashed pool to `recipient` and empties it.
    pub fn sweep_slashed(&mut self, admin: &Address, recipient: &Address) -> Result<Amount> {
        let result = self.try_sweep_slashed(admin, recipient);
        self.note_rejection("sweep_slashed", admin, &result);
        result
    }

    fn try_sweep_slashed(&mut self, admin: &Address, recipient: &Address) -> Result<Amount> {
        self.require_admin(admin)?;
        if recipient.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if self.slashed_total == 0 {
            return Err(LedgerError::NothingToSweep);
        }

        let amount = self.slashed_total;
        self.pay_out(recipient, amount)?;
        self.slashed_total = 0;
        self.emit(LedgerEvent::SlashedSwept { recipient: *recipient, amount, admin: *admin });
        Ok(amount)
    }

    /// Overwrites both configuration values.
    pub fn set_configuration(
        &mut self,
        admin: &Address,
        registration_deposit_amount: Amount,
        withdrawal_wait_time: u64,
    ) -> Result<()> {
        let result = self.require_admin(admin).map(|_| {
            self.config = Configuration::new(registration_deposit_amount, withdrawal_wait_time);
            self.emit(LedgerEvent::ConfigurationUpdated {
                registration_deposit_amount,
                withdrawal_wait_time,
                admin: *admin,
            });
        });
        self.note_rejection("set_configuration", admin, &result);
        result
    }

    /// Grants any catalog role, including the administrator capability.
    pub fn grant_role(&mut self, admin: &Address, principal: &Address, role_id: RoleId) -> Result<Role> {
        let result = self.try_grant_role(admin, principal, role_id);
        self.note_rejection("grant_role", admin, &result);
        result
    }

    fn try_grant_role(&mut self, admin: &Address, principal: &Address, role_id: RoleId) -> Result<Role> {
        self.require_admin(admin)?;
        let role = self.roles.grant(principal, role_id).map_err(|e| match e {
            RegistryError::UnknownRole(role_id) => LedgerError::UnknownRole { role_id, granted: Vec::new() },
            RegistryError::AlreadyHeld { role, .. } => LedgerError::RoleAlreadyHeld { role, granted: Vec::new() },
        })?;
        if role.is_staker_role() {
            self.accounts.entry(*principal).or_default();
        }
        self.emit(LedgerEvent::RoleGranted { principal: *principal, role, admin: *admin });
        Ok(role)
    }

    /// Revokes a role. Returns `false` if the principal did not hold it.
    ///
    /// Taking away a principal's last staker role while it still has a staked or
    /// pending balance is refused: without a staker role it could never unstake or
    /// withdraw those funds.
    pub fn revoke_role(&mut self, admin: &Address, principal: &Address, role_id: RoleId) -> Result<bool> {
        let result = self.try_revoke_role(admin, principal, role_id);
        self.note_rejection("revoke_role", admin, &result);
        result
    }

    fn try_revoke_role(&mut self, admin: &Address, principal: &Address, role_id: RoleId) -> Result<bool> {
        self.require_admin(admin)?;
        let Ok(role) = Role::try_from(role_id) else {
            return Ok(false);
        };
        if !self.roles.has_role(principal, role) {
            return Ok(false);
        }

        let held_staker_roles = STAKER_ROLES.iter().filter(|r| self.roles.has_role(principal, **r)).count();
        if role.is_staker_role() && held_staker_roles == 1 {
            let account = self.account(principal);
            if account.staked_balance > 0 {
                return Err(LedgerError::NonZeroBalance(account.staked_balance));
            }
            if account.pending_withdrawal_balance > 0 {
                return Err(LedgerError::PendingWithdrawalNonZero(account.pending_withdrawal_balance));
            }
        }

        let removed = self.roles.revoke(principal, role_id);
        if removed {
            self.emit(LedgerEvent::RoleRevoked { principal: *principal, role, admin: *admin });
        }
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn account(&self, principal: &Address) -> StakerAccount {
        self.accounts.get(principal).copied().unwrap_or_default()
    }

    pub fn staked_balance_of(&self, principal: &Address) -> Amount {
        self.account(principal).staked_balance
    }

    pub fn pending_withdrawal_balance_of(&self, principal: &Address) -> Amount {
        self.account(principal).pending_withdrawal_balance
    }

    pub fn withdrawal_unlock_time_of(&self, principal: &Address) -> Timestamp {
        self.account(principal).withdrawal_unlock_time
    }

    pub fn is_registered(&self, principal: &Address) -> bool {
        self.roles.is_registered(principal)
    }

    pub fn is_admin(&self, principal: &Address) -> bool {
        self.roles.has_role(principal, Role::Admin)
    }

    /// True when a withdraw call by `principal` would pass the timelock and balance checks.
    pub fn is_withdrawable(&self, principal: &Address) -> bool {
        let account = self.account(principal);
        self.is_registered(principal) && account.pending_withdrawal_balance > 0 && account.is_unlocked(self.clock.now())
    }

    pub fn state_of(&self, principal: &Address) -> StakerState {
        self.account(principal).state(self.is_registered(principal))
    }

    pub fn roles_of(&self, principal: &Address) -> Vec<Role> {
        self.roles.roles_of(principal)
    }

    pub fn configuration(&self) -> Configuration {
        self.config
    }

    pub fn registration_deposit_amount(&self) -> Amount {
        self.config.registration_deposit_amount
    }

    pub fn withdrawal_wait_time(&self) -> u64 {
        self.config.withdrawal_wait_time
    }

    pub fn slashed_total(&self) -> Amount {
        self.slashed_total
    }

    pub fn total_staked(&self) -> u128 {
        self.accounts.values().map(|a| a.staked_balance as u128).sum()
    }

    pub fn total_pending(&self) -> u128 {
        self.accounts.values().map(|a| a.pending_withdrawal_balance as u128).sum()
    }

    /// Everything the ledger currently owes: staked, pending and slashed value.
    pub fn total_holdings(&self) -> u128 {
        self.total_staked() + self.total_pending() + self.slashed_total as u128
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &StakerAccount)> {
        self.accounts.iter()
    }

    pub fn role_store(&self) -> &R {
        &self.roles
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn require_admin(&self, caller: &Address) -> Result<()> {
        if self.roles.has_role(caller, Role::Admin) {
            Ok(())
        } else {
            Err(LedgerError::AdminRequired(*caller))
        }
    }

    fn require_registered(&self, principal: &Address) -> Result<()> {
        if self.roles.is_registered(principal) {
            Ok(())
        } else {
            Err(LedgerError::NotRegistered(*principal))
        }
    }

    fn pay_out(&mut self, recipient: &Address, amount: Amount) -> Result<()> {
        self.transfer.debit(recipient, amount).map_err(|e| {
            audit_log::log_transfer_failed(recipient, amount, &e);
            LedgerError::TransferFailed(e)
        })
    }

    fn emit(&mut self, event: LedgerEvent) {
        self.events.emit(&event);
    }

    fn note_rejection<T>(&self, operation: &str, caller: &Address, result: &Result<T>) {
        if let Err(e) = result {
            audit_log::log_operation_rejected(operation, caller, e);
        }
    }
}
