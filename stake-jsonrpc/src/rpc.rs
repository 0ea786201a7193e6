use jsonrpc_core::Result;
use jsonrpc_derive::rpc;
use log::info;
use serde::{Deserialize, Serialize};
use stake_ledger::{Configuration, EventLog, StakingLedger};
use stake_shared_types::{Address, Amount, LedgerEvent, Role, RoleId, StakerState, Timestamp};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::CallerMeta;
use crate::error::RpcError;

/// Upper bound on the events one `get_events` call returns.
pub const MAX_EVENTS_PER_PAGE: usize = 1_000;

/// The ledger as shared between RPC worker threads. Every call takes this one lock.
pub type SharedLedger = Arc<Mutex<StakingLedger>>;

/// Read model of one principal's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub principal: Address,
    pub registered: bool,
    pub roles: Vec<Role>,
    pub state: StakerState,
    pub staked_balance: Amount,
    pub pending_withdrawal_balance: Amount,
    pub withdrawal_unlock_time: Timestamp,
    pub withdrawable: bool,
}

#[rpc(server)]
pub trait StakeRpc {
    type Metadata;

    #[rpc(name = "get_account")]
    fn get_account(&self, principal: String) -> Result<AccountView>;

    #[rpc(name = "is_registered")]
    fn is_registered(&self, principal: String) -> Result<bool>;

    #[rpc(name = "get_roles")]
    fn get_roles(&self, principal: String) -> Result<Vec<Role>>;

    #[rpc(name = "get_configuration")]
    fn get_configuration(&self) -> Result<Configuration>;

    #[rpc(name = "get_slashed_total")]
    fn get_slashed_total(&self) -> Result<Amount>;

    /// Retained events at or after absolute position `from` of the node's event log,
    /// at most `limit` (capped at [`MAX_EVENTS_PER_PAGE`]) of them.
    #[rpc(name = "get_events")]
    fn get_events(&self, from: usize, limit: Option<usize>) -> Result<Vec<LedgerEvent>>;

    #[rpc(meta, name = "register")]
    fn register(&self, meta: Self::Metadata, role_ids: Vec<RoleId>, value: Amount) -> Result<AccountView>;

    #[rpc(meta, name = "unregister")]
    fn unregister(&self, meta: Self::Metadata) -> Result<AccountView>;

    #[rpc(meta, name = "stake")]
    fn stake(&self, meta: Self::Metadata, amount: Amount) -> Result<AccountView>;

    #[rpc(meta, name = "unstake")]
    fn unstake(&self, meta: Self::Metadata) -> Result<AccountView>;

    #[rpc(meta, name = "withdraw")]
    fn withdraw(&self, meta: Self::Metadata) -> Result<Amount>;

    #[rpc(meta, name = "set_configuration")]
    fn set_configuration(
        &self,
        meta: Self::Metadata,
        registration_deposit_amount: Amount,
        withdrawal_wait_time: u64,
    ) -> Result<Configuration>;

    #[rpc(meta, name = "grant_role")]
    fn grant_role(&self, meta: Self::Metadata, principal: String, role_id: RoleId) -> Result<Role>;

    #[rpc(meta, name = "revoke_role")]
    fn revoke_role(&self, meta: Self::Metadata, principal: String, role_id: RoleId) -> Result<bool>;

    #[rpc(meta, name = "slash")]
    fn slash(&self, meta: Self::Metadata, principal: String, amount: Amount) -> Result<AccountView>;

    #[rpc(meta, name = "sweep_slashed")]
    fn sweep_slashed(&self, meta: Self::Metadata, recipient: String) -> Result<Amount>;
}

pub struct RpcImpl {
    ledger: SharedLedger,
    events: EventLog,
}

impl RpcImpl {
    pub fn new(ledger: SharedLedger, events: EventLog) -> Self {
        RpcImpl { ledger, events }
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, StakingLedger>, RpcError> {
        self.ledger.lock().map_err(|_| RpcError::Internal("ledger lock poisoned".into()))
    }

    fn caller(meta: &CallerMeta) -> std::result::Result<Address, RpcError> {
        meta.caller.ok_or(RpcError::Unauthorized)
    }

    fn view(ledger: &StakingLedger, principal: &Address) -> AccountView {
        let account = ledger.account(principal);
        AccountView {
            principal: *principal,
            registered: ledger.is_registered(principal),
            roles: ledger.roles_of(principal),
            state: ledger.state_of(principal),
            staked_balance: account.staked_balance,
            pending_withdrawal_balance: account.pending_withdrawal_balance,
            withdrawal_unlock_time: account.withdrawal_unlock_time,
            withdrawable: ledger.is_withdrawable(principal),
        }
    }

    /// Runs `op` as the authenticated caller and returns the caller's account view.
    fn as_caller<F>(&self, meta: &CallerMeta, op: F) -> Result<AccountView>
    where
        F: FnOnce(&mut StakingLedger, &Address) -> stake_ledger::Result<()>,
    {
        let caller = Self::caller(meta)?;
        let mut ledger = self.lock()?;
        op(&mut ledger, &caller).map_err(RpcError::from)?;
        Ok(Self::view(&ledger, &caller))
    }
}

fn parse_address(s: &str) -> std::result::Result<Address, RpcError> {
    Ok(s.parse::<Address>()?)
}

impl StakeRpc for RpcImpl {
    type Metadata = CallerMeta;

    fn get_account(&self, principal: String) -> Result<AccountView> {
        let principal = parse_address(&principal)?;
        let ledger = self.lock()?;
        Ok(Self::view(&ledger, &principal))
    }

    fn is_registered(&self, principal: String) -> Result<bool> {
        let principal = parse_address(&principal)?;
        Ok(self.lock()?.is_registered(&principal))
    }

    fn get_roles(&self, principal: String) -> Result<Vec<Role>> {
        let principal = parse_address(&principal)?;
        Ok(self.lock()?.roles_of(&principal))
    }

    fn get_configuration(&self) -> Result<Configuration> {
        Ok(self.lock()?.configuration())
    }

    fn get_slashed_total(&self) -> Result<Amount> {
        Ok(self.lock()?.slashed_total())
    }

    fn get_events(&self, from: usize, limit: Option<usize>) -> Result<Vec<LedgerEvent>> {
        let limit = limit.map_or(MAX_EVENTS_PER_PAGE, |limit| limit.min(MAX_EVENTS_PER_PAGE));
        Ok(self.events.page(from, limit))
    }

    fn register(&self, meta: CallerMeta, role_ids: Vec<RoleId>, value: Amount) -> Result<AccountView> {
        self.as_caller(&meta, |ledger, caller| ledger.register(caller, &role_ids, value))
    }

    fn unregister(&self, meta: CallerMeta) -> Result<AccountView> {
        self.as_caller(&meta, |ledger, caller| ledger.unregister(caller))
    }

    fn stake(&self, meta: CallerMeta, amount: Amount) -> Result<AccountView> {
        self.as_caller(&meta, |ledger, caller| ledger.stake(caller, amount))
    }

    fn unstake(&self, meta: CallerMeta) -> Result<AccountView> {
        self.as_caller(&meta, |ledger, caller| ledger.unstake(caller))
    }

    fn withdraw(&self, meta: CallerMeta) -> Result<Amount> {
        let caller = Self::caller(&meta)?;
        let amount = self.lock()?.withdraw(&caller).map_err(RpcError::from)?;
        info!("{} withdrew {}", caller, amount);
        Ok(amount)
    }

    fn set_configuration(
        &self,
        meta: CallerMeta,
        registration_deposit_amount: Amount,
        withdrawal_wait_time: u64,
    ) -> Result<Configuration> {
        let admin = Self::caller(&meta)?;
        let mut ledger = self.lock()?;
        ledger
            .set_configuration(&admin, registration_deposit_amount, withdrawal_wait_time)
            .map_err(RpcError::from)?;
        Ok(ledger.configuration())
    }

    fn grant_role(&self, meta: CallerMeta, principal: String, role_id: RoleId) -> Result<Role> {
        let admin = Self::caller(&meta)?;
        let principal = parse_address(&principal)?;
        Ok(self.lock()?.grant_role(&admin, &principal, role_id).map_err(RpcError::from)?)
    }

    fn revoke_role(&self, meta: CallerMeta, principal: String, role_id: RoleId) -> Result<bool> {
        let admin = Self::caller(&meta)?;
        let principal = parse_address(&principal)?;
        Ok(self.lock()?.revoke_role(&admin, &principal, role_id).map_err(RpcError::from)?)
    }

    fn slash(&self, meta: CallerMeta, principal: String, amount: Amount) -> Result<AccountView> {
        let admin = Self::caller(&meta)?;
        let principal = parse_address(&principal)?;
        let mut ledger = self.lock()?;
        ledger.slash(&admin, &principal, amount).map_err(RpcError::from)?;
        Ok(Self::view(&ledger, &principal))
    }

    fn sweep_slashed(&self, meta: CallerMeta, recipient: String) -> Result<Amount> {
        let admin = Self::caller(&meta)?;
        let recipient = parse_address(&recipient)?;
        let amount = self.lock()?.sweep_slashed(&admin, &recipient).map_err(RpcError::from)?;
        info!("Swept {} slashed to {}", amount, recipient);
        Ok(amount)
    }
}
