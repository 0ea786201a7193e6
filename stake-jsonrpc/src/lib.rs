//! JSON-RPC access to a [`stake_ledger::StakingLedger`].
//!
//! Callers authenticate with `Authorization: Bearer <api key>`; the key decides which
//! principal a state-changing call is issued as. Read methods need no key.

pub mod auth;
pub mod error;
pub mod rpc;
pub mod server;

pub use auth::{ApiKeyManager, BearerMetaExtractor, CallerMeta};
pub use error::RpcError;
pub use rpc::{AccountView, RpcImpl, SharedLedger, StakeRpc, MAX_EVENTS_PER_PAGE};
pub use server::RpcServer;
