//! Staking ledger.
//!
//! Principals deposit value to obtain staker roles, add stake, unstake into a
//! timelocked pending balance and withdraw it once the wait has elapsed. An
//! administrator may slash staked value into a pool and sweep that pool out.
//!
//! # Modules
//!
//! - `ledger`: the [`StakingLedger`] state machine.
//! - `transfer`, `clock`, `events`: the collaborator traits the ledger calls into,
//!   with in-process implementations.
//! - `snapshot`: checksummed point-in-time copies of the ledger state.
//! - `audit_log`: structured records of committed and refused operations.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use stake_ledger::{Configuration, EventLog, InMemoryVault, ManualClock, StakingLedger};
//! use stake_registry::MemoryRoleRegistry;
//! use stake_shared_types::{Address, RoleId};
//!
//! let admin = Address([0xAA; 20]);
//! let staker = Address([0x01; 20]);
//! let clock = ManualClock::new(0);
//! let mut ledger = StakingLedger::new(
//!     Configuration::new(100, 100),
//!     admin,
//!     MemoryRoleRegistry::new(),
//!     Box::new(InMemoryVault::new()),
//!     Arc::new(clock.clone()),
//!     Box::new(EventLog::new()),
//! );
//!
//! ledger.register(&staker, &[RoleId(1)], 100).unwrap();
//! ledger.unstake(&staker).unwrap();
//! clock.advance(100);
//! assert_eq!(ledger.withdraw(&staker).unwrap(), 100);
//! ```

pub mod audit_log;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod ledger;
pub mod snapshot;
pub mod transfer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Configuration;
pub use error::{LedgerError, Result};
pub use events::{EventLog, EventSink, FanOutSink, TracingEventSink};
pub use ledger::StakingLedger;
pub use snapshot::{LedgerSnapshot, SnapshotError};
pub use transfer::{InMemoryVault, TransferError, ValueTransfer};
