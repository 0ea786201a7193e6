//! Types shared by the staking ledger crates.
//!
//! Everything that crosses a crate boundary lives here: principal addresses, the closed
//! role catalog, per-principal account records and the events the ledger emits.

pub mod account;
pub mod address;
pub mod event;
pub mod role;

pub use account::{StakerAccount, StakerState};
pub use address::{Address, AddressError, ADDRESS_LEN};
pub use event::LedgerEvent;
pub use role::{Role, RoleId, UnknownRoleId, STAKER_ROLES};

/// Amount of native value, in base units.
pub type Amount = u64;

/// Seconds since the UNIX epoch, as read from the ledger clock.
pub type Timestamp = u64;
