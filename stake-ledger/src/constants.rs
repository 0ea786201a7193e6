/// Minimum first-time deposit, in base units, for a principal that holds no staker role.
pub const DEFAULT_REGISTRATION_DEPOSIT_AMOUNT: u64 = 1_000;

/// Delay between `unstake` and eligibility to withdraw, in seconds (7 days).
pub const DEFAULT_WITHDRAWAL_WAIT_TIME: u64 = 7 * 24 * 60 * 60;

/// Leading bytes of every snapshot file.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"STKL";

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Events an `EventLog` retains before evicting the oldest.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;
