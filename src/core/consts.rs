/// Control loop cadence in milliseconds. One planner increment per tick,
/// so this bounds the maximum pulse rate per axis
pub const TICK_INTERVAL_MS: u64 = 1;

/// Minimum pause between tracking re-aims in milliseconds
pub const REAIM_INTERVAL_MS: i64 = 1000;

/// How often options are written back to disk
pub const OPTIONS_AUTOSAVE_MS: u32 = 30_000;

/// How many days log files are kept
pub const KEEP_LOGS_DAYS: u64 = 14;
