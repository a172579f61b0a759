//! Shared test values

/// Wednesday 2023-11-15 12:00:00 UTC.
pub const NOW_MS: i64 = 1_700_049_600_000;

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

pub const THREE_MINUTES_MS: i64 = 3 * MINUTE_MS;

pub const TEST_IMPORT_LABEL: &str = "test-export";
