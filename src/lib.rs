//! Pezzottify Stats Library
//!
//! Listening statistics over a noisy play log: entity resolution, metadata
//! arbitration, temporal patterns, scoring, caching and long-tail archiving.

pub mod archive;
pub mod cache;
pub mod config;
pub mod enrichment;
pub mod entity;
pub mod listening;
pub mod scoring;
pub mod sqlite_persistence;
pub mod stats;
pub mod store;
pub mod temporal;

// Re-export commonly used types for convenience
pub use cache::{Clock, ManualClock, SystemClock};
pub use stats::{SortBy, StatsService, StatsSettings};
pub use store::{FullStatsStore, SqliteStatsStore};
