//! Long-tail history tier: one compressed row per rarely played (artist, title).
//!
//! Archived rows are never sent through metadata enrichment; only what the import
//! carried is kept.

mod codec;
mod hash;
mod importer;
mod models;
mod tiering;

pub use codec::{decode, encode, ArchiveCodecError, BLOB_VERSION};
pub use hash::track_hash;
pub use importer::{archive_history, archive_lookup, ArchiveImporter};
pub use models::{ArchiveEntry, ArchiveHistory, ImportBatch, ImportReport, ImportedPlay, Tier};
pub use tiering::TieringPolicy;
