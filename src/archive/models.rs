use serde::{Deserialize, Serialize};

/// One long-tail track in the archive tier.
///
/// The counters and first/last seen are kept outside the blob so they stay usable
/// even when the blob cannot be decoded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub id: i64,
    pub track_hash: String,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub play_count: i64,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    #[serde(skip)]
    pub timestamps_blob: Option<Vec<u8>>,
    pub import_batch_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImportBatch {
    pub id: String,
    pub source_label: String,
    /// Unix seconds.
    pub imported_at: i64,
    pub active_count: i64,
    pub archived_count: i64,
    pub play_count: i64,
}

/// One play from an imported history file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImportedPlay {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

/// Where the tiering policy sent a track.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Active,
    Archive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub batch_id: String,
    pub plays_read: usize,
    /// Plays without a title, which cannot be keyed.
    pub plays_skipped: usize,
    pub active_tracks: usize,
    pub active_plays: usize,
    pub archived_tracks: usize,
    pub archived_plays: usize,
    /// Archived tracks that already had a row before this import.
    pub archive_rows_updated: usize,
    /// Archived tracks moved to the active tier by this import.
    pub promoted_tracks: usize,
}

/// Archive entry plus its per-play history, when that history is readable.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ArchiveHistory {
    pub entry: ArchiveEntry,
    /// `None` if the blob is missing or corrupt.
    pub timestamps: Option<Vec<i64>>,
}
