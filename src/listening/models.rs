//! Listening data models.

use serde::{Deserialize, Serialize};

/// Where a listening event was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Live capture from the device's media session.
    MediaSession,
    /// Live capture from a notification listener.
    Notification,
    /// Imported from a streaming service history export.
    HistoryImport,
    /// Imported from a scrobbling service.
    ScrobbleImport,
    Manual,
    #[serde(other)]
    Unknown,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::MediaSession => "media_session",
            EventSource::Notification => "notification",
            EventSource::HistoryImport => "history_import",
            EventSource::ScrobbleImport => "scrobble_import",
            EventSource::Manual => "manual",
            EventSource::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "media_session" => EventSource::MediaSession,
            "notification" => EventSource::Notification,
            "history_import" => EventSource::HistoryImport,
            "scrobble_import" => EventSource::ScrobbleImport,
            "manual" => EventSource::Manual,
            _ => EventSource::Unknown,
        }
    }
}

/// A listening event as handed over by the collection subsystem, before it has an id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewListeningEvent {
    pub track_id: i64,
    /// Unix timestamp in milliseconds when playback started.
    pub timestamp_ms: i64,
    pub play_duration_ms: i64,
    /// 0 to 100.
    pub completion_percent: f64,
    pub source: EventSource,
    pub was_skipped: bool,
    pub is_replay: bool,
    pub pause_count: u32,
    pub session_ref: Option<String>,
}

/// An immutable, stored play of a track.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListeningEvent {
    pub id: i64,
    pub track_id: i64,
    pub timestamp_ms: i64,
    pub play_duration_ms: i64,
    pub completion_percent: f64,
    pub source: EventSource,
    pub was_skipped: bool,
    pub is_replay: bool,
    pub pause_count: u32,
    pub session_ref: Option<String>,
}

impl ListeningEvent {
    /// Wall-clock end of the play.
    pub fn end_ms(&self) -> i64 {
        self.timestamp_ms + self.play_duration_ms.max(0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub id: i64,
    pub title: String,
    /// The artist string exactly as captured, possibly naming several artists.
    pub raw_artist_string: String,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    pub primary_artist_id: Option<i64>,
    /// Stable hash of normalized artist and title, shared with the archive tier.
    pub track_hash: String,
}

/// An event joined with the track fields the aggregations need.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub event: ListeningEvent,
    pub title: String,
    pub album: Option<String>,
    pub primary_artist_id: Option<i64>,
}

impl PlayRecord {
    pub fn timestamp_ms(&self) -> i64 {
        self.event.timestamp_ms
    }
}

/// A track as first seen by the collection subsystem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewTrack {
    pub title: String,
    pub raw_artist_string: String,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    pub track_hash: String,
}

/// Play totals of one track within a window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackTotals {
    pub track_id: i64,
    pub title: String,
    pub raw_artist_string: String,
    pub album: Option<String>,
    pub primary_artist_id: Option<i64>,
    pub play_count: i64,
    pub total_ms: i64,
}

/// Play totals credited to one artist within a window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArtistTotals {
    pub artist_id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub play_count: i64,
    pub total_ms: i64,
}

/// Play totals of one album within a window. Albums are keyed by title and the
/// artist string of their tracks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlbumTotals {
    pub album: String,
    pub artist: String,
    pub play_count: i64,
    pub total_ms: i64,
}
