use crate::enrichment::EnrichedFacetSet;
use crate::entity::{Artist, TrackArtistCredit};
use crate::listening::{AlbumTotals, ArtistTotals, TimeRange, Track, TrackTotals};
use crate::scoring::EngagementSummary;
use crate::temporal::{HourBucket, StreakSummary};
use chrono::NaiveDate;
use serde::Serialize;

use super::ranking::Rankable;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Overview {
    pub range: TimeRange,
    pub total_plays: i64,
    pub total_ms: i64,
    pub unique_tracks: usize,
    pub unique_artists: usize,
    pub unique_albums: usize,
    /// Long-tail plays held in the archive tier; not part of the totals above.
    pub archived_tracks: i64,
    pub archived_plays: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenreTotals {
    pub genre: String,
    pub play_count: i64,
    pub total_ms: i64,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Discovery {
    pub new_tracks: usize,
    pub repeat_tracks: usize,
    pub new_artists: usize,
    pub repeat_artists: usize,
    /// Share of played tracks heard for the first time, 0 to 1.
    pub new_track_ratio: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct StreakReport {
    pub today: NaiveDate,
    #[serde(flatten)]
    pub streaks: StreakSummary,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ArtistDetail {
    pub artist: Artist,
    /// Names that were merged into this artist.
    pub aliases: Vec<String>,
    pub play_count: i64,
    pub total_ms: i64,
    pub first_play_ms: Option<i64>,
    pub last_play_ms: Option<i64>,
    pub top_tracks: Vec<TrackPlays>,
    pub hourly: Vec<HourBucket>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackPlays {
    pub track_id: i64,
    pub title: String,
    pub play_count: i64,
    pub total_ms: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackDetail {
    pub track: Track,
    pub credits: Vec<TrackArtistCredit>,
    pub facets: Option<EnrichedFacetSet>,
    pub play_count: i64,
    pub total_ms: i64,
    pub first_play_ms: Option<i64>,
    pub last_play_ms: Option<i64>,
    pub engagement: EngagementSummary,
}

impl Rankable for TrackTotals {
    fn play_count(&self) -> i64 {
        self.play_count
    }
    fn total_ms(&self) -> i64 {
        self.total_ms
    }
}

impl Rankable for ArtistTotals {
    fn play_count(&self) -> i64 {
        self.play_count
    }
    fn total_ms(&self) -> i64 {
        self.total_ms
    }
}

impl Rankable for AlbumTotals {
    fn play_count(&self) -> i64 {
        self.play_count
    }
    fn total_ms(&self) -> i64 {
        self.total_ms
    }
}

impl Rankable for GenreTotals {
    fn play_count(&self) -> i64 {
        self.play_count
    }
    fn total_ms(&self) -> i64 {
        self.total_ms
    }
}
