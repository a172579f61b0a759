use crate::listening::{TimeBounds, TimeRange};
use crate::stats::SortBy;
use chrono::{FixedOffset, NaiveDate};

/// Identifies one cached query result by all of its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Overview {
        range: TimeRange,
    },
    TopTracks {
        range: TimeRange,
        sort: SortBy,
        offset: usize,
        limit: usize,
    },
    TopArtists {
        range: TimeRange,
        sort: SortBy,
        offset: usize,
        limit: usize,
    },
    TopAlbums {
        range: TimeRange,
        sort: SortBy,
        offset: usize,
        limit: usize,
    },
    TopGenres {
        range: TimeRange,
        offset: usize,
        limit: usize,
    },
    Discovery {
        range: TimeRange,
    },
    Engagement {
        range: TimeRange,
    },
    Variety {
        range: TimeRange,
    },
    Mood {
        range: TimeRange,
    },
    Patterns {
        range: TimeRange,
    },
    /// Computed over the whole history.
    Streaks,
    DailySeries {
        first: NaiveDate,
        last: NaiveDate,
    },
    ArtistDetail {
        artist_id: i64,
        range: TimeRange,
    },
    TrackDetail {
        track_id: i64,
        range: TimeRange,
    },
}

impl CacheKey {
    pub fn range(&self) -> Option<TimeRange> {
        match self {
            CacheKey::Overview { range }
            | CacheKey::TopTracks { range, .. }
            | CacheKey::TopArtists { range, .. }
            | CacheKey::TopAlbums { range, .. }
            | CacheKey::TopGenres { range, .. }
            | CacheKey::Discovery { range }
            | CacheKey::Engagement { range }
            | CacheKey::Variety { range }
            | CacheKey::Mood { range }
            | CacheKey::Patterns { range }
            | CacheKey::ArtistDetail { range, .. }
            | CacheKey::TrackDetail { range, .. } => Some(*range),
            CacheKey::Streaks | CacheKey::DailySeries { .. } => None,
        }
    }

    pub fn is_entity_detail(&self) -> bool {
        matches!(
            self,
            CacheKey::ArtistDetail { .. } | CacheKey::TrackDetail { .. }
        )
    }

    pub fn artist_id(&self) -> Option<i64> {
        match self {
            CacheKey::ArtistDetail { artist_id, .. } => Some(*artist_id),
            _ => None,
        }
    }

    pub fn track_id(&self) -> Option<i64> {
        match self {
            CacheKey::TrackDetail { track_id, .. } => Some(*track_id),
            _ => None,
        }
    }

    /// Whether an event at `ts_ms` can change this result.
    ///
    /// Calendar windows, entity details and whole-history queries always are; other
    /// windows only when their bounds contain the event.
    pub fn affected_by_event(&self, ts_ms: i64, now_ms: i64, offset: FixedOffset) -> bool {
        if self.is_entity_detail() {
            return true;
        }
        match self {
            CacheKey::Streaks => true,
            CacheKey::DailySeries { first, last } => {
                let date = crate::listening::time_range::local_date(ts_ms, offset);
                *first <= date && date <= *last
            }
            _ => match self.range() {
                Some(range) if range.is_calendar_window() => true,
                Some(range) => {
                    let TimeBounds { start_ms, end_ms } = range.bounds(now_ms, offset);
                    ts_ms >= start_ms && ts_ms < end_ms
                }
                None => true,
            },
        }
    }
}
