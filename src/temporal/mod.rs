//! Listening patterns reconstructed from the event log: sessions, binges,
//! streaks and time-bucketed distributions.

mod binge;
mod distribution;
mod sessions;
mod streaks;

pub use binge::{detect_binges, BingeRun, BingeSummary};
pub use distribution::{
    daily_series, hourly_distribution, weekday_distribution, DailyPoint, HourBucket,
    WeekdayBucket,
};
pub use sessions::{longest_session, reconstruct_sessions, ListeningSession};
pub use streaks::{compute_streaks, StreakSummary};

use crate::listening::time_range::{local_date, MILLIS_PER_MINUTE};
use crate::listening::PlayRecord;
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalSettings {
    pub session_gap_minutes: u32,
    pub binge_min_run: usize,
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            session_gap_minutes: 20,
            binge_min_run: 3,
        }
    }
}

impl TemporalSettings {
    pub fn session_gap_ms(&self) -> i64 {
        self.session_gap_minutes as i64 * MILLIS_PER_MINUTE
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PatternSummary {
    pub session_count: usize,
    pub longest_session: Option<ListeningSession>,
    pub average_session_ms: i64,
    pub binge: BingeSummary,
    pub hourly: Vec<HourBucket>,
    pub weekday: Vec<WeekdayBucket>,
    /// Local hour with the most plays, `None` without plays.
    pub peak_hour: Option<u32>,
}

pub fn analyze_patterns(
    plays: &[PlayRecord],
    settings: &TemporalSettings,
    offset: FixedOffset,
) -> PatternSummary {
    let sessions = reconstruct_sessions(plays, settings.session_gap_ms());
    let average_session_ms = if sessions.is_empty() {
        0
    } else {
        sessions.iter().map(|s| s.duration_ms()).sum::<i64>() / sessions.len() as i64
    };
    let hourly = hourly_distribution(plays, offset);
    let peak_hour = hourly
        .iter()
        .filter(|b| b.plays > 0)
        .max_by_key(|b| (b.plays, std::cmp::Reverse(b.hour)))
        .map(|b| b.hour);

    PatternSummary {
        session_count: sessions.len(),
        longest_session: longest_session(&sessions).cloned(),
        average_session_ms,
        binge: detect_binges(plays, settings.binge_min_run),
        weekday: weekday_distribution(plays, offset),
        hourly,
        peak_hour,
    }
}

/// Distinct local dates with at least one play.
pub fn active_dates(plays: &[PlayRecord], offset: FixedOffset) -> BTreeSet<NaiveDate> {
    plays
        .iter()
        .map(|p| local_date(p.timestamp_ms(), offset))
        .collect()
}
