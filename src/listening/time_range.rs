//! Named query windows and calendar helpers.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time window over the event log.
///
/// Calendar windows are resolved against "now" and a fixed UTC offset, so the same
/// range name means different absolute bounds as time passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimeRange {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    AllTime,
    /// The trailing `days` days, ending now.
    LastDays { days: u32 },
    /// Explicit bounds, start inclusive and end exclusive, in epoch milliseconds.
    Custom { start_ms: i64, end_ms: i64 },
}

/// Resolved absolute bounds of a [`TimeRange`]. Start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeBounds {
    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms < self.end_ms
    }
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Today => "today",
            TimeRange::ThisWeek => "this_week",
            TimeRange::ThisMonth => "this_month",
            TimeRange::ThisYear => "this_year",
            TimeRange::AllTime => "all_time",
            TimeRange::LastDays { .. } => "last_days",
            TimeRange::Custom { .. } => "custom",
        }
    }

    /// Parse a named range. `last_<n>_days` is accepted for trailing windows.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(TimeRange::Today),
            "this_week" | "week" => Some(TimeRange::ThisWeek),
            "this_month" | "month" => Some(TimeRange::ThisMonth),
            "this_year" | "year" => Some(TimeRange::ThisYear),
            "all_time" | "all" => Some(TimeRange::AllTime),
            other => other
                .strip_prefix("last_")
                .and_then(|rest| rest.strip_suffix("_days"))
                .and_then(|n| n.parse().ok())
                .map(|days| TimeRange::LastDays { days }),
        }
    }

    /// Windows anchored to the current calendar. A new event almost always lands in
    /// every one of them, so they are invalidated eagerly.
    pub fn is_calendar_window(&self) -> bool {
        matches!(
            self,
            TimeRange::Today
                | TimeRange::ThisWeek
                | TimeRange::ThisMonth
                | TimeRange::ThisYear
                | TimeRange::AllTime
        )
    }

    pub fn bounds(&self, now_ms: i64, offset: FixedOffset) -> TimeBounds {
        let today = local_date(now_ms, offset);
        let (start_ms, end_ms) = match *self {
            TimeRange::Today => (
                day_start_ms(today, offset),
                day_start_ms(today + Duration::days(1), offset),
            ),
            TimeRange::ThisWeek => {
                let monday =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (
                    day_start_ms(monday, offset),
                    day_start_ms(monday + Duration::days(7), offset),
                )
            }
            TimeRange::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                }
                .unwrap_or(first + Duration::days(31));
                (day_start_ms(first, offset), day_start_ms(next, offset))
            }
            TimeRange::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
                    .unwrap_or(first + Duration::days(366));
                (day_start_ms(first, offset), day_start_ms(next, offset))
            }
            TimeRange::AllTime => (i64::MIN, i64::MAX),
            TimeRange::LastDays { days } => {
                (now_ms - days as i64 * MILLIS_PER_DAY, now_ms.saturating_add(1))
            }
            TimeRange::Custom { start_ms, end_ms } => (start_ms, end_ms),
        };
        TimeBounds { start_ms, end_ms }
    }
}

pub const MILLIS_PER_MINUTE: i64 = 60 * 1000;
pub const MILLIS_PER_DAY: i64 = 24 * 60 * MILLIS_PER_MINUTE;

pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}

pub fn to_local(ts_ms: i64, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = DateTime::<Utc>::from_timestamp_millis(ts_ms).unwrap_or_default();
    utc.with_timezone(&offset)
}

/// Calendar date of `ts_ms` in the given offset.
pub fn local_date(ts_ms: i64, offset: FixedOffset) -> NaiveDate {
    to_local(ts_ms, offset).date_naive()
}

/// Epoch milliseconds of local midnight starting `date`.
pub fn day_start_ms(date: NaiveDate, offset: FixedOffset) -> i64 {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| midnight.and_utc().timestamp_millis())
}
