//! Time-bucketed distributions with every slot present.

use crate::listening::time_range::to_local;
use crate::listening::PlayRecord;
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Timelike};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourBucket {
    /// 0 to 23, local time.
    pub hour: u32,
    pub plays: i64,
    pub total_ms: i64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayBucket {
    /// 1 (Monday) to 7 (Sunday).
    pub weekday: u32,
    pub plays: i64,
    pub total_ms: i64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub plays: i64,
    pub total_ms: i64,
}

pub fn hourly_distribution(plays: &[PlayRecord], offset: FixedOffset) -> Vec<HourBucket> {
    let mut buckets: Vec<HourBucket> = (0..24)
        .map(|hour| HourBucket {
            hour,
            plays: 0,
            total_ms: 0,
        })
        .collect();
    for play in plays {
        let hour = to_local(play.timestamp_ms(), offset).hour() as usize;
        buckets[hour].plays += 1;
        buckets[hour].total_ms += play.event.play_duration_ms.max(0);
    }
    buckets
}

pub fn weekday_distribution(plays: &[PlayRecord], offset: FixedOffset) -> Vec<WeekdayBucket> {
    let mut buckets: Vec<WeekdayBucket> = (1..=7)
        .map(|weekday| WeekdayBucket {
            weekday,
            plays: 0,
            total_ms: 0,
        })
        .collect();
    for play in plays {
        let idx = to_local(play.timestamp_ms(), offset)
            .weekday()
            .num_days_from_monday() as usize;
        buckets[idx].plays += 1;
        buckets[idx].total_ms += play.event.play_duration_ms.max(0);
    }
    buckets
}

/// One point per local day from `first` to `last` inclusive. Plays outside are ignored.
pub fn daily_series(
    plays: &[PlayRecord],
    first: NaiveDate,
    last: NaiveDate,
    offset: FixedOffset,
) -> Vec<DailyPoint> {
    if last < first {
        return Vec::new();
    }
    let days = (last - first).num_days() as usize + 1;
    let mut series: Vec<DailyPoint> = (0..days)
        .map(|i| DailyPoint {
            date: first + Duration::days(i as i64),
            plays: 0,
            total_ms: 0,
        })
        .collect();
    for play in plays {
        let date = to_local(play.timestamp_ms(), offset).date_naive();
        if date < first || date > last {
            continue;
        }
        let point = &mut series[(date - first).num_days() as usize];
        point.plays += 1;
        point.total_ms += play.event.play_duration_ms.max(0);
    }
    series
}
