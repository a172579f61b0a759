use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakSummary {
    /// Consecutive active days ending today. Zero if nothing was played today.
    pub current: u32,
    pub longest: u32,
    pub active_days: u32,
}

pub fn compute_streaks(active: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakSummary {
    let mut current = 0u32;
    let mut day = today;
    while active.contains(&day) {
        current += 1;
        day -= Duration::days(1);
    }

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for &date in active {
        run = match previous {
            Some(prev) if (date - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    StreakSummary {
        current,
        longest,
        active_days: active.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_gap_resets_current_streak() {
        let active: BTreeSet<_> = [jan(1), jan(2), jan(3), jan(5)].into_iter().collect();
        let summary = compute_streaks(&active, jan(5));
        assert_eq!(summary.current, 1);
        assert_eq!(summary.longest, 3);
        assert_eq!(summary.active_days, 4);
    }

    #[test]
    fn test_no_play_today_means_no_current_streak() {
        let active: BTreeSet<_> = [jan(1), jan(2)].into_iter().collect();
        let summary = compute_streaks(&active, jan(3));
        assert_eq!(summary.current, 0);
        assert_eq!(summary.longest, 2);
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(
            compute_streaks(&BTreeSet::new(), jan(1)),
            StreakSummary::default()
        );
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let dec31 = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let active: BTreeSet<_> = [dec31, jan(1), jan(2)].into_iter().collect();
        let summary = compute_streaks(&active, jan(2));
        assert_eq!(summary.current, 3);
        assert_eq!(summary.longest, 3);
    }
}
