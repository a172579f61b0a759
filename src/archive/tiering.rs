use super::models::Tier;
use crate::listening::time_range::MILLIS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieringPolicy {
    /// Tracks with more plays than this stay active.
    pub play_count_threshold: i64,
    /// Tracks played within this many days of the import stay active.
    pub recent_window_days: u32,
}

impl Default for TieringPolicy {
    fn default() -> Self {
        Self {
            play_count_threshold: 3,
            recent_window_days: 90,
        }
    }
}

impl TieringPolicy {
    pub fn classify(&self, play_count: i64, last_played_ms: i64, now_ms: i64) -> Tier {
        let recent_cutoff = now_ms - self.recent_window_days as i64 * MILLIS_PER_DAY;
        if play_count > self.play_count_threshold || last_played_ms >= recent_cutoff {
            Tier::Active
        } else {
            Tier::Archive
        }
    }
}
