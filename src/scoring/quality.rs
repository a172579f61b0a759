use crate::listening::ListeningEvent;
use serde::Serialize;

const SKIP_PENALTY: f64 = 20.0;
const REPLAY_BONUS: f64 = 15.0;
const FOCUS_BONUS: f64 = 10.0;
const FOCUS_MIN_COMPLETION: f64 = 80.0;

/// How engaged a single play was, 0 to 100.
pub fn quality_score(event: &ListeningEvent) -> f64 {
    let completion = event.completion_percent.clamp(0.0, 100.0);
    let mut score = completion;
    if event.was_skipped {
        score -= SKIP_PENALTY;
    }
    if event.is_replay {
        score += REPLAY_BONUS;
    }
    if event.pause_count == 0 && completion >= FOCUS_MIN_COMPLETION {
        score += FOCUS_BONUS;
    }
    score.clamp(0.0, 100.0)
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct EngagementSummary {
    pub plays: usize,
    /// Share of skipped plays, 0 to 1.
    pub skip_rate: f64,
    /// Mean completion percent.
    pub completion_rate: f64,
    pub replay_count: usize,
    pub average_quality: f64,
}

pub fn summarize_engagement<'a>(
    events: impl IntoIterator<Item = &'a ListeningEvent>,
) -> EngagementSummary {
    let mut summary = EngagementSummary::default();
    let mut skipped = 0usize;
    let mut completion = 0.0;
    let mut quality = 0.0;
    for event in events {
        summary.plays += 1;
        if event.was_skipped {
            skipped += 1;
        }
        if event.is_replay {
            summary.replay_count += 1;
        }
        completion += event.completion_percent.clamp(0.0, 100.0);
        quality += quality_score(event);
    }
    if summary.plays > 0 {
        let n = summary.plays as f64;
        summary.skip_rate = skipped as f64 / n;
        summary.completion_rate = completion / n;
        summary.average_quality = quality / n;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listening::EventSource;

    fn event(completion: f64, skipped: bool, replay: bool, pauses: u32) -> ListeningEvent {
        ListeningEvent {
            id: 1,
            track_id: 1,
            timestamp_ms: 0,
            play_duration_ms: 1000,
            completion_percent: completion,
            source: EventSource::MediaSession,
            was_skipped: skipped,
            is_replay: replay,
            pause_count: pauses,
            session_ref: None,
        }
    }

    #[test]
    fn test_quality_adjustments() {
        assert_eq!(quality_score(&event(50.0, false, false, 1)), 50.0);
        assert_eq!(quality_score(&event(30.0, true, false, 2)), 10.0);
        assert_eq!(quality_score(&event(60.0, false, true, 1)), 75.0);
        assert_eq!(quality_score(&event(85.0, false, false, 0)), 95.0);
        // focus bonus needs high completion
        assert_eq!(quality_score(&event(79.0, false, false, 0)), 79.0);
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(quality_score(&event(100.0, false, true, 0)), 100.0);
        assert_eq!(quality_score(&event(5.0, true, false, 3)), 0.0);
    }

    #[test]
    fn test_engagement_summary() {
        let events = vec![
            event(100.0, false, false, 0),
            event(20.0, true, false, 0),
            event(90.0, false, true, 1),
            event(50.0, true, false, 0),
        ];
        let summary = summarize_engagement(&events);
        assert_eq!(summary.plays, 4);
        assert_eq!(summary.skip_rate, 0.5);
        assert_eq!(summary.completion_rate, 65.0);
        assert_eq!(summary.replay_count, 1);
        assert_eq!(summarize_engagement(&[]), EngagementSummary::default());
    }
}
