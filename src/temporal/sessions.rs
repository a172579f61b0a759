use crate::listening::PlayRecord;
use serde::Serialize;

/// Consecutive plays with short gaps between them.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ListeningSession {
    pub start_ms: i64,
    pub end_ms: i64,
    pub play_count: usize,
}

impl ListeningSession {
    /// Wall-clock length from the first play's start to the last play's end.
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Group plays into sessions. A play joins the running session when it starts
/// no later than `max_gap_ms` after the session's latest end.
pub fn reconstruct_sessions(plays: &[PlayRecord], max_gap_ms: i64) -> Vec<ListeningSession> {
    let mut spans: Vec<(i64, i64)> = plays
        .iter()
        .map(|p| (p.event.timestamp_ms, p.event.end_ms()))
        .collect();
    spans.sort_unstable();

    let mut sessions: Vec<ListeningSession> = Vec::new();
    for (start, end) in spans {
        match sessions.last_mut() {
            Some(current) if start - current.end_ms <= max_gap_ms => {
                current.end_ms = current.end_ms.max(end);
                current.play_count += 1;
            }
            _ => sessions.push(ListeningSession {
                start_ms: start,
                end_ms: end,
                play_count: 1,
            }),
        }
    }
    sessions
}

pub fn longest_session(sessions: &[ListeningSession]) -> Option<&ListeningSession> {
    sessions.iter().max_by_key(|s| (s.duration_ms(), -s.start_ms))
}
