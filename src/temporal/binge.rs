use crate::listening::PlayRecord;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BingeRun {
    pub artist_id: i64,
    pub length: usize,
    pub start_ms: i64,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BingeSummary {
    pub binge_count: usize,
    pub longest: Option<BingeRun>,
}

/// Count runs of at least `min_run` consecutive plays by the same primary artist.
///
/// Plays without a resolved artist break any run.
pub fn detect_binges(plays: &[PlayRecord], min_run: usize) -> BingeSummary {
    let mut ordered: Vec<(i64, Option<i64>)> = plays
        .iter()
        .map(|p| (p.event.timestamp_ms, p.primary_artist_id))
        .collect();
    ordered.sort_by_key(|(ts, _)| *ts);

    let min_run = min_run.max(2);
    let mut summary = BingeSummary::default();
    let close_run = |run: Option<BingeRun>, summary: &mut BingeSummary| {
        let Some(run) = run else { return };
        if run.length < min_run {
            return;
        }
        summary.binge_count += 1;
        if summary.longest.as_ref().map_or(true, |l| run.length > l.length) {
            summary.longest = Some(run);
        }
    };

    let mut current: Option<BingeRun> = None;
    for (ts, artist) in ordered {
        if let (Some(artist_id), Some(run)) = (artist, current.as_mut()) {
            if run.artist_id == artist_id {
                run.length += 1;
                continue;
            }
        }
        close_run(current.take(), &mut summary);
        current = artist.map(|artist_id| BingeRun {
            artist_id,
            length: 1,
            start_ms: ts,
        });
    }
    close_run(current, &mut summary);
    summary
}
