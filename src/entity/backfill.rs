//! Bounded re-resolution of track credits.

use super::models::BackfillReport;
use super::resolver::ArtistResolver;
use crate::store::EntityStore;
use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillSettings {
    /// Hard cap on tracks examined per run.
    pub max_records: usize,
    pub batch_size: usize,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            max_records: 5000,
            batch_size: 200,
        }
    }
}

/// Link unlinked tracks, then relink tracks credited to identities that have since
/// been merged away.
///
/// A run never examines more than `max_records` tracks, and a track that fails is
/// not retried within the same run.
pub fn run_backfill<S: EntityStore + ?Sized>(
    resolver: &ArtistResolver<S>,
    settings: BackfillSettings,
) -> Result<BackfillReport> {
    let mut report = BackfillReport::default();
    let mut failed: HashSet<i64> = HashSet::new();
    let batch_size = settings.batch_size.max(1);
    let sentinel_id = resolver.unknown_artist()?.id;

    let mut after_id = 0;
    while report.examined < settings.max_records {
        let limit = batch_size.min(settings.max_records - report.examined);
        let batch = resolver.store().unlinked_tracks(after_id, limit)?;
        if batch.is_empty() {
            break;
        }
        for track in batch {
            after_id = track.id;
            report.examined += 1;
            match resolver.link_track(&track) {
                Ok(linked) => {
                    report.linked += 1;
                    if linked.primary_artist_id == Some(sentinel_id) {
                        report.linked_to_sentinel += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to link track {}: {:#}", track.id, e);
                    failed.insert(track.id);
                    report.failed += 1;
                }
            }
        }
    }

    while report.examined < settings.max_records {
        let limit = batch_size.min(settings.max_records - report.examined);
        let batch: Vec<_> = resolver
            .store()
            .tracks_credited_to_aliased_artists(limit + failed.len())?
            .into_iter()
            .filter(|t| !failed.contains(&t.id))
            .take(limit)
            .collect();
        if batch.is_empty() {
            break;
        }
        for track in batch {
            report.examined += 1;
            match resolver.link_track(&track) {
                Ok(_) => report.relinked_after_merge += 1,
                Err(e) => {
                    warn!("Failed to relink track {}: {:#}", track.id, e);
                    failed.insert(track.id);
                    report.failed += 1;
                }
            }
        }
    }

    report.hit_cap = report.examined >= settings.max_records;
    info!(
        "Backfill examined {} tracks: {} linked ({} to unknown artist), {} relinked, {} failed{}",
        report.examined,
        report.linked,
        report.linked_to_sentinel,
        report.relinked_after_merge,
        report.failed,
        if report.hit_cap { ", cap reached" } else { "" }
    );
    Ok(report)
}
