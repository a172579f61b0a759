use super::codec;
use super::hash::track_hash;
use super::models::{ArchiveEntry, ArchiveHistory, ImportBatch, ImportReport, ImportedPlay, Tier};
use super::tiering::TieringPolicy;
use crate::entity::{ArtistResolver, TrackResolver};
use crate::listening::{EventSource, NewListeningEvent};
use crate::store::{ArchiveStore, EntityStore, ListeningStore};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Plays of one (artist, title) pair within an import.
struct PlayGroup {
    artist: String,
    title: String,
    album: Option<String>,
    duration_ms: Option<i64>,
    timestamps: Vec<i64>,
}

/// Splits imported history between the active and archive tiers.
///
/// Tiering is decided once, here. Archived rows are keyed by track hash, so importing
/// the same file twice leaves the archive unchanged. A later import that pushes an
/// archived track over the policy moves its whole history into the event log and
/// drops the row.
pub struct ArchiveImporter<S: EntityStore + ListeningStore + ArchiveStore + ?Sized> {
    store: Arc<S>,
    policy: TieringPolicy,
}

impl<S: EntityStore + ListeningStore + ArchiveStore + ?Sized> ArchiveImporter<S> {
    pub fn new(store: Arc<S>, policy: TieringPolicy) -> Self {
        Self { store, policy }
    }

    pub fn import(
        &self,
        plays: &[ImportedPlay],
        source_label: &str,
        now_ms: i64,
    ) -> Result<ImportReport> {
        let mut batch = ImportBatch {
            id: Uuid::new_v4().to_string(),
            source_label: source_label.to_string(),
            imported_at: now_ms / 1000,
            active_count: 0,
            archived_count: 0,
            play_count: 0,
        };
        self.store.insert_import_batch(&batch)?;

        let mut report = ImportReport {
            batch_id: batch.id.clone(),
            plays_read: plays.len(),
            ..Default::default()
        };

        let mut groups: BTreeMap<String, PlayGroup> = BTreeMap::new();
        for play in plays {
            if play.title.trim().is_empty() {
                report.plays_skipped += 1;
                continue;
            }
            let group = groups
                .entry(track_hash(&play.artist, &play.title))
                .or_insert_with(|| PlayGroup {
                    artist: play.artist.trim().to_string(),
                    title: play.title.trim().to_string(),
                    album: None,
                    duration_ms: None,
                    timestamps: Vec::new(),
                });
            group.timestamps.push(play.timestamp_ms);
            if group.album.is_none() {
                group.album = play.album.clone().filter(|a| !a.trim().is_empty());
            }
            if group.duration_ms.is_none() {
                group.duration_ms = play.duration_ms;
            }
        }

        let tracks = TrackResolver::new(self.store.clone());
        let artists = ArtistResolver::new(self.store.clone());

        for (hash, mut group) in groups {
            group.timestamps.sort_unstable();
            let already_active = self.store.find_track_by_hash(&hash)?.is_some()
                || self.store.get_track_alias(&hash)?.is_some();
            let archived = self.store.get_archive_entry(&hash)?;
            let history = archived.as_ref().and_then(readable_history);
            // Plays already in the archive count towards the threshold, once each.
            let combined = history
                .as_ref()
                .map(|h| union_history(h, &group.timestamps));

            let tier = if already_active {
                Tier::Active
            } else if archived.is_some() && history.is_none() {
                // Unreadable history cannot be moved into events.
                Tier::Archive
            } else {
                let plays = combined.as_ref().unwrap_or(&group.timestamps);
                let last_played = plays.last().copied().unwrap_or(i64::MIN);
                self.policy.classify(plays.len() as i64, last_played, now_ms)
            };

            match tier {
                Tier::Active => {
                    if let Some(combined) = combined {
                        group.timestamps = combined;
                    } else if archived.is_some() {
                        warn!(
                            "Track {} is active but keeps an unreadable archive row",
                            hash
                        );
                    }
                    let inserted = self.import_active(&tracks, &artists, &group)?;
                    if history.is_some() && self.store.delete_archive_entry(&hash)? {
                        info!(
                            "Promoted {} - {} from the archive ({} plays)",
                            group.artist,
                            group.title,
                            group.timestamps.len()
                        );
                        report.promoted_tracks += 1;
                    }
                    report.active_tracks += 1;
                    report.active_plays += inserted;
                }
                Tier::Archive => {
                    if self.upsert_archive(&hash, &group, &batch.id)? {
                        report.archive_rows_updated += 1;
                    }
                    report.archived_tracks += 1;
                    report.archived_plays += group.timestamps.len();
                }
            }
        }

        batch.active_count = report.active_tracks as i64;
        batch.archived_count = report.archived_tracks as i64;
        batch.play_count = (report.active_plays + report.archived_plays) as i64;
        self.store.update_import_batch(&batch)?;

        info!(
            "Import {} from {}: {} plays read, {} tracks active ({} plays), {} archived ({} plays, {} rows updated), {} skipped",
            batch.id,
            source_label,
            report.plays_read,
            report.active_tracks,
            report.active_plays,
            report.archived_tracks,
            report.archived_plays,
            report.archive_rows_updated,
            report.plays_skipped
        );
        Ok(report)
    }

    /// Returns the number of new events written.
    fn import_active(
        &self,
        tracks: &TrackResolver<S>,
        artists: &ArtistResolver<S>,
        group: &PlayGroup,
    ) -> Result<usize> {
        let mut track = tracks.get_or_create_track(
            &group.artist,
            &group.title,
            group.album.as_deref(),
            group.duration_ms,
        )?;
        if track.primary_artist_id.is_none() {
            track = artists.link_track(&track)?;
        }

        let duration = group.duration_ms.or(track.duration_ms).unwrap_or(0);
        let mut inserted = 0;
        for &timestamp_ms in &group.timestamps {
            if self.store.event_exists(track.id, timestamp_ms)? {
                continue;
            }
            self.store.insert_event(&NewListeningEvent {
                track_id: track.id,
                timestamp_ms,
                play_duration_ms: duration,
                completion_percent: 100.0,
                source: EventSource::HistoryImport,
                was_skipped: false,
                is_replay: false,
                pause_count: 0,
                session_ref: None,
            })?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Insert or extend the archive row for `hash`. Returns true if a row existed.
    fn upsert_archive(&self, hash: &str, group: &PlayGroup, batch_id: &str) -> Result<bool> {
        if let Some(existing) = self.store.get_archive_entry(hash)? {
            self.extend_entry(existing, &group.timestamps, batch_id)?;
            return Ok(true);
        }

        let entry = ArchiveEntry {
            id: 0,
            track_hash: hash.to_string(),
            artist: group.artist.clone(),
            title: group.title.clone(),
            album: group.album.clone(),
            play_count: group.timestamps.len() as i64,
            first_seen_ms: group.timestamps.first().copied().unwrap_or_default(),
            last_seen_ms: group.timestamps.last().copied().unwrap_or_default(),
            timestamps_blob: Some(codec::encode(&group.timestamps)?),
            import_batch_id: Some(batch_id.to_string()),
        };
        match self.store.try_insert_archive_entry(&entry)? {
            Some(_) => Ok(false),
            None => {
                debug!("Archive entry {} appeared concurrently, merging", hash);
                let existing = self
                    .store
                    .get_archive_entry(hash)?
                    .with_context(|| format!("Archive entry {} missing after conflict", hash))?;
                self.extend_entry(existing, &group.timestamps, batch_id)?;
                Ok(true)
            }
        }
    }

    fn extend_entry(&self, existing: ArchiveEntry, new: &[i64], batch_id: &str) -> Result<()> {
        let merged = merge_into_entry(existing, new, batch_id)?;
        self.store.update_archive_entry(&merged)
    }
}

/// Add `new` plays to an archive entry. Plays already present are not counted twice.
///
/// If the stored history cannot be read, the counters are still advanced and the
/// blob is dropped, so the row keeps reporting totals without per-play history.
fn merge_into_entry(existing: ArchiveEntry, new: &[i64], batch_id: &str) -> Result<ArchiveEntry> {
    let new_min = new.iter().copied().min();
    let new_max = new.iter().copied().max();

    match readable_history(&existing) {
        Some(history) => {
            let merged = union_history(&history, new);
            if merged.len() == history.len() {
                return Ok(existing);
            }
            Ok(ArchiveEntry {
                play_count: merged.len() as i64,
                first_seen_ms: merged.first().copied().unwrap_or(existing.first_seen_ms),
                last_seen_ms: merged.last().copied().unwrap_or(existing.last_seen_ms),
                timestamps_blob: Some(codec::encode(&merged)?),
                import_batch_id: Some(batch_id.to_string()),
                ..existing
            })
        }
        None => Ok(ArchiveEntry {
            play_count: existing.play_count + new.len() as i64,
            first_seen_ms: new_min.map_or(existing.first_seen_ms, |m| m.min(existing.first_seen_ms)),
            last_seen_ms: new_max.map_or(existing.last_seen_ms, |m| m.max(existing.last_seen_ms)),
            timestamps_blob: None,
            import_batch_id: Some(batch_id.to_string()),
            ..existing
        }),
    }
}

/// Sorted `history` plus the plays of `new` it does not hold yet, each added once.
fn union_history(history: &[i64], new: &[i64]) -> Vec<i64> {
    let mut added: Vec<i64> = new
        .iter()
        .copied()
        .filter(|ts| history.binary_search(ts).is_err())
        .collect();
    added.sort_unstable();
    added.dedup();
    let mut merged = Vec::with_capacity(history.len() + added.len());
    merged.extend_from_slice(history);
    merged.extend(added);
    merged.sort_unstable();
    merged
}

/// Decoded history of an entry, if present and consistent with its counters.
fn readable_history(entry: &ArchiveEntry) -> Option<Vec<i64>> {
    let blob = entry.timestamps_blob.as_ref()?;
    match codec::decode(blob) {
        Ok(history)
            if history.len() as i64 == entry.play_count
                && history.first() == Some(&entry.first_seen_ms)
                && history.last() == Some(&entry.last_seen_ms) =>
        {
            Some(history)
        }
        Ok(history) => {
            warn!(
                "Archive entry {} history disagrees with its counters ({} stamps, {} plays)",
                entry.track_hash,
                history.len(),
                entry.play_count
            );
            None
        }
        Err(e) => {
            warn!(
                "Archive entry {} has an unreadable history blob: {}",
                entry.track_hash, e
            );
            None
        }
    }
}

/// Archive row for an (artist, title) pair, without decoding its history.
pub fn archive_lookup<S: ArchiveStore + ?Sized>(
    store: &S,
    artist: &str,
    title: &str,
) -> Result<Option<ArchiveEntry>> {
    store.get_archive_entry(&track_hash(artist, title))
}

/// Archive row plus decoded history. A corrupt blob yields `timestamps: None`.
pub fn archive_history<S: ArchiveStore + ?Sized>(
    store: &S,
    track_hash: &str,
) -> Result<Option<ArchiveHistory>> {
    Ok(store.get_archive_entry(track_hash)?.map(|entry| {
        let timestamps = readable_history(&entry);
        ArchiveHistory { entry, timestamps }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listening::time_range::MILLIS_PER_DAY;
    use crate::store::SqliteStatsStore;

    const NOW: i64 = 1_700_000_000_000;

    fn play(artist: &str, title: &str, ts: i64) -> ImportedPlay {
        ImportedPlay {
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            timestamp_ms: ts,
            duration_ms: Some(180_000),
        }
    }

    fn importer() -> (Arc<SqliteStatsStore>, ArchiveImporter<SqliteStatsStore>) {
        let store = Arc::new(SqliteStatsStore::open_in_memory().unwrap());
        let importer = ArchiveImporter::new(store.clone(), TieringPolicy::default());
        (store, importer)
    }

    fn old(days: i64) -> i64 {
        NOW - days * MILLIS_PER_DAY
    }

    #[test]
    fn test_import_splits_tiers() {
        let (store, importer) = importer();
        let mut plays: Vec<_> = (0..5).map(|i| play("Hits", "Single", old(200 + i))).collect();
        plays.push(play("Obscure", "B-Side", old(300)));
        plays.push(play("Obscure", "B-Side", old(301)));
        plays.push(play("Fresh", "New", old(1)));
        plays.push(play("Nobody", "  ", old(1)));

        let report = importer.import(&plays, "lastfm", NOW).unwrap();
        assert_eq!(report.active_tracks, 2);
        assert_eq!(report.active_plays, 6);
        assert_eq!(report.archived_tracks, 1);
        assert_eq!(report.archived_plays, 2);
        assert_eq!(report.plays_skipped, 1);

        let entry = archive_lookup(store.as_ref(), "obscure", "b-side")
            .unwrap()
            .unwrap();
        assert_eq!(entry.play_count, 2);
        assert_eq!(entry.first_seen_ms, old(301));
        assert_eq!(entry.last_seen_ms, old(300));

        let batch = store.get_import_batch(&report.batch_id).unwrap().unwrap();
        assert_eq!(batch.play_count, 8);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let (store, importer) = importer();
        let plays = vec![
            play("Obscure", "B-Side", old(300)),
            play("Obscure", "B-Side", old(310)),
            play("Hits", "Single", old(1)),
        ];
        importer.import(&plays, "file", NOW).unwrap();
        let report = importer.import(&plays, "file", NOW).unwrap();
        assert_eq!(report.archive_rows_updated, 1);
        assert_eq!(report.active_plays, 0);

        assert_eq!(store.count_archive_entries().unwrap(), 1);
        assert_eq!(store.sum_archived_plays().unwrap(), 2);
    }

    #[test]
    fn test_incremental_import_extends_history() {
        let (store, importer) = importer();
        importer
            .import(&[play("Obscure", "B-Side", old(300))], "a", NOW)
            .unwrap();
        importer
            .import(&[play("Obscure", "B-Side", old(200))], "b", NOW)
            .unwrap();

        let hash = track_hash("Obscure", "B-Side");
        let history = archive_history(store.as_ref(), &hash).unwrap().unwrap();
        assert_eq!(history.entry.play_count, 2);
        assert_eq!(history.timestamps, Some(vec![old(300), old(200)]));
    }

    #[test]
    fn test_resync_with_earlier_play_counts_known_plays_once() {
        let (store, importer) = importer();
        let first: Vec<_> = [400, 390, 380]
            .iter()
            .map(|d| play("Obscure", "B-Side", old(*d)))
            .collect();
        importer.import(&first, "a", NOW).unwrap();

        // The earlier play sorts before the known ones.
        let resync = vec![
            play("Obscure", "B-Side", old(500)),
            play("Obscure", "B-Side", old(380)),
        ];
        importer.import(&resync, "b", NOW).unwrap();

        let hash = track_hash("Obscure", "B-Side");
        let history = archive_history(store.as_ref(), &hash).unwrap().unwrap();
        assert_eq!(history.entry.play_count, 4);
        assert_eq!(
            history.timestamps,
            Some(vec![old(500), old(400), old(390), old(380)])
        );
    }

    #[test]
    fn test_archived_track_promoted_without_double_counting() {
        let (store, importer) = importer();
        let archived = vec![
            play("Obscure", "B-Side", old(300)),
            play("Obscure", "B-Side", old(290)),
        ];
        importer.import(&archived, "a", NOW).unwrap();
        assert_eq!(store.count_archive_entries().unwrap(), 1);

        // Same two plays again plus three more: five distinct plays, over the threshold.
        let mut export = archived.clone();
        export.extend((0..3).map(|i| play("Obscure", "B-Side", old(200 + i))));
        let report = importer.import(&export, "b", NOW).unwrap();
        assert_eq!(report.promoted_tracks, 1);
        assert_eq!(report.active_plays, 5);

        let all_time = crate::listening::TimeBounds {
            start_ms: i64::MIN,
            end_ms: i64::MAX,
        };
        assert_eq!(store.count_events(all_time).unwrap(), 5);
        assert_eq!(store.count_archive_entries().unwrap(), 0);
        assert_eq!(store.sum_archived_plays().unwrap(), 0);

        // Importing the same export again changes nothing.
        let again = importer.import(&export, "c", NOW).unwrap();
        assert_eq!(again.active_plays, 0);
        assert_eq!(store.count_events(all_time).unwrap(), 5);
    }

    #[test]
    fn test_archived_plays_count_towards_threshold() {
        let (store, importer) = importer();
        importer
            .import(
                &[
                    play("Obscure", "B-Side", old(300)),
                    play("Obscure", "B-Side", old(299)),
                    play("Obscure", "B-Side", old(298)),
                ],
                "a",
                NOW,
            )
            .unwrap();
        // Only one new play in this file, but four distinct plays in total.
        let report = importer
            .import(&[play("Obscure", "B-Side", old(250))], "b", NOW)
            .unwrap();
        assert_eq!(report.promoted_tracks, 1);
        assert_eq!(store.count_archive_entries().unwrap(), 0);
        assert!(store
            .find_track_by_hash(&track_hash("Obscure", "B-Side"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_corrupt_blob_keeps_counters() {
        let (store, importer) = importer();
        importer
            .import(&[play("Obscure", "B-Side", old(300))], "a", NOW)
            .unwrap();
        let hash = track_hash("Obscure", "B-Side");
        let mut entry = store.get_archive_entry(&hash).unwrap().unwrap();
        entry.timestamps_blob = Some(vec![codec::BLOB_VERSION, 1, 2, 3]);
        store.update_archive_entry(&entry).unwrap();

        let history = archive_history(store.as_ref(), &hash).unwrap().unwrap();
        assert_eq!(history.timestamps, None);
        assert_eq!(history.entry.play_count, 1);

        importer
            .import(&[play("Obscure", "B-Side", old(250))], "b", NOW)
            .unwrap();
        let entry = store.get_archive_entry(&hash).unwrap().unwrap();
        assert_eq!(entry.play_count, 2);
        assert_eq!(entry.first_seen_ms, old(300));
        assert_eq!(entry.last_seen_ms, old(250));
    }
}
