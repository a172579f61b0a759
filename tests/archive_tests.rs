//! History import with tiering, archive lookup and archive history

mod common;

use common::*;
use pezzottify_stats::archive::{
    archive_history, archive_lookup, track_hash, ArchiveImporter, ImportedPlay, TieringPolicy,
};
use pezzottify_stats::listening::TimeRange;
use pezzottify_stats::store::{ArchiveStore, EntityStore};

fn imported(artist: &str, title: &str, timestamp_ms: i64) -> ImportedPlay {
    ImportedPlay {
        artist: artist.to_string(),
        title: title.to_string(),
        album: None,
        timestamp_ms,
        duration_ms: Some(THREE_MINUTES_MS),
    }
}

/// One frequently played track, one recent single play and one forgotten single play.
fn history() -> Vec<ImportedPlay> {
    let mut plays: Vec<ImportedPlay> = (0..5)
        .map(|i| imported("Portishead", "Roads", NOW_MS - 400 * DAY_MS + i * DAY_MS))
        .collect();
    plays.push(imported("Tricky", "Hell Is Round the Corner", NOW_MS - 10 * DAY_MS));
    plays.push(imported("Morcheeba", "Trigger Hippie", NOW_MS - 500 * DAY_MS));
    plays.push(imported("Morcheeba", "Trigger Hippie", NOW_MS - 450 * DAY_MS));
    plays.push(imported("", "  ", NOW_MS));
    plays
}

#[test]
fn test_import_splits_tiers() {
    let ctx = TestContext::new();
    let importer = ArchiveImporter::new(ctx.store.clone(), TieringPolicy::default());

    let report = importer.import(&history(), TEST_IMPORT_LABEL, NOW_MS).unwrap();
    assert_eq!(report.plays_read, 9);
    assert_eq!(report.plays_skipped, 1);
    assert_eq!(report.active_tracks, 2);
    assert_eq!(report.active_plays, 6);
    assert_eq!(report.archived_tracks, 1);
    assert_eq!(report.archived_plays, 2);

    let overview = ctx.service.overview(TimeRange::AllTime).unwrap();
    assert_eq!(overview.total_plays, 6);
    assert_eq!(overview.archived_tracks, 1);
    assert_eq!(overview.archived_plays, 2);

    // Archived tracks never become active rows.
    assert!(ctx
        .store
        .find_track_by_hash(&track_hash("Morcheeba", "Trigger Hippie"))
        .unwrap()
        .is_none());
}

#[test]
fn test_reimport_is_idempotent() {
    let ctx = TestContext::new();
    let importer = ArchiveImporter::new(ctx.store.clone(), TieringPolicy::default());
    importer.import(&history(), TEST_IMPORT_LABEL, NOW_MS).unwrap();
    let second = importer.import(&history(), TEST_IMPORT_LABEL, NOW_MS).unwrap();

    assert_eq!(second.active_plays, 0);
    assert_eq!(second.archive_rows_updated, 1);

    let entry = archive_lookup(ctx.store.as_ref(), "morcheeba", "TRIGGER HIPPIE")
        .unwrap()
        .unwrap();
    assert_eq!(entry.play_count, 2);
    assert_eq!(ctx.service.overview(TimeRange::AllTime).unwrap().total_plays, 6);
}

#[test]
fn test_archive_history_decodes_timestamps() {
    let ctx = TestContext::new();
    ArchiveImporter::new(ctx.store.clone(), TieringPolicy::default())
        .import(&history(), TEST_IMPORT_LABEL, NOW_MS)
        .unwrap();

    let hash = track_hash("Morcheeba", "Trigger Hippie");
    let history = archive_history(ctx.store.as_ref(), &hash).unwrap().unwrap();
    assert_eq!(history.entry.first_seen_ms, NOW_MS - 500 * DAY_MS);
    assert_eq!(history.entry.last_seen_ms, NOW_MS - 450 * DAY_MS);
    assert_eq!(
        history.timestamps,
        Some(vec![NOW_MS - 500 * DAY_MS, NOW_MS - 450 * DAY_MS])
    );

    assert!(archive_history(ctx.store.as_ref(), "missing").unwrap().is_none());
}

#[test]
fn test_corrupt_blob_keeps_counters() {
    let ctx = TestContext::new();
    let importer = ArchiveImporter::new(ctx.store.clone(), TieringPolicy::default());
    importer.import(&history(), TEST_IMPORT_LABEL, NOW_MS).unwrap();

    let hash = track_hash("Morcheeba", "Trigger Hippie");
    let mut entry = ctx.store.get_archive_entry(&hash).unwrap().unwrap();
    entry.timestamps_blob = Some(vec![0xff, 0x00, 0x13]);
    ctx.store.update_archive_entry(&entry).unwrap();

    let history = archive_history(ctx.store.as_ref(), &hash).unwrap().unwrap();
    assert_eq!(history.timestamps, None);
    assert_eq!(history.entry.play_count, 2);

    // A later import still advances the counters.
    let more = vec![imported("Morcheeba", "Trigger Hippie", NOW_MS - 300 * DAY_MS)];
    importer.import(&more, TEST_IMPORT_LABEL, NOW_MS).unwrap();
    let entry = ctx.store.get_archive_entry(&hash).unwrap().unwrap();
    assert_eq!(entry.play_count, 3);
    assert_eq!(entry.last_seen_ms, NOW_MS - 300 * DAY_MS);
}

#[test]
fn test_promoted_track_totals_count_each_play_once() {
    let ctx = TestContext::new();
    let importer = ArchiveImporter::new(ctx.store.clone(), TieringPolicy::default());
    importer.import(&history(), TEST_IMPORT_LABEL, NOW_MS).unwrap();

    // Same export later, with the forgotten track played again recently.
    let mut later = history();
    for days in [3, 2, 1] {
        later.push(imported("Morcheeba", "Trigger Hippie", NOW_MS - days * DAY_MS));
    }
    let report = importer.import(&later, TEST_IMPORT_LABEL, NOW_MS).unwrap();
    assert_eq!(report.promoted_tracks, 1);
    assert_eq!(report.archived_tracks, 0);

    let overview = ctx.service.overview(TimeRange::AllTime).unwrap();
    assert_eq!(overview.total_plays, 11);
    assert_eq!(overview.archived_tracks, 0);
    assert_eq!(overview.archived_plays, 0);
    assert!(archive_lookup(ctx.store.as_ref(), "Morcheeba", "Trigger Hippie")
        .unwrap()
        .is_none());
}
