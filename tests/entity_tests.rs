//! Identity resolution against a file-backed store
//!
//! Covers concurrent creation, alias merges and how a merge shows up in the
//! aggregates once the backfill has relinked existing tracks.

mod common;

use common::*;
use pezzottify_stats::entity::{run_backfill, ArtistResolver, BackfillSettings, MergeError};
use pezzottify_stats::listening::TimeRange;
use pezzottify_stats::store::EntityStore;
use pezzottify_stats::SortBy;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_concurrent_get_or_create_yields_one_identity() {
    let ctx = TestContext::new();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = ctx.store.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let resolver = ArtistResolver::new(store);
                barrier.wait();
                let name = if i % 2 == 0 { "Boards of Canada" } else { "boards  of CANADA" };
                resolver.get_or_create(name).unwrap().id
            })
        })
        .collect();

    let ids: HashSet<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        ctx.store
            .count_artists_with_normalized_name("boards of canada")
            .unwrap(),
        1
    );
}

#[test]
fn test_topic_channel_merge_combines_stats() {
    let ctx = TestContext::new();
    let real = ctx.add_track("Nils Frahm", "Says", None);
    let topic = ctx.add_track("Nils Frahm - Topic", "Ambre", None);
    assert_ne!(real.primary_artist_id, topic.primary_artist_id);
    ctx.play(real.id, NOW_MS - 2 * HOUR_MS, THREE_MINUTES_MS);
    ctx.play(topic.id, NOW_MS - HOUR_MS, THREE_MINUTES_MS);

    let before = ctx
        .service
        .top_artists(TimeRange::AllTime, SortBy::Plays, 0, 10)
        .unwrap();
    assert_eq!(before.total, 2);

    let target_id = real.primary_artist_id.unwrap();
    let outcome = ctx
        .artists()
        .merge_into("Nils Frahm - Topic", target_id)
        .unwrap();
    assert_eq!(outcome.alias, "nils frahm - topic");
    assert_eq!(outcome.target_id, target_id);

    let report = run_backfill(&ctx.artists(), BackfillSettings::default()).unwrap();
    assert_eq!(report.relinked_after_merge, 1);
    ctx.service.invalidate_artist(target_id);

    let after = ctx
        .service
        .top_artists(TimeRange::AllTime, SortBy::Plays, 0, 10)
        .unwrap();
    assert_eq!(after.total, 1);
    assert_eq!(after.items[0].item.artist_id, target_id);
    assert_eq!(after.items[0].item.play_count, 2);

    // New captures under the old name land on the merged identity.
    let later = ctx.add_track("Nils Frahm - Topic", "Hammers", None);
    assert_eq!(later.primary_artist_id, Some(target_id));

    let detail = ctx
        .service
        .artist_detail(target_id, TimeRange::AllTime)
        .unwrap();
    assert_eq!(detail.aliases, vec!["nils frahm - topic".to_string()]);
}

#[test]
fn test_merge_into_merged_identity_is_refused() {
    let ctx = TestContext::new();
    let artists = ctx.artists();
    let a = artists.get_or_create("Aphex Twin").unwrap();
    let b = artists.get_or_create("AFX").unwrap();
    artists.merge_into("AFX", a.id).unwrap();

    let err = artists.merge_into("Polygon Window", b.id).unwrap_err();
    assert!(matches!(err, MergeError::ChainedAlias { .. }));
    assert!(matches!(
        artists.merge_into("Aphex Twin", a.id).unwrap_err(),
        MergeError::SelfMerge(_)
    ));
}
