//! End-to-end tests for the stats query surface
//!
//! Tracks are created and linked the way the collection path does it, plays go in
//! through `StatsService::record_event`, and every query reads through the cache.

mod common;

use chrono::NaiveDate;
use common::*;
use pezzottify_stats::listening::TimeRange;
use pezzottify_stats::SortBy;

#[test]
fn test_track_totals_sum_to_overview() {
    let ctx = TestContext::new();
    let a = ctx.add_track("Air", "Sexy Boy", Some("Moon Safari"));
    let b = ctx.add_track("Air", "Kelly Watch the Stars", Some("Moon Safari"));
    let c = ctx.add_track("Bonobo", "Kerala", Some("Migration"));

    ctx.play(a.id, NOW_MS - 3 * HOUR_MS, 200_000);
    ctx.play(a.id, NOW_MS - 2 * HOUR_MS, 180_000);
    ctx.play(b.id, NOW_MS - HOUR_MS, 90_000);
    ctx.play(c.id, NOW_MS - 30 * MINUTE_MS, 240_000);

    let overview = ctx.service.overview(TimeRange::Today).unwrap();
    assert_eq!(overview.total_plays, 4);
    assert_eq!(overview.unique_tracks, 3);
    assert_eq!(overview.unique_artists, 2);
    assert_eq!(overview.unique_albums, 2);

    let page = ctx
        .service
        .top_tracks(TimeRange::Today, SortBy::Plays, 0, 50)
        .unwrap();
    assert_eq!(page.total, 3);
    let plays: i64 = page.items.iter().map(|r| r.item.play_count).sum();
    let time: i64 = page.items.iter().map(|r| r.item.total_ms).sum();
    assert_eq!(plays, overview.total_plays);
    assert_eq!(time, overview.total_ms);
    assert_eq!(page.items[0].item.track_id, a.id);
    assert_eq!(page.items[0].rank, 1);
}

#[test]
fn test_sort_by_time_reorders_ranking() {
    let ctx = TestContext::new();
    let short = ctx.add_track("Air", "Short", None);
    let long = ctx.add_track("Air", "Long", None);

    for i in 0..3 {
        ctx.play(short.id, NOW_MS - (i + 1) * MINUTE_MS * 10, 30_000);
    }
    ctx.play(long.id, NOW_MS - HOUR_MS, 600_000);

    let by_plays = ctx
        .service
        .top_tracks(TimeRange::Today, SortBy::Plays, 0, 10)
        .unwrap();
    let by_time = ctx
        .service
        .top_tracks(TimeRange::Today, SortBy::Time, 0, 10)
        .unwrap();
    assert_eq!(by_plays.items[0].item.track_id, short.id);
    assert_eq!(by_time.items[0].item.track_id, long.id);
}

#[test]
fn test_featured_artist_gets_full_credit() {
    let ctx = TestContext::new();
    let duet = ctx.add_track("Daft Punk feat. Pharrell Williams", "Get Lucky", None);
    ctx.play(duet.id, NOW_MS - HOUR_MS, 240_000);

    let page = ctx
        .service
        .top_artists(TimeRange::Today, SortBy::Plays, 0, 10)
        .unwrap();
    assert_eq!(page.total, 2);
    for ranked in &page.items {
        assert_eq!(ranked.item.play_count, 1);
        assert_eq!(ranked.item.total_ms, 240_000);
    }
    let mut names: Vec<&str> = page.items.iter().map(|r| r.item.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Daft Punk", "Pharrell Williams"]);
}

#[test]
fn test_new_event_refreshes_cached_week() {
    let ctx = TestContext::new();
    let track = ctx.add_track("Moderat", "Bad Kingdom", None);
    ctx.play(track.id, NOW_MS - DAY_MS, THREE_MINUTES_MS);

    let before = ctx.service.overview(TimeRange::ThisWeek).unwrap();
    assert_eq!(before.total_plays, 1);
    // Served from cache.
    ctx.service.overview(TimeRange::ThisWeek).unwrap();
    assert_eq!(ctx.service.cache_stats().hits, 1);

    ctx.play(track.id, NOW_MS - MINUTE_MS, THREE_MINUTES_MS);
    let after = ctx.service.overview(TimeRange::ThisWeek).unwrap();
    assert_eq!(after.total_plays, 2);
}

#[test]
fn test_event_outside_custom_range_leaves_result_unchanged() {
    let ctx = TestContext::new();
    let track = ctx.add_track("Moderat", "A New Error", None);
    let range = TimeRange::Custom {
        start_ms: NOW_MS - 10 * DAY_MS,
        end_ms: NOW_MS - 5 * DAY_MS,
    };
    ctx.play(track.id, NOW_MS - 7 * DAY_MS, THREE_MINUTES_MS);
    assert_eq!(ctx.service.overview(range).unwrap().total_plays, 1);

    ctx.play(track.id, NOW_MS - MINUTE_MS, THREE_MINUTES_MS);
    assert_eq!(ctx.service.overview(range).unwrap().total_plays, 1);
    assert_eq!(ctx.service.overview(TimeRange::AllTime).unwrap().total_plays, 2);
}

#[test]
fn test_discovery_splits_new_and_repeat() {
    let ctx = TestContext::new();
    let old = ctx.add_track("Air", "Playground Love", None);
    let fresh = ctx.add_track("Caribou", "Odessa", None);
    ctx.play(old.id, NOW_MS - 30 * DAY_MS, THREE_MINUTES_MS);
    ctx.play(old.id, NOW_MS - HOUR_MS, THREE_MINUTES_MS);
    ctx.play(fresh.id, NOW_MS - HOUR_MS / 2, THREE_MINUTES_MS);

    let discovery = ctx.service.discovery(TimeRange::Today).unwrap();
    assert_eq!(discovery.new_tracks, 1);
    assert_eq!(discovery.repeat_tracks, 1);
    assert_eq!(discovery.new_artists, 1);
    assert_eq!(discovery.repeat_artists, 1);
    assert!((discovery.new_track_ratio - 0.5).abs() < 1e-9);
}

#[test]
fn test_streaks_follow_active_days() {
    let ctx = TestContext::new();
    let track = ctx.add_track("Four Tet", "Baby", None);
    // Active today, yesterday and four days ago.
    ctx.play(track.id, NOW_MS - HOUR_MS, THREE_MINUTES_MS);
    ctx.play(track.id, NOW_MS - DAY_MS, THREE_MINUTES_MS);
    ctx.play(track.id, NOW_MS - 4 * DAY_MS, THREE_MINUTES_MS);

    let report = ctx.service.streaks().unwrap();
    assert_eq!(report.today, NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
    assert_eq!(report.streaks.current, 2);
    assert_eq!(report.streaks.longest, 2);
    assert_eq!(report.streaks.active_days, 3);
}

#[test]
fn test_daily_series_fills_empty_days() {
    let ctx = TestContext::new();
    let track = ctx.add_track("Jon Hopkins", "Emerald Rush", None);
    ctx.play(track.id, NOW_MS - 2 * DAY_MS, 100_000);
    ctx.play(track.id, NOW_MS, 50_000);

    let first = NaiveDate::from_ymd_opt(2023, 11, 13).unwrap();
    let last = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
    let series = ctx.service.daily_series(first, last).unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].plays, 1);
    assert_eq!(series[1].plays, 0);
    assert_eq!(series[2].plays, 1);
    assert_eq!(series[2].total_ms, 50_000);

    assert!(ctx.service.daily_series(last, first).is_err());
}

#[test]
fn test_variety_is_zero_for_single_artist() {
    let ctx = TestContext::new();
    let track = ctx.add_track("Burial", "Archangel", None);
    ctx.play(track.id, NOW_MS - HOUR_MS, THREE_MINUTES_MS);
    ctx.play(track.id, NOW_MS - MINUTE_MS * 10, THREE_MINUTES_MS);

    let variety = ctx.service.variety(TimeRange::Today).unwrap();
    assert_eq!(variety.score, 0.0);
    assert_eq!(variety.artists_considered, 1);
}

#[test]
fn test_artist_and_track_detail() {
    let ctx = TestContext::new();
    let track = ctx.add_track("Röyksopp", "Eple", Some("Melody A.M."));
    ctx.play(track.id, NOW_MS - 2 * HOUR_MS, 200_000);
    ctx.play(track.id, NOW_MS - HOUR_MS, 100_000);

    let artist_id = track.primary_artist_id.unwrap();
    let artist = ctx
        .service
        .artist_detail(artist_id, TimeRange::AllTime)
        .unwrap();
    assert_eq!(artist.play_count, 2);
    assert_eq!(artist.total_ms, 300_000);
    assert_eq!(artist.top_tracks[0].track_id, track.id);
    assert_eq!(artist.last_play_ms, Some(NOW_MS - HOUR_MS));

    let detail = ctx
        .service
        .track_detail(track.id, TimeRange::AllTime)
        .unwrap();
    assert_eq!(detail.play_count, 2);
    assert_eq!(detail.credits.len(), 1);
    assert_eq!(detail.engagement.plays, 2);

    assert!(ctx.service.track_detail(9999, TimeRange::AllTime).is_err());
}
