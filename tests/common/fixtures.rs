//! Store and event fixtures

use super::constants::*;
use pezzottify_stats::cache::CacheSettings;
use pezzottify_stats::enrichment::{ArtistImageProvider, ImageSource, ProviderError};
use pezzottify_stats::entity::{ArtistResolver, TrackResolver};
use pezzottify_stats::listening::{EventSource, NewListeningEvent, Track};
use pezzottify_stats::{ManualClock, SqliteStatsStore, StatsService, StatsSettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A file-backed store, a manual clock pinned at [`NOW_MS`] and a stats service on top.
///
/// The temp dir is kept alive for as long as the context lives.
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub store: Arc<SqliteStatsStore>,
    pub clock: Arc<ManualClock>,
    pub service: StatsService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_cache(CacheSettings::default())
    }

    pub fn with_cache(cache: CacheSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteStatsStore::new(temp_dir.path().join("stats.db"))
                .expect("Failed to open stats store"),
        );
        let clock = Arc::new(ManualClock::new(NOW_MS));
        let service = StatsService::new(
            store.clone(),
            clock.clone(),
            StatsSettings::default(),
            cache,
        )
        .expect("Failed to create stats service");
        Self {
            _temp_dir: temp_dir,
            store,
            clock,
            service,
        }
    }

    pub fn artists(&self) -> ArtistResolver<SqliteStatsStore> {
        ArtistResolver::new(self.store.clone())
    }

    /// Create a track and link its credits, as the collection path does.
    pub fn add_track(&self, raw_artist: &str, title: &str, album: Option<&str>) -> Track {
        let track = TrackResolver::new(self.store.clone())
            .get_or_create_track(raw_artist, title, album, Some(THREE_MINUTES_MS))
            .expect("Failed to create track");
        self.artists()
            .link_track(&track)
            .expect("Failed to link track")
    }

    /// Record a fully listened play through the service.
    pub fn play(&self, track_id: i64, timestamp_ms: i64, duration_ms: i64) -> i64 {
        self.service
            .record_event(&play_event(track_id, timestamp_ms, duration_ms))
            .expect("Failed to record event")
    }
}

pub fn play_event(track_id: i64, timestamp_ms: i64, duration_ms: i64) -> NewListeningEvent {
    NewListeningEvent {
        track_id,
        timestamp_ms,
        play_duration_ms: duration_ms,
        completion_percent: 100.0,
        source: EventSource::MediaSession,
        was_skipped: false,
        is_replay: false,
        pause_count: 0,
        session_ref: None,
    }
}

/// Image provider returning a fixed answer and counting how often it is asked.
pub struct FakeImageProvider {
    pub answer: Option<String>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeImageProvider {
    pub fn boxed(answer: Option<&str>) -> (Box<dyn ArtistImageProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FakeImageProvider {
            answer: answer.map(String::from),
            calls: calls.clone(),
        };
        (Box::new(provider), calls)
    }
}

impl ArtistImageProvider for FakeImageProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn source(&self) -> ImageSource {
        ImageSource::Lastfm
    }

    fn is_available(&self) -> bool {
        true
    }

    fn search_artist_image(&self, _artist_name: &str) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}
