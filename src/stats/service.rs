//! Read-side query surface. Every query goes through the result cache.

use super::models::{
    ArtistDetail, Discovery, GenreTotals, Overview, StreakReport, TrackDetail, TrackPlays,
};
use super::ranking::{paginate, rank, RankedPage, SortBy};
use crate::cache::{CacheKey, CacheSettings, CacheStats, Clock, ResultCache};
use crate::enrichment::EnrichedFacetSet;
use crate::listening::time_range::{day_start_ms, local_date, offset_from_minutes};
use crate::listening::{
    AlbumTotals, ArtistTotals, NewListeningEvent, PlayRecord, TimeBounds, TimeRange, TrackTotals,
};
use crate::scoring::{
    aggregate_mood, summarize_engagement, variety_score, EngagementSummary, MoodSummary,
    VarietyScore, MAX_VARIETY_TOP_N,
};
use crate::store::FullStatsStore;
use crate::temporal::{
    active_dates, analyze_patterns, compute_streaks, daily_series, hourly_distribution,
    DailyPoint, PatternSummary, TemporalSettings,
};
use anyhow::{bail, Context, Result};
use chrono::{Duration, FixedOffset, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

const DETAIL_TOP_TRACKS: usize = 10;
const MAX_SERIES_DAYS: i64 = 366 * 5;

#[derive(Debug, Clone, Copy)]
pub struct StatsSettings {
    pub temporal: TemporalSettings,
    pub variety_top_n: usize,
    /// Offset used to bucket plays into local days and hours.
    pub utc_offset: FixedOffset,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            temporal: TemporalSettings::default(),
            variety_top_n: MAX_VARIETY_TOP_N,
            utc_offset: offset_from_minutes(0),
        }
    }
}

pub struct StatsService {
    store: Arc<dyn FullStatsStore>,
    cache: ResultCache,
    clock: Arc<dyn Clock>,
    settings: StatsSettings,
}

impl StatsService {
    pub fn new(
        store: Arc<dyn FullStatsStore>,
        clock: Arc<dyn Clock>,
        settings: StatsSettings,
        cache_settings: CacheSettings,
    ) -> Result<Self> {
        let cache = ResultCache::new(cache_settings, clock.clone(), settings.utc_offset);
        cache.set_latest_event_timestamp(store.latest_event_timestamp()?);
        Ok(Self {
            store,
            cache,
            clock,
            settings,
        })
    }

    pub fn store(&self) -> &Arc<dyn FullStatsStore> {
        &self.store
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn bounds(&self, range: TimeRange) -> TimeBounds {
        range.bounds(self.clock.now_ms(), self.settings.utc_offset)
    }

    fn today(&self) -> NaiveDate {
        local_date(self.clock.now_ms(), self.settings.utc_offset)
    }

    /// Append an event and invalidate the cached results it affects.
    pub fn record_event(&self, event: &NewListeningEvent) -> Result<i64> {
        let id = self
            .store
            .insert_event(event)
            .with_context(|| format!("Failed to record play of track {}", event.track_id))?;
        self.cache.on_new_event(event.timestamp_ms);
        Ok(id)
    }

    /// Drop what an artist merge can change: every aggregate plus that artist's detail.
    pub fn invalidate_artist(&self, artist_id: i64) -> usize {
        self.cache
            .invalidate(|key| key.artist_id() == Some(artist_id) || !key.is_entity_detail())
    }

    pub fn overview(&self, range: TimeRange) -> Result<Overview> {
        self.cache.get(CacheKey::Overview { range }, || {
            let bounds = self.bounds(range);
            let tracks = self.store.track_totals(bounds)?;
            Ok(Overview {
                range,
                total_plays: self.store.count_events(bounds)?,
                total_ms: tracks.iter().map(|t| t.total_ms).sum(),
                unique_tracks: tracks.len(),
                unique_artists: self.store.artist_totals(bounds)?.len(),
                unique_albums: self.store.album_totals(bounds)?.len(),
                archived_tracks: self.store.count_archive_entries()?,
                archived_plays: self.store.sum_archived_plays()?,
            })
        })
    }

    pub fn top_tracks(
        &self,
        range: TimeRange,
        sort: SortBy,
        offset: usize,
        limit: usize,
    ) -> Result<RankedPage<TrackTotals>> {
        let key = CacheKey::TopTracks {
            range,
            sort,
            offset,
            limit,
        };
        self.cache.get(key, || {
            let rows = self.store.track_totals(self.bounds(range))?;
            Ok(paginate(rank(rows, sort), offset, limit))
        })
    }

    pub fn top_artists(
        &self,
        range: TimeRange,
        sort: SortBy,
        offset: usize,
        limit: usize,
    ) -> Result<RankedPage<ArtistTotals>> {
        let key = CacheKey::TopArtists {
            range,
            sort,
            offset,
            limit,
        };
        self.cache.get(key, || {
            let rows = self.store.artist_totals(self.bounds(range))?;
            Ok(paginate(rank(rows, sort), offset, limit))
        })
    }

    pub fn top_albums(
        &self,
        range: TimeRange,
        sort: SortBy,
        offset: usize,
        limit: usize,
    ) -> Result<RankedPage<AlbumTotals>> {
        let key = CacheKey::TopAlbums {
            range,
            sort,
            offset,
            limit,
        };
        self.cache.get(key, || {
            let rows = self.store.album_totals(self.bounds(range))?;
            Ok(paginate(rank(rows, sort), offset, limit))
        })
    }

    /// Genres of each played track get its full play count. Tracks without
    /// genres of their own borrow those of their primary artist.
    pub fn top_genres(
        &self,
        range: TimeRange,
        offset: usize,
        limit: usize,
    ) -> Result<RankedPage<GenreTotals>> {
        let key = CacheKey::TopGenres {
            range,
            offset,
            limit,
        };
        self.cache.get(key, || {
            let tracks = self.store.track_totals(self.bounds(range))?;
            let facets = self.facets_by_track(&tracks)?;
            let mut artist_genres: HashMap<i64, Vec<String>> = HashMap::new();
            // Keyed by lowercased genre, first spelling wins for display.
            let mut totals: BTreeMap<String, GenreTotals> = BTreeMap::new();

            for track in &tracks {
                let mut genres = facets
                    .get(&track.track_id)
                    .map(|f| f.genres.clone())
                    .unwrap_or_default();
                if genres.is_empty() {
                    if let Some(artist_id) = track.primary_artist_id {
                        if !artist_genres.contains_key(&artist_id) {
                            let found = self
                                .store
                                .get_artist(artist_id)?
                                .map(|a| a.genres)
                                .unwrap_or_default();
                            artist_genres.insert(artist_id, found);
                        }
                        genres = artist_genres.get(&artist_id).cloned().unwrap_or_default();
                    }
                }
                let mut seen = HashSet::new();
                for genre in genres {
                    let key = genre.trim().to_lowercase();
                    if key.is_empty() || !seen.insert(key.clone()) {
                        continue;
                    }
                    let entry = totals.entry(key).or_insert_with(|| GenreTotals {
                        genre: genre.trim().to_string(),
                        play_count: 0,
                        total_ms: 0,
                    });
                    entry.play_count += track.play_count;
                    entry.total_ms += track.total_ms;
                }
            }
            Ok(paginate(
                rank(totals.into_values().collect(), SortBy::Plays),
                offset,
                limit,
            ))
        })
    }

    pub fn discovery(&self, range: TimeRange) -> Result<Discovery> {
        self.cache.get(CacheKey::Discovery { range }, || {
            let bounds = self.bounds(range);
            let (new_tracks, repeat_tracks) =
                split_new(&self.store.first_plays_of_tracks(bounds)?, bounds);
            let (new_artists, repeat_artists) =
                split_new(&self.store.first_plays_of_artists(bounds)?, bounds);
            let played = new_tracks + repeat_tracks;
            Ok(Discovery {
                new_tracks,
                repeat_tracks,
                new_artists,
                repeat_artists,
                new_track_ratio: if played > 0 {
                    new_tracks as f64 / played as f64
                } else {
                    0.0
                },
            })
        })
    }

    pub fn engagement(&self, range: TimeRange) -> Result<EngagementSummary> {
        self.cache.get(CacheKey::Engagement { range }, || {
            let plays = self.store.plays_in_range(self.bounds(range))?;
            Ok(summarize_engagement(plays.iter().map(|p| &p.event)))
        })
    }

    /// Day streaks over the whole history, anchored at today.
    pub fn streaks(&self) -> Result<StreakReport> {
        self.cache.get(CacheKey::Streaks, || {
            let all_time = TimeRange::AllTime.bounds(0, self.settings.utc_offset);
            let plays = self.store.plays_in_range(all_time)?;
            let today = self.today();
            Ok(StreakReport {
                today,
                streaks: compute_streaks(&active_dates(&plays, self.settings.utc_offset), today),
            })
        })
    }

    pub fn variety(&self, range: TimeRange) -> Result<VarietyScore> {
        self.cache.get(CacheKey::Variety { range }, || {
            let counts: Vec<i64> = self
                .store
                .artist_totals(self.bounds(range))?
                .iter()
                .map(|a| a.play_count)
                .collect();
            Ok(variety_score(&counts, self.settings.variety_top_n))
        })
    }

    pub fn mood(&self, range: TimeRange) -> Result<MoodSummary> {
        self.cache.get(CacheKey::Mood { range }, || {
            let tracks = self.store.track_totals(self.bounds(range))?;
            let mut facets = self.facets_by_track(&tracks)?;
            let batch: Vec<EnrichedFacetSet> = tracks
                .iter()
                .map(|t| {
                    facets
                        .remove(&t.track_id)
                        .unwrap_or_else(|| EnrichedFacetSet::empty(t.track_id))
                })
                .collect();
            Ok(aggregate_mood(&batch))
        })
    }

    pub fn patterns(&self, range: TimeRange) -> Result<PatternSummary> {
        self.cache.get(CacheKey::Patterns { range }, || {
            let plays = self.store.plays_in_range(self.bounds(range))?;
            Ok(analyze_patterns(
                &plays,
                &self.settings.temporal,
                self.settings.utc_offset,
            ))
        })
    }

    /// Plays per local day from `first` to `last` inclusive, zero-filled.
    pub fn daily_series(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<DailyPoint>> {
        if last < first {
            bail!("Series end {} is before its start {}", last, first);
        }
        if (last - first).num_days() > MAX_SERIES_DAYS {
            bail!("Series from {} to {} is too long", first, last);
        }
        self.cache.get(CacheKey::DailySeries { first, last }, || {
            let offset = self.settings.utc_offset;
            let bounds = TimeBounds {
                start_ms: day_start_ms(first, offset),
                end_ms: day_start_ms(last + Duration::days(1), offset),
            };
            let plays = self.store.plays_in_range(bounds)?;
            Ok(daily_series(&plays, first, last, offset))
        })
    }

    pub fn artist_detail(&self, artist_id: i64, range: TimeRange) -> Result<ArtistDetail> {
        self.cache.get(CacheKey::ArtistDetail { artist_id, range }, || {
            let artist = self
                .store
                .get_artist(artist_id)?
                .with_context(|| format!("Artist {} not found", artist_id))?;
            let aliases = self
                .store
                .list_artist_aliases()?
                .into_iter()
                .filter(|a| a.target_id == artist_id)
                .map(|a| a.original_key)
                .collect();
            let plays = self.store.plays_for_artist(artist_id, self.bounds(range))?;
            debug!("Artist {} detail over {} plays", artist_id, plays.len());

            let mut top_tracks = track_plays(&plays);
            top_tracks.truncate(DETAIL_TOP_TRACKS);
            Ok(ArtistDetail {
                artist,
                aliases,
                play_count: plays.len() as i64,
                total_ms: total_ms(&plays),
                first_play_ms: plays.iter().map(|p| p.timestamp_ms()).min(),
                last_play_ms: plays.iter().map(|p| p.timestamp_ms()).max(),
                top_tracks,
                hourly: hourly_distribution(&plays, self.settings.utc_offset),
            })
        })
    }

    pub fn track_detail(&self, track_id: i64, range: TimeRange) -> Result<TrackDetail> {
        self.cache.get(CacheKey::TrackDetail { track_id, range }, || {
            let track = self
                .store
                .get_track(track_id)?
                .with_context(|| format!("Track {} not found", track_id))?;
            let plays = self.store.plays_for_track(track_id, self.bounds(range))?;
            Ok(TrackDetail {
                credits: self.store.get_track_credits(track_id)?,
                facets: self.store.get_facets(track_id)?,
                play_count: plays.len() as i64,
                total_ms: total_ms(&plays),
                first_play_ms: plays.iter().map(|p| p.timestamp_ms()).min(),
                last_play_ms: plays.iter().map(|p| p.timestamp_ms()).max(),
                engagement: summarize_engagement(plays.iter().map(|p| &p.event)),
                track,
            })
        })
    }

    fn facets_by_track(&self, tracks: &[TrackTotals]) -> Result<HashMap<i64, EnrichedFacetSet>> {
        let ids: Vec<i64> = tracks.iter().map(|t| t.track_id).collect();
        Ok(self
            .store
            .get_facets_for_tracks(&ids)?
            .into_iter()
            .map(|f| (f.track_id, f))
            .collect())
    }
}

/// Count entities whose first-ever play falls inside `bounds` against the rest.
fn split_new(first_plays: &[(i64, i64)], bounds: TimeBounds) -> (usize, usize) {
    let new = first_plays
        .iter()
        .filter(|(_, first)| bounds.contains(*first))
        .count();
    (new, first_plays.len() - new)
}

fn total_ms(plays: &[PlayRecord]) -> i64 {
    plays.iter().map(|p| p.event.play_duration_ms.max(0)).sum()
}

fn track_plays(plays: &[PlayRecord]) -> Vec<TrackPlays> {
    let mut by_track: BTreeMap<i64, TrackPlays> = BTreeMap::new();
    for play in plays {
        let entry = by_track
            .entry(play.event.track_id)
            .or_insert_with(|| TrackPlays {
                track_id: play.event.track_id,
                title: play.title.clone(),
                play_count: 0,
                total_ms: 0,
            });
        entry.play_count += 1;
        entry.total_ms += play.event.play_duration_ms.max(0);
    }
    let mut rows: Vec<TrackPlays> = by_track.into_values().collect();
    rows.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then_with(|| b.total_ms.cmp(&a.total_ms))
    });
    rows
}
