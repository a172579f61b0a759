//! The durable keyed store behind every component.
//!
//! Each concern gets its own trait; [`SqliteStatsStore`] implements all of them on a
//! single database file.

mod archive_queries;
mod enrichment_queries;
mod entity_queries;
mod listening_queries;
mod schema;
mod sqlite_store;

pub use schema::STATS_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStatsStore;

use crate::archive::{ArchiveEntry, ImportBatch};
use crate::enrichment::{EnrichedFacetSet, GenreSource, ImageSource};
use crate::entity::{Alias, Artist, TrackArtistCredit};
use crate::listening::{
    AlbumTotals, ArtistTotals, NewListeningEvent, NewTrack, PlayRecord, TimeBounds, Track,
    TrackTotals,
};
use anyhow::Result;

pub trait ListeningStore: Send + Sync {
    /// Append an event to the log. Returns the new event id.
    fn insert_event(&self, event: &NewListeningEvent) -> Result<i64>;
    fn event_exists(&self, track_id: i64, timestamp_ms: i64) -> Result<bool>;
    fn latest_event_timestamp(&self) -> Result<Option<i64>>;
    fn count_events(&self, bounds: TimeBounds) -> Result<i64>;
    /// Events in `bounds` joined with their tracks, oldest first.
    fn plays_in_range(&self, bounds: TimeBounds) -> Result<Vec<PlayRecord>>;
    fn plays_for_track(&self, track_id: i64, bounds: TimeBounds) -> Result<Vec<PlayRecord>>;
    fn plays_for_artist(&self, artist_id: i64, bounds: TimeBounds) -> Result<Vec<PlayRecord>>;

    fn track_totals(&self, bounds: TimeBounds) -> Result<Vec<TrackTotals>>;
    /// Every primary and featured credit of a played track gets the full play.
    fn artist_totals(&self, bounds: TimeBounds) -> Result<Vec<ArtistTotals>>;
    fn album_totals(&self, bounds: TimeBounds) -> Result<Vec<AlbumTotals>>;

    /// First-ever play of every track played within `bounds`.
    fn first_plays_of_tracks(&self, bounds: TimeBounds) -> Result<Vec<(i64, i64)>>;
    /// First-ever credited play of every artist played within `bounds`.
    fn first_plays_of_artists(&self, bounds: TimeBounds) -> Result<Vec<(i64, i64)>>;
}

pub trait EntityStore: Send + Sync {
    fn get_artist(&self, id: i64) -> Result<Option<Artist>>;
    fn find_artist_by_normalized_name(&self, normalized: &str) -> Result<Option<Artist>>;
    /// Insert a new identity. Returns `None` if the normalized name already exists.
    fn try_insert_artist(&self, canonical_name: &str, normalized_name: &str)
        -> Result<Option<i64>>;
    fn count_artists_with_normalized_name(&self, normalized: &str) -> Result<i64>;

    fn get_artist_alias(&self, original_key: &str) -> Result<Option<Alias>>;
    fn list_artist_aliases(&self) -> Result<Vec<Alias>>;
    /// Store `original_key -> target_id` and re-point aliases that targeted
    /// `flatten_from` to `target_id`, in one transaction. Returns re-pointed count.
    fn record_artist_merge(
        &self,
        original_key: &str,
        target_id: i64,
        flatten_from: Option<i64>,
    ) -> Result<usize>;

    fn get_track(&self, id: i64) -> Result<Option<Track>>;
    fn find_track_by_hash(&self, track_hash: &str) -> Result<Option<Track>>;
    /// Insert a new track. Returns `None` if the hash already exists.
    fn try_insert_track(&self, track: &NewTrack) -> Result<Option<i64>>;
    fn get_track_alias(&self, original_key: &str) -> Result<Option<Alias>>;
    fn record_track_merge(
        &self,
        original_key: &str,
        target_id: i64,
        flatten_from: Option<i64>,
    ) -> Result<usize>;

    /// Replace every credit of a track and set its primary artist, atomically.
    fn replace_track_credits(
        &self,
        track_id: i64,
        credits: &[TrackArtistCredit],
        primary_artist_id: i64,
    ) -> Result<()>;
    fn get_track_credits(&self, track_id: i64) -> Result<Vec<TrackArtistCredit>>;
    /// Tracks without a primary artist and with id greater than `after_id`.
    fn unlinked_tracks(&self, after_id: i64, limit: usize) -> Result<Vec<Track>>;
    /// Tracks credited to an identity whose own name now redirects elsewhere.
    fn tracks_credited_to_aliased_artists(&self, limit: usize) -> Result<Vec<Track>>;
    fn update_artist_genres(
        &self,
        artist_id: i64,
        genres: &[String],
        source: GenreSource,
    ) -> Result<()>;
}

pub trait EnrichmentStore: Send + Sync {
    fn get_facets(&self, track_id: i64) -> Result<Option<EnrichedFacetSet>>;
    fn get_facets_for_tracks(&self, track_ids: &[i64]) -> Result<Vec<EnrichedFacetSet>>;
    fn save_facets(&self, facets: &EnrichedFacetSet) -> Result<()>;

    // Artist image fallback tiers, cheapest first.
    fn identity_image(&self, artist_id: i64) -> Result<Option<String>>;
    fn named_image_exact(&self, normalized: &str) -> Result<Option<String>>;
    fn named_image_partial(&self, normalized: &str) -> Result<Option<String>>;
    fn track_image_sole_artist(
        &self,
        artist_id: Option<i64>,
        normalized: &str,
    ) -> Result<Option<String>>;
    fn track_image_first_credited(&self, normalized: &str) -> Result<Option<String>>;
    fn track_image_mentioning(&self, normalized: &str) -> Result<Option<String>>;
    /// Persist a resolved image on the identity and in the name-keyed table.
    fn save_artist_image(
        &self,
        artist_id: Option<i64>,
        normalized: &str,
        url: &str,
        source: ImageSource,
    ) -> Result<()>;
}

pub trait ArchiveStore: Send + Sync {
    fn insert_import_batch(&self, batch: &ImportBatch) -> Result<()>;
    /// Overwrite the counters of a batch recorded earlier.
    fn update_import_batch(&self, batch: &ImportBatch) -> Result<()>;
    fn get_import_batch(&self, id: &str) -> Result<Option<ImportBatch>>;
    fn get_archive_entry(&self, track_hash: &str) -> Result<Option<ArchiveEntry>>;
    /// Insert a new entry. Returns `None` if the hash already exists.
    fn try_insert_archive_entry(&self, entry: &ArchiveEntry) -> Result<Option<i64>>;
    /// Overwrite counters, blob and batch of an existing entry by hash.
    fn update_archive_entry(&self, entry: &ArchiveEntry) -> Result<()>;
    /// Returns false if no entry had that hash.
    fn delete_archive_entry(&self, track_hash: &str) -> Result<bool>;
    fn count_archive_entries(&self) -> Result<i64>;
    fn sum_archived_plays(&self) -> Result<i64>;
}

/// Every store concern at once.
pub trait FullStatsStore: ListeningStore + EntityStore + EnrichmentStore + ArchiveStore {}

impl<T: ListeningStore + EntityStore + EnrichmentStore + ArchiveStore> FullStatsStore for T {}
