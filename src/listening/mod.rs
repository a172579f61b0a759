//! Listening events, tracks and the time windows queries run over.

pub mod models;
pub mod time_range;

pub use models::{
    AlbumTotals, ArtistTotals, EventSource, ListeningEvent, NewListeningEvent, NewTrack,
    PlayRecord, Track, TrackTotals,
};
pub use time_range::{TimeBounds, TimeRange};
