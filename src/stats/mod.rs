//! Paged, sortable statistics over the listening history.

mod models;
mod ranking;
mod service;

pub use models::{
    ArtistDetail, Discovery, GenreTotals, Overview, StreakReport, TrackDetail, TrackPlays,
};
pub use ranking::{
    normalize_limit, paginate, rank, Rankable, Ranked, RankedPage, SortBy, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT,
};
pub use service::{StatsService, StatsSettings};
