//! Artist and track identity resolution.

mod backfill;
mod models;
mod normalize;
mod parser;
mod resolver;
mod tracks;

pub use backfill::{run_backfill, BackfillSettings};
pub use models::{
    Alias, Artist, BackfillReport, CreditRole, ResolvedCredits, TrackArtistCredit,
    UNKNOWN_ARTIST_NAME,
};
pub use normalize::{clean_display_name, is_placeholder, normalize_name};
pub use parser::{parse_artist_credits, ParsedCredits};
pub use resolver::{ArtistResolver, MergeOutcome};
pub use tracks::TrackResolver;

use thiserror::Error;

/// Why a merge command was refused.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Source name is blank")]
    BlankSource,
    #[error("Target identity {0} does not exist")]
    UnknownTarget(i64),
    #[error("Cannot merge {0} into itself")]
    SelfMerge(String),
    #[error("Target {target} is already merged into {redirects_to}; merge into that instead")]
    ChainedAlias { target: String, redirects_to: i64 },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
