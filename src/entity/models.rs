//! Artist identity models.

use serde::{Deserialize, Serialize};

/// Canonical name of the shared identity unresolvable tracks are linked to.
pub const UNKNOWN_ARTIST_NAME: &str = "Unknown Artist";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Artist {
    pub id: i64,
    pub canonical_name: String,
    /// Case-folded, trimmed name. Unique across artists.
    pub normalized_name: String,
    pub country: Option<String>,
    pub genres: Vec<String>,
    pub genre_source: crate::enrichment::GenreSource,
    pub image_url: Option<String>,
}

/// Role of an artist on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditRole {
    Primary,
    Featured,
    Producer,
    Remixer,
    Composer,
    Performer,
}

impl CreditRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditRole::Primary => "PRIMARY",
            CreditRole::Featured => "FEATURED",
            CreditRole::Producer => "PRODUCER",
            CreditRole::Remixer => "REMIXER",
            CreditRole::Composer => "COMPOSER",
            CreditRole::Performer => "PERFORMER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRIMARY" => Some(CreditRole::Primary),
            "FEATURED" => Some(CreditRole::Featured),
            "PRODUCER" => Some(CreditRole::Producer),
            "REMIXER" => Some(CreditRole::Remixer),
            "COMPOSER" => Some(CreditRole::Composer),
            "PERFORMER" => Some(CreditRole::Performer),
            _ => None,
        }
    }

    /// Roles that receive play credit in per-artist aggregations.
    pub fn counts_as_play(&self) -> bool {
        matches!(self, CreditRole::Primary | CreditRole::Featured)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackArtistCredit {
    pub track_id: i64,
    pub artist_id: i64,
    pub role: CreditRole,
    pub credit_order: u32,
}

/// A user-directed redirect from a normalized name to an identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub original_key: String,
    pub target_id: i64,
    /// Unix seconds.
    pub created_at: i64,
}

/// Identities resolved from one raw artist string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCredits {
    pub primary: Vec<Artist>,
    pub featured: Vec<Artist>,
}

impl ResolvedCredits {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.featured.is_empty()
    }
}

/// Outcome of one bounded backfill run.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub examined: usize,
    pub linked: usize,
    pub linked_to_sentinel: usize,
    pub relinked_after_merge: usize,
    pub failed: usize,
    /// True if the run stopped because it reached its record cap.
    pub hit_cap: bool,
}
