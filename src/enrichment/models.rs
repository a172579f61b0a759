//! Provenance enums and facet models for externally supplied metadata.
//!
//! Every facet carries its own source so arbitration happens per facet. Sources are
//! closed enums inside the crate and only become strings at the persistence edge.

use serde::{Deserialize, Serialize};

/// Who supplied a genre list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenreSource {
    Musicbrainz,
    Lastfm,
    Itunes,
    Reccobeats,
    SpotifyDerived,
    #[default]
    None,
}

impl GenreSource {
    pub fn priority(&self) -> u8 {
        match self {
            GenreSource::Musicbrainz => 5,
            GenreSource::Lastfm => 4,
            GenreSource::Itunes => 3,
            GenreSource::Reccobeats => 2,
            GenreSource::SpotifyDerived => 1,
            GenreSource::None => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenreSource::Musicbrainz => "MUSICBRAINZ",
            GenreSource::Lastfm => "LASTFM",
            GenreSource::Itunes => "ITUNES",
            GenreSource::Reccobeats => "RECCOBEATS",
            GenreSource::SpotifyDerived => "SPOTIFY_DERIVED",
            GenreSource::None => "NONE",
        }
    }

    /// Unrecognized strings map to `None` so old rows never fail to load.
    pub fn from_str(s: &str) -> Self {
        match s {
            "MUSICBRAINZ" => GenreSource::Musicbrainz,
            "LASTFM" => GenreSource::Lastfm,
            "ITUNES" => GenreSource::Itunes,
            "RECCOBEATS" => GenreSource::Reccobeats,
            "SPOTIFY_DERIVED" => GenreSource::SpotifyDerived,
            _ => GenreSource::None,
        }
    }
}

/// Who supplied numeric audio features, from most to least trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureSource {
    /// Verified provider, looked up directly for the track.
    SpotifyDirect,
    /// Verified provider, taken from the user's history export.
    SpotifyHistory,
    /// Averaged from other tracks by the same artist.
    ArtistDerived,
    /// Free alternative provider, catalog lookup.
    ReccobeatsLookup,
    /// Free alternative provider, analysis of an uploaded preview.
    ReccobeatsFileAnalysis,
    LocalAnalysis,
}

impl FeatureSource {
    pub fn rank(&self) -> u8 {
        match self {
            FeatureSource::SpotifyDirect => 6,
            FeatureSource::SpotifyHistory => 5,
            FeatureSource::ArtistDerived => 4,
            FeatureSource::ReccobeatsLookup => 3,
            FeatureSource::ReccobeatsFileAnalysis => 2,
            FeatureSource::LocalAnalysis => 1,
        }
    }

    /// Measured for this very track rather than borrowed from its artist.
    pub fn is_track_level(&self) -> bool {
        !matches!(self, FeatureSource::ArtistDerived)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSource::SpotifyDirect => "SPOTIFY_DIRECT",
            FeatureSource::SpotifyHistory => "SPOTIFY_HISTORY",
            FeatureSource::ArtistDerived => "ARTIST_DERIVED",
            FeatureSource::ReccobeatsLookup => "RECCOBEATS_LOOKUP",
            FeatureSource::ReccobeatsFileAnalysis => "RECCOBEATS_FILE_ANALYSIS",
            FeatureSource::LocalAnalysis => "LOCAL_ANALYSIS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SPOTIFY_DIRECT" => Some(FeatureSource::SpotifyDirect),
            "SPOTIFY_HISTORY" => Some(FeatureSource::SpotifyHistory),
            "ARTIST_DERIVED" => Some(FeatureSource::ArtistDerived),
            "RECCOBEATS_LOOKUP" => Some(FeatureSource::ReccobeatsLookup),
            "RECCOBEATS_FILE_ANALYSIS" => Some(FeatureSource::ReccobeatsFileAnalysis),
            "LOCAL_ANALYSIS" => Some(FeatureSource::LocalAnalysis),
            _ => None,
        }
    }
}

/// Who supplied an image URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageSource {
    CoverArtArchive,
    Spotify,
    Deezer,
    Itunes,
    Lastfm,
    #[default]
    None,
}

impl ImageSource {
    pub fn priority(&self) -> u8 {
        match self {
            ImageSource::CoverArtArchive => 5,
            ImageSource::Spotify => 4,
            ImageSource::Deezer => 3,
            ImageSource::Itunes => 2,
            ImageSource::Lastfm => 1,
            ImageSource::None => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::CoverArtArchive => "COVER_ART_ARCHIVE",
            ImageSource::Spotify => "SPOTIFY",
            ImageSource::Deezer => "DEEZER",
            ImageSource::Itunes => "ITUNES",
            ImageSource::Lastfm => "LASTFM",
            ImageSource::None => "NONE",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "COVER_ART_ARCHIVE" => ImageSource::CoverArtArchive,
            "SPOTIFY" => ImageSource::Spotify,
            "DEEZER" => ImageSource::Deezer,
            "ITUNES" => ImageSource::Itunes,
            "LASTFM" => ImageSource::Lastfm,
            _ => ImageSource::None,
        }
    }
}

/// Numeric audio features. Every field is optional; missing values stay missing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AudioFeatures {
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub acousticness: Option<f64>,
    /// Beats per minute.
    pub tempo: Option<f64>,
}

impl AudioFeatures {
    pub fn is_empty(&self) -> bool {
        self.valence.is_none()
            && self.energy.is_none()
            && self.danceability.is_none()
            && self.acousticness.is_none()
            && self.tempo.is_none()
    }
}

/// All enrichment facets stored for one track.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EnrichedFacetSet {
    pub track_id: i64,
    pub genres: Vec<String>,
    pub genre_source: GenreSource,
    pub audio_features: Option<AudioFeatures>,
    pub feature_source: Option<FeatureSource>,
    pub image_url: Option<String>,
    pub image_source: ImageSource,
    /// Community tags, used to estimate mood when no audio features exist.
    pub tags: Vec<String>,
    /// Unix seconds of the last change.
    pub updated_at: i64,
}

impl EnrichedFacetSet {
    pub fn empty(track_id: i64) -> Self {
        Self {
            track_id,
            ..Default::default()
        }
    }
}

/// The facet a provider record targets.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    Genres {
        genres: Vec<String>,
        source: GenreSource,
    },
    AudioFeatures {
        features: AudioFeatures,
        source: FeatureSource,
    },
    Image {
        url: String,
        source: ImageSource,
    },
    Tags {
        tags: Vec<String>,
    },
    /// The provider could not answer (no credential, offline, rate limited).
    Unresolved,
}

/// One provider's answer for one facet of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPayload {
    pub track_id: i64,
    pub value: FacetValue,
}

/// Facets touched by a payload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Genres,
    AudioFeatures,
    Image,
    Tags,
}

/// Emitted whenever stored metadata changes, so presentation layers can refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataChange {
    TrackFacets { track_id: i64, facets: Vec<Facet> },
    ArtistGenres { artist_id: i64 },
    ArtistImage { artist_id: i64, image_url: String },
    ArtistMerged { alias: String, target_id: i64 },
    TrackMerged { alias: String, target_id: i64 },
}
