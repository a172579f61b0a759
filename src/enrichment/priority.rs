//! Per-facet arbitration between metadata providers.
//!
//! Every facet has its own scale and its own replace rule, and each payload is
//! judged on its own: a rejected genre list never blocks an image from the same
//! provider.

use super::models::{
    AudioFeatures, EnrichedFacetSet, Facet, FacetPayload, FacetValue, FeatureSource,
    GenreSource, ImageSource, MetadataChange,
};
use super::notifier::MetadataChangeNotifier;
use crate::store::{EnrichmentStore, EntityStore};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Genre replace rule.
///
/// Not a highest-priority-wins rule: existing genres are replaced only when they
/// are empty, when MusicBrainz answers, or when Last.fm answers over a source
/// ranked below Last.fm. ITUNES never overrides SPOTIFY_DERIVED, for instance.
pub fn should_replace_genres(
    existing: &[String],
    existing_source: GenreSource,
    new: &[String],
    new_source: GenreSource,
) -> bool {
    if new.is_empty() {
        return false;
    }
    existing.is_empty()
        || new_source == GenreSource::Musicbrainz
        || (new_source == GenreSource::Lastfm
            && existing_source.priority() < GenreSource::Lastfm.priority())
}

/// Audio features follow a strict confidence chain; the same source may refresh.
pub fn should_replace_features(
    existing: Option<&AudioFeatures>,
    existing_source: Option<FeatureSource>,
    new_source: FeatureSource,
) -> bool {
    match (existing, existing_source) {
        (Some(_), Some(current)) => new_source.rank() >= current.rank(),
        _ => true,
    }
}

pub fn should_replace_image(
    existing_url: Option<&str>,
    existing_source: ImageSource,
    new_source: ImageSource,
) -> bool {
    match existing_url {
        Some(url) if !url.trim().is_empty() => new_source.priority() >= existing_source.priority(),
        _ => true,
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            out.push(value.to_string());
        }
    }
    out
}

/// Apply one provider answer to `current`. Returns the facet if it changed.
pub fn arbitrate(current: &mut EnrichedFacetSet, value: &FacetValue) -> Option<Facet> {
    match value {
        FacetValue::Genres { genres, source } => {
            let genres = clean_list(genres);
            if !should_replace_genres(&current.genres, current.genre_source, &genres, *source) {
                debug!(
                    "Track {}: keeping {} genres over {}",
                    current.track_id,
                    current.genre_source.as_str(),
                    source.as_str()
                );
                return None;
            }
            if current.genres == genres && current.genre_source == *source {
                return None;
            }
            current.genres = genres;
            current.genre_source = *source;
            Some(Facet::Genres)
        }
        FacetValue::AudioFeatures { features, source } => {
            if features.is_empty() {
                return None;
            }
            if !should_replace_features(
                current.audio_features.as_ref(),
                current.feature_source,
                *source,
            ) {
                debug!(
                    "Track {}: keeping features from {:?} over {}",
                    current.track_id,
                    current.feature_source.map(|s| s.as_str()),
                    source.as_str()
                );
                return None;
            }
            if current.audio_features.as_ref() == Some(features)
                && current.feature_source == Some(*source)
            {
                return None;
            }
            current.audio_features = Some(features.clone());
            current.feature_source = Some(*source);
            Some(Facet::AudioFeatures)
        }
        FacetValue::Image { url, source } => {
            let url = url.trim();
            if url.is_empty()
                || !should_replace_image(current.image_url.as_deref(), current.image_source, *source)
                || current.image_url.as_deref() == Some(url)
            {
                return None;
            }
            current.image_url = Some(url.to_string());
            current.image_source = *source;
            Some(Facet::Image)
        }
        FacetValue::Tags { tags } => {
            let tags = clean_list(tags);
            if tags.is_empty() || tags == current.tags {
                return None;
            }
            current.tags = tags;
            Some(Facet::Tags)
        }
        FacetValue::Unresolved => None,
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub payloads: usize,
    pub unresolved: usize,
    pub facets_changed: usize,
    pub tracks_changed: usize,
}

/// Feeds provider payloads through [`arbitrate`] and persists the survivors.
pub struct MetadataPriorityResolver<S: EnrichmentStore + EntityStore + ?Sized> {
    store: Arc<S>,
    notifier: Option<MetadataChangeNotifier>,
}

impl<S: EnrichmentStore + EntityStore + ?Sized> MetadataPriorityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: MetadataChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Arbitrate a single payload. Returns the facet that changed, if any.
    pub fn apply(&self, payload: FacetPayload) -> Result<Option<Facet>> {
        let track_id = payload.track_id;
        let changed = self.apply_to_track(track_id, std::slice::from_ref(&payload.value))?;
        Ok(changed.into_iter().next())
    }

    /// Arbitrate many payloads. Facets of one track are loaded and saved once.
    pub fn apply_batch(&self, payloads: Vec<FacetPayload>) -> Result<ApplyReport> {
        let mut report = ApplyReport {
            payloads: payloads.len(),
            ..Default::default()
        };
        let mut by_track: BTreeMap<i64, Vec<FacetValue>> = BTreeMap::new();
        for payload in payloads {
            if payload.value == FacetValue::Unresolved {
                report.unresolved += 1;
                continue;
            }
            by_track
                .entry(payload.track_id)
                .or_default()
                .push(payload.value);
        }

        for (track_id, values) in by_track {
            let changed = self.apply_to_track(track_id, &values)?;
            if !changed.is_empty() {
                report.facets_changed += changed.len();
                report.tracks_changed += 1;
            }
        }
        debug!(
            "Applied {} payloads: {} facets changed on {} tracks, {} unresolved",
            report.payloads, report.facets_changed, report.tracks_changed, report.unresolved
        );
        Ok(report)
    }

    fn apply_to_track(&self, track_id: i64, values: &[FacetValue]) -> Result<Vec<Facet>> {
        if values.iter().all(|v| *v == FacetValue::Unresolved) {
            return Ok(Vec::new());
        }
        if self.store.get_track(track_id)?.is_none() {
            anyhow::bail!("Cannot enrich unknown track {}", track_id);
        }
        let mut facets = self
            .store
            .get_facets(track_id)?
            .unwrap_or_else(|| EnrichedFacetSet::empty(track_id));

        let mut changed: Vec<Facet> = Vec::new();
        for value in values {
            if let Some(facet) = arbitrate(&mut facets, value) {
                if !changed.contains(&facet) {
                    changed.push(facet);
                }
            }
        }
        if changed.is_empty() {
            return Ok(changed);
        }

        facets.updated_at = chrono::Utc::now().timestamp();
        self.store
            .save_facets(&facets)
            .with_context(|| format!("Failed to persist arbitrated facets of track {}", track_id))?;
        if let Some(notifier) = &self.notifier {
            notifier.notify(MetadataChange::TrackFacets {
                track_id,
                facets: changed.clone(),
            });
        }
        Ok(changed)
    }

    /// Apply the genre rule to an artist identity. Returns true if genres changed.
    pub fn apply_artist_genres(
        &self,
        artist_id: i64,
        genres: &[String],
        source: GenreSource,
    ) -> Result<bool> {
        let artist = self
            .store
            .get_artist(artist_id)?
            .with_context(|| format!("Artist {} not found", artist_id))?;
        let genres = clean_list(genres);
        if !should_replace_genres(&artist.genres, artist.genre_source, &genres, source) {
            debug!(
                "Artist {}: keeping {} genres over {}",
                artist_id,
                artist.genre_source.as_str(),
                source.as_str()
            );
            return Ok(false);
        }
        if artist.genres == genres && artist.genre_source == source {
            return Ok(false);
        }
        self.store.update_artist_genres(artist_id, &genres, source)?;
        if let Some(notifier) = &self.notifier {
            notifier.notify(MetadataChange::ArtistGenres { artist_id });
        }
        Ok(true)
    }
}
