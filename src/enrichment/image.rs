//! Artist image resolution: six local lookups, then external search.

use super::models::{ImageSource, MetadataChange};
use super::notifier::MetadataChangeNotifier;
use super::providers::ProviderError;
use crate::entity::normalize_name;
use crate::store::{EnrichmentStore, EntityStore};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// An external service that can find a picture for an artist name.
pub trait ArtistImageProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> ImageSource;
    /// False when a credential or connectivity is missing; the provider is skipped.
    fn is_available(&self) -> bool;
    fn search_artist_image(&self, artist_name: &str) -> Result<Option<String>, ProviderError>;
}

/// Where a resolved image came from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageTier {
    Identity,
    ExactName,
    PartialName,
    SoleArtistTrack,
    FirstCreditedTrack,
    AnyTrack,
    Provider(ImageSource),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: String,
    pub tier: ImageTier,
}

pub struct ArtistImageResolver<S: EnrichmentStore + EntityStore + ?Sized> {
    store: Arc<S>,
    providers: Vec<Box<dyn ArtistImageProvider>>,
    /// Normalized names already sent to the providers during this process.
    attempted: Mutex<HashSet<String>>,
    notifier: Option<MetadataChangeNotifier>,
}

impl<S: EnrichmentStore + EntityStore + ?Sized> ArtistImageResolver<S> {
    pub fn new(store: Arc<S>, providers: Vec<Box<dyn ArtistImageProvider>>) -> Self {
        Self {
            store,
            providers,
            attempted: Mutex::new(HashSet::new()),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: MetadataChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn identity_id(&self, normalized: &str) -> Result<Option<i64>> {
        if let Some(alias) = self.store.get_artist_alias(normalized)? {
            return Ok(Some(alias.target_id));
        }
        Ok(self
            .store
            .find_artist_by_normalized_name(normalized)?
            .map(|a| a.id))
    }

    fn local_lookup(
        &self,
        artist_id: Option<i64>,
        normalized: &str,
    ) -> Result<Option<ResolvedImage>> {
        let found = |url: Option<String>, tier| url.map(|url| ResolvedImage { url, tier });

        if let Some(id) = artist_id {
            if let Some(hit) = found(self.store.identity_image(id)?, ImageTier::Identity) {
                return Ok(Some(hit));
            }
        }
        if let Some(hit) = found(self.store.named_image_exact(normalized)?, ImageTier::ExactName) {
            return Ok(Some(hit));
        }
        if let Some(hit) = found(
            self.store.named_image_partial(normalized)?,
            ImageTier::PartialName,
        ) {
            return Ok(Some(hit));
        }
        if let Some(hit) = found(
            self.store.track_image_sole_artist(artist_id, normalized)?,
            ImageTier::SoleArtistTrack,
        ) {
            return Ok(Some(hit));
        }
        if let Some(hit) = found(
            self.store.track_image_first_credited(normalized)?,
            ImageTier::FirstCreditedTrack,
        ) {
            return Ok(Some(hit));
        }
        Ok(found(
            self.store.track_image_mentioning(normalized)?,
            ImageTier::AnyTrack,
        ))
    }

    /// Find an image for `artist_name`, searching externally at most once per name.
    pub fn resolve_image(&self, artist_name: &str) -> Result<Option<ResolvedImage>> {
        let normalized = normalize_name(artist_name);
        if normalized.is_empty() {
            return Ok(None);
        }
        let artist_id = self.identity_id(&normalized)?;

        if let Some(hit) = self.local_lookup(artist_id, &normalized)? {
            debug!("Image for {} found locally ({:?})", normalized, hit.tier);
            return Ok(Some(hit));
        }

        let available: Vec<&dyn ArtistImageProvider> = self
            .providers
            .iter()
            .map(|p| &**p)
            .filter(|p| p.is_available())
            .collect();
        if available.is_empty() {
            debug!("No image provider available for {}", normalized);
            return Ok(None);
        }
        if !self.attempted.lock().unwrap().insert(normalized.clone()) {
            debug!("Skipping external image search for {}, already attempted", normalized);
            return Ok(None);
        }

        for provider in available {
            match provider.search_artist_image(artist_name) {
                Ok(Some(url)) => {
                    self.store
                        .save_artist_image(artist_id, &normalized, &url, provider.source())?;
                    info!("Resolved image for {} via {}", normalized, provider.name());
                    if let (Some(id), Some(notifier)) = (artist_id, &self.notifier) {
                        notifier.notify(MetadataChange::ArtistImage {
                            artist_id: id,
                            image_url: url.clone(),
                        });
                    }
                    return Ok(Some(ResolvedImage {
                        url,
                        tier: ImageTier::Provider(provider.source()),
                    }));
                }
                Ok(None) => debug!("{} has no image for {}", provider.name(), normalized),
                Err(e) => warn!(
                    "Image provider {} failed for {}: {}",
                    provider.name(),
                    normalized,
                    e
                ),
            }
        }
        Ok(None)
    }

    /// Names that already went through the external search this process.
    pub fn attempted_count(&self) -> usize {
        self.attempted.lock().unwrap().len()
    }
}
