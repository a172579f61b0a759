//! External artist image search providers.
//!
//! - Last.fm: `artist.getinfo`, needs an API key
//! - Deezer: keyless artist search

#[cfg(not(feature = "no_providers"))]
mod deezer;
#[cfg(not(feature = "no_providers"))]
mod lastfm;

#[cfg(not(feature = "no_providers"))]
pub use deezer::DeezerClient;
#[cfg(not(feature = "no_providers"))]
pub use lastfm::LastFmClient;

use super::image::ArtistImageProvider;
use crate::config::ProviderSettings;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider {0} is not available")]
    Unavailable(&'static str),
    #[error("provider {0} rate limited the request")]
    RateLimited(&'static str),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider answered with status {0}")]
    Status(u16),
    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Providers in the order they should be consulted.
#[cfg(not(feature = "no_providers"))]
pub fn build_image_providers(settings: &ProviderSettings) -> Vec<Box<dyn ArtistImageProvider>> {
    let mut providers: Vec<Box<dyn ArtistImageProvider>> = Vec::new();
    if let Some(key) = settings.lastfm_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        match LastFmClient::new(key, &settings.user_agent) {
            Ok(client) => providers.push(Box::new(client)),
            Err(e) => tracing::warn!("Last.fm client unavailable: {}", e),
        }
    }
    if settings.deezer_enabled {
        match DeezerClient::new(&settings.user_agent) {
            Ok(client) => providers.push(Box::new(client)),
            Err(e) => tracing::warn!("Deezer client unavailable: {}", e),
        }
    }
    providers
}

#[cfg(feature = "no_providers")]
pub fn build_image_providers(_settings: &ProviderSettings) -> Vec<Box<dyn ArtistImageProvider>> {
    Vec::new()
}
