//! Deezer artist search. Keyless, but throttled to stay under the public quota.

use super::ProviderError;
use crate::enrichment::image::ArtistImageProvider;
use crate::enrichment::ImageSource;
use crate::entity::normalize_name;
use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEEZER_API_BASE: &str = "https://api.deezer.com";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(120); // 50 req / 5 sec
const SEARCH_LIMIT: usize = 5;

pub struct DeezerClient {
    client: Client,
    last_request: Mutex<Instant>,
}

#[derive(Deserialize)]
struct SearchResponse {
    data: Option<Vec<DeezerArtist>>,
    error: Option<DeezerError>,
}

#[derive(Deserialize)]
struct DeezerError {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct DeezerArtist {
    name: String,
    picture_xl: Option<String>,
    picture_big: Option<String>,
}

impl DeezerClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            last_request: Mutex::new(Instant::now() - RATE_LIMIT_INTERVAL),
        })
    }

    fn rate_limit(&self) {
        let mut last = self.last_request.lock().unwrap();
        let elapsed = last.elapsed();
        if elapsed < RATE_LIMIT_INTERVAL {
            std::thread::sleep(RATE_LIMIT_INTERVAL - elapsed);
        }
        *last = Instant::now();
    }
}

/// Deezer returns `.../images/artist//...` for artists without a picture.
fn usable_picture(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty() && !u.contains("/artist//"))
}

fn pick_picture(artists: Vec<DeezerArtist>, wanted: &str) -> Option<String> {
    let wanted = normalize_name(wanted);
    artists
        .into_iter()
        .filter(|a| normalize_name(&a.name) == wanted)
        .find_map(|a| usable_picture(a.picture_xl).or_else(|| usable_picture(a.picture_big)))
}

impl ArtistImageProvider for DeezerClient {
    fn name(&self) -> &'static str {
        "deezer"
    }

    fn source(&self) -> ImageSource {
        ImageSource::Deezer
    }

    fn is_available(&self) -> bool {
        true
    }

    fn search_artist_image(&self, artist_name: &str) -> Result<Option<String>, ProviderError> {
        self.rate_limit();

        let url = format!(
            "{}/search/artist?q={}&limit={}",
            DEEZER_API_BASE,
            urlencoding::encode(artist_name),
            SEARCH_LIMIT
        );

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited(self.name()));
            }
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(error) = body.error {
            // Code 4 is Deezer's quota error, delivered with a 200.
            if error.code == Some(4) {
                return Err(ProviderError::RateLimited(self.name()));
            }
            return Err(ProviderError::Parse(error.message.unwrap_or_default()));
        }

        Ok(body.data.and_then(|artists| pick_picture(artists, artist_name)))
    }
}
