//! Last.fm API client for artist images.
//!
//! Rate limited to 5 requests per second per Last.fm API guidelines.

use super::ProviderError;
use crate::enrichment::image::ArtistImageProvider;
use crate::enrichment::ImageSource;
use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(200); // 5 req/sec

/// Last.fm serves this star image for artists without a picture.
const PLACEHOLDER_IMAGE_HASH: &str = "2a96cbd8b46e442fc41c2b86b821562f";

const SIZE_ORDER: [&str; 5] = ["mega", "extralarge", "large", "medium", "small"];

pub struct LastFmClient {
    client: Client,
    api_key: String,
    last_request: Mutex<Instant>,
}

#[derive(Deserialize)]
struct ArtistInfoResponse {
    artist: Option<LastFmArtist>,
}

#[derive(Deserialize)]
struct LastFmArtist {
    image: Option<Vec<LastFmImage>>,
}

#[derive(Deserialize)]
struct LastFmImage {
    #[serde(rename = "#text")]
    url: Option<String>,
    size: Option<String>,
}

impl LastFmClient {
    pub fn new(api_key: &str, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
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

fn pick_image(images: Vec<LastFmImage>) -> Option<String> {
    let usable: Vec<(String, String)> = images
        .into_iter()
        .filter_map(|img| {
            let url = img.url.filter(|u| !u.trim().is_empty())?;
            if url.contains(PLACEHOLDER_IMAGE_HASH) {
                return None;
            }
            Some((img.size.unwrap_or_default(), url))
        })
        .collect();

    SIZE_ORDER
        .iter()
        .find_map(|size| usable.iter().find(|(s, _)| s == size))
        .or_else(|| usable.last())
        .map(|(_, url)| url.clone())
}

impl ArtistImageProvider for LastFmClient {
    fn name(&self) -> &'static str {
        "lastfm"
    }

    fn source(&self) -> ImageSource {
        ImageSource::Lastfm
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn search_artist_image(&self, artist_name: &str) -> Result<Option<String>, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable(self.name()));
        }
        self.rate_limit();

        let url = format!(
            "{}?method=artist.getinfo&artist={}&api_key={}&format=json&autocorrect=1",
            LASTFM_API_BASE,
            urlencoding::encode(artist_name),
            self.api_key
        );

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited(self.name()));
            }
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: ArtistInfoResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(body
            .artist
            .and_then(|a| a.image)
            .and_then(pick_image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(size: &str, url: &str) -> LastFmImage {
        LastFmImage {
            url: Some(url.to_string()),
            size: Some(size.to_string()),
        }
    }

    #[test]
    fn test_pick_image_prefers_largest() {
        let picked = pick_image(vec![
            image("small", "https://lastfm/s.jpg"),
            image("extralarge", "https://lastfm/xl.jpg"),
            image("large", "https://lastfm/l.jpg"),
        ]);
        assert_eq!(picked.as_deref(), Some("https://lastfm/xl.jpg"));
    }

    #[test]
    fn test_pick_image_skips_placeholder_and_blank() {
        let placeholder = format!("https://lastfm/300x300/{}.png", PLACEHOLDER_IMAGE_HASH);
        assert_eq!(
            pick_image(vec![image("mega", &placeholder), image("large", "  ")]),
            None
        );
    }

    #[test]
    fn test_parse_getinfo_payload() {
        let body = r##"{"artist":{"name":"Cher","image":[
            {"#text":"https://lastfm/cher-s.jpg","size":"small"},
            {"#text":"https://lastfm/cher-m.jpg","size":"medium"}]}}"##;
        let parsed: ArtistInfoResponse = serde_json::from_str(body).unwrap();
        let url = parsed.artist.and_then(|a| a.image).and_then(pick_image);
        assert_eq!(url.as_deref(), Some("https://lastfm/cher-m.jpg"));
    }
}
