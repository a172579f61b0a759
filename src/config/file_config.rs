use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub utc_offset_minutes: Option<i32>,

    // Feature configs
    pub cache: Option<CacheConfig>,
    pub temporal: Option<TemporalConfig>,
    pub scoring: Option<ScoringConfig>,
    pub archive: Option<ArchiveConfig>,
    pub backfill: Option<BackfillConfig>,
    pub providers: Option<ProvidersConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: Option<u64>,
    pub max_entries: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TemporalConfig {
    pub session_gap_minutes: Option<u32>,
    pub binge_min_run: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub variety_top_n: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ArchiveConfig {
    pub play_count_threshold: Option<i64>,
    pub recent_window_days: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BackfillConfig {
    pub max_records: Option<usize>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Last.fm is skipped entirely without a key.
    pub lastfm_api_key: Option<String>,
    pub deezer_enabled: Option<bool>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
