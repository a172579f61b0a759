mod file_config;

pub use file_config::{
    ArchiveConfig, BackfillConfig, CacheConfig, FileConfig, ProvidersConfig, ScoringConfig,
    TemporalConfig,
};

use crate::archive::TieringPolicy;
use crate::cache::CacheSettings;
use crate::entity::BackfillSettings;
use crate::listening::time_range::offset_from_minutes;
use crate::scoring::MAX_VARIETY_TOP_N;
use crate::stats::StatsSettings;
use crate::temporal::TemporalSettings;
use anyhow::{bail, Result};
use std::path::PathBuf;

const DEFAULT_USER_AGENT: &str = concat!("pezzottify-stats/", env!("CARGO_PKG_VERSION"));

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub utc_offset_minutes: i32,
    pub cache_ttl_secs: Option<u64>,
    pub lastfm_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_path: PathBuf,
    pub utc_offset_minutes: i32,

    // Feature configs (with defaults)
    pub cache: CacheSettings,
    pub temporal: TemporalSettings,
    pub variety_top_n: usize,
    pub archive: TieringPolicy,
    pub backfill: BackfillSettings,
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub lastfm_api_key: Option<String>,
    pub deezer_enabled: bool,
    pub user_agent: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            lastfm_api_key: None,
            deezer_enabled: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let utc_offset_minutes = file.utc_offset_minutes.unwrap_or(cli.utc_offset_minutes);
        if utc_offset_minutes.abs() >= 24 * 60 {
            bail!("utc_offset_minutes out of range: {}", utc_offset_minutes);
        }

        let cache_file = file.cache.unwrap_or_default();
        let cache_defaults = CacheSettings::default();
        let cache = CacheSettings {
            ttl_secs: cache_file
                .ttl_secs
                .or(cli.cache_ttl_secs)
                .unwrap_or(cache_defaults.ttl_secs),
            max_entries: cache_file
                .max_entries
                .unwrap_or(cache_defaults.max_entries)
                .max(1),
        };

        let temporal_file = file.temporal.unwrap_or_default();
        let temporal_defaults = TemporalSettings::default();
        let temporal = TemporalSettings {
            session_gap_minutes: temporal_file
                .session_gap_minutes
                .unwrap_or(temporal_defaults.session_gap_minutes),
            binge_min_run: temporal_file
                .binge_min_run
                .unwrap_or(temporal_defaults.binge_min_run)
                .max(2),
        };

        let variety_top_n = file
            .scoring
            .unwrap_or_default()
            .variety_top_n
            .unwrap_or(MAX_VARIETY_TOP_N)
            .clamp(1, MAX_VARIETY_TOP_N);

        let archive_file = file.archive.unwrap_or_default();
        let archive_defaults = TieringPolicy::default();
        let archive = TieringPolicy {
            play_count_threshold: archive_file
                .play_count_threshold
                .unwrap_or(archive_defaults.play_count_threshold),
            recent_window_days: archive_file
                .recent_window_days
                .unwrap_or(archive_defaults.recent_window_days),
        };

        let backfill_file = file.backfill.unwrap_or_default();
        let backfill_defaults = BackfillSettings::default();
        let backfill = BackfillSettings {
            max_records: backfill_file
                .max_records
                .unwrap_or(backfill_defaults.max_records),
            batch_size: backfill_file
                .batch_size
                .unwrap_or(backfill_defaults.batch_size)
                .max(1),
        };

        let providers_file = file.providers.unwrap_or_default();
        let provider_defaults = ProviderSettings::default();
        let providers = ProviderSettings {
            lastfm_api_key: providers_file
                .lastfm_api_key
                .or_else(|| cli.lastfm_api_key.clone())
                .filter(|k| !k.trim().is_empty()),
            deezer_enabled: providers_file
                .deezer_enabled
                .unwrap_or(provider_defaults.deezer_enabled),
            user_agent: providers_file
                .user_agent
                .unwrap_or(provider_defaults.user_agent),
        };

        Ok(Self {
            db_path,
            utc_offset_minutes,
            cache,
            temporal,
            variety_top_n,
            archive,
            backfill,
            providers,
        })
    }

    pub fn stats_settings(&self) -> StatsSettings {
        StatsSettings {
            temporal: self.temporal,
            variety_top_n: self.variety_top_n,
            utc_offset: offset_from_minutes(self.utc_offset_minutes),
        }
    }
}
