use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_stats::archive::{archive_history, archive_lookup, ArchiveImporter, ImportedPlay};
use pezzottify_stats::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_stats::enrichment::{
    build_image_providers, ArtistImageResolver, MetadataChangeNotifier,
};
use pezzottify_stats::entity::{run_backfill, ArtistResolver};
use pezzottify_stats::listening::TimeRange;
use pezzottify_stats::{FullStatsStore, SortBy, SqliteStatsStore, StatsService, SystemClock};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

fn parse_range(s: &str) -> Result<TimeRange, String> {
    TimeRange::parse(s).ok_or_else(|| {
        format!(
            "unknown range '{}', expected today, this_week, this_month, this_year, all_time or last_<n>_days",
            s
        )
    })
}

fn parse_sort(s: &str) -> Result<SortBy, String> {
    SortBy::parse(s).ok_or_else(|| format!("unknown sort '{}', expected plays, time or blended", s))
}

#[derive(Parser, Debug)]
#[command(name = "stats-cli")]
#[command(about = "Listening statistics over a local play history database")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct CliArgs {
    /// Path to the SQLite stats database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Offset from UTC, in minutes, used to bucket plays into local days.
    #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
    pub utc_offset_minutes: i32,

    /// How long query results stay cached, in seconds.
    #[clap(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Last.fm API key, enables Last.fm artist image lookups.
    #[clap(long)]
    pub lastfm_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TopKind {
    Tracks,
    Artists,
    Albums,
    Genres,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Totals for a time range.
    Overview {
        #[clap(default_value = "this_week", value_parser = parse_range)]
        range: TimeRange,
    },
    /// Ranked tracks, artists, albums or genres.
    Top {
        kind: TopKind,
        #[clap(default_value = "this_month", value_parser = parse_range)]
        range: TimeRange,
        #[clap(long, default_value = "plays", value_parser = parse_sort)]
        sort: SortBy,
        #[clap(long, default_value_t = 0)]
        offset: usize,
        #[clap(long, default_value_t = 20)]
        limit: usize,
    },
    /// Discovery, engagement, variety, mood and listening patterns for a range.
    Insights {
        #[clap(default_value = "this_month", value_parser = parse_range)]
        range: TimeRange,
    },
    /// Current and longest day streaks.
    Streaks,
    /// Redirect an artist name to an existing artist.
    MergeArtist { source_name: String, target_id: i64 },
    /// Link unresolved tracks to artists and fix credits of merged artists.
    Backfill,
    /// Import a JSON lines play history, archiving the long tail.
    ImportArchive {
        #[clap(value_parser = parse_path)]
        file: PathBuf,
        #[clap(long, default_value = "history-import")]
        label: String,
    },
    /// Look up the archive row of a track.
    ArchiveLookup {
        artist: String,
        title: String,
        /// Also decode the per-play timestamps.
        #[clap(long)]
        history: bool,
    },
    /// Find an image for an artist, searching external providers if needed.
    ArtistImage { name: String },
}

#[derive(Serialize)]
struct Insights {
    range: TimeRange,
    discovery: pezzottify_stats::stats::Discovery,
    engagement: pezzottify_stats::scoring::EngagementSummary,
    variety: pezzottify_stats::scoring::VarietyScore,
    mood: pezzottify_stats::scoring::MoodSummary,
    patterns: pezzottify_stats::temporal::PatternSummary,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_plays(file: &Path) -> Result<Vec<ImportedPlay>> {
    let reader = std::io::BufReader::new(
        std::fs::File::open(file).with_context(|| format!("Failed to open {:?}", file))?,
    );
    let mut plays = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ImportedPlay>(&line) {
            Ok(play) => plays.push(play),
            Err(e) => warn!("Skipping line {} of {:?}: {}", line_no + 1, file, e),
        }
    }
    Ok(plays)
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        utc_offset_minutes: cli_args.utc_offset_minutes,
        cache_ttl_secs: cli_args.cache_ttl_secs,
        lastfm_api_key: cli_args.lastfm_api_key.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite stats database at {:?}...", config.db_path);
    let store = Arc::new(SqliteStatsStore::new(&config.db_path)?);
    let notifier = MetadataChangeNotifier::new();

    match cli_args.command {
        Command::Overview { range } => {
            print_json(&stats_service(&store, &config)?.overview(range)?)?;
        }
        Command::Top {
            kind,
            range,
            sort,
            offset,
            limit,
        } => {
            let service = stats_service(&store, &config)?;
            match kind {
                TopKind::Tracks => print_json(&service.top_tracks(range, sort, offset, limit)?)?,
                TopKind::Artists => {
                    print_json(&service.top_artists(range, sort, offset, limit)?)?
                }
                TopKind::Albums => print_json(&service.top_albums(range, sort, offset, limit)?)?,
                TopKind::Genres => print_json(&service.top_genres(range, offset, limit)?)?,
            }
        }
        Command::Insights { range } => {
            let service = stats_service(&store, &config)?;
            print_json(&Insights {
                range,
                discovery: service.discovery(range)?,
                engagement: service.engagement(range)?,
                variety: service.variety(range)?,
                mood: service.mood(range)?,
                patterns: service.patterns(range)?,
            })?;
        }
        Command::Streaks => {
            print_json(&stats_service(&store, &config)?.streaks()?)?;
        }
        Command::MergeArtist {
            source_name,
            target_id,
        } => {
            let resolver = ArtistResolver::new(store.clone()).with_notifier(notifier);
            let outcome = resolver.merge_into(&source_name, target_id)?;
            print_json(&outcome)?;
        }
        Command::Backfill => {
            let resolver = ArtistResolver::new(store.clone()).with_notifier(notifier);
            print_json(&run_backfill(&resolver, config.backfill)?)?;
        }
        Command::ImportArchive { file, label } => {
            let plays = read_plays(&file)?;
            info!("Read {} plays from {:?}", plays.len(), file);
            let importer = ArchiveImporter::new(store.clone(), config.archive);
            let now_ms = chrono::Utc::now().timestamp_millis();
            print_json(&importer.import(&plays, &label, now_ms)?)?;
        }
        Command::ArchiveLookup {
            artist,
            title,
            history,
        } => match archive_lookup(store.as_ref(), &artist, &title)? {
            Some(entry) if history => {
                print_json(&archive_history(store.as_ref(), &entry.track_hash)?)?
            }
            Some(entry) => print_json(&entry)?,
            None => {
                warn!("No archive entry for {} - {}", artist, title);
                print_json(&serde_json::Value::Null)?;
            }
        },
        Command::ArtistImage { name } => {
            let providers = build_image_providers(&config.providers);
            info!("{} image providers configured", providers.len());
            let resolver = ArtistImageResolver::new(store.clone(), providers).with_notifier(notifier);
            print_json(&resolver.resolve_image(&name)?)?;
        }
    }

    Ok(())
}

fn stats_service(store: &Arc<SqliteStatsStore>, config: &AppConfig) -> Result<StatsService> {
    let store: Arc<dyn FullStatsStore> = store.clone();
    StatsService::new(
        store,
        Arc::new(SystemClock),
        config.stats_settings(),
        config.cache,
    )
}
