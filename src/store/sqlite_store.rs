use super::schema::STATS_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite implementation of every store trait.
///
/// Query implementations live in the sibling `*_queries` modules, one per trait.
#[derive(Clone)]
pub struct SqliteStatsStore {
    pub(super) conn: Arc<Mutex<Connection>>,
}

impl SqliteStatsStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open stats database at {:?}", path))?;
        if is_new_db {
            info!("Creating new stats database at {:?}", path);
        }
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        // WAL keeps readers going while imports write.
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let version = migrate_if_needed(&mut conn, STATS_VERSIONED_SCHEMAS)
            .context("Failed to prepare stats database schema")?;
        info!("Stats database ready at schema version {}", version);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Rows store string lists as JSON arrays. Unreadable values load as empty.
pub(super) fn decode_string_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub(super) fn encode_string_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values).context("Failed to encode string list")
}

/// Current time in Unix seconds.
pub(super) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
pub(super) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
