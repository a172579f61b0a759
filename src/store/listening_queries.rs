use super::sqlite_store::SqliteStatsStore;
use super::ListeningStore;
use crate::listening::{
    AlbumTotals, ArtistTotals, EventSource, ListeningEvent, NewListeningEvent, PlayRecord,
    TimeBounds, TrackTotals,
};
use anyhow::{Context, Result};
use rusqlite::{params, Row};

const PLAY_RECORD_COLUMNS: &str = "e.id, e.track_id, e.timestamp_ms, e.play_duration_ms, \
     e.completion_percent, e.source, e.was_skipped, e.is_replay, e.pause_count, \
     e.session_ref, t.title, t.album, t.primary_artist_id";

/// Credits that receive play credit, one row per (track, artist).
const COUNTED_CREDITS: &str = "(SELECT DISTINCT track_id, artist_id FROM track_artist_credit \
     WHERE role IN ('PRIMARY', 'FEATURED'))";

fn row_to_play_record(row: &Row) -> rusqlite::Result<PlayRecord> {
    let source: String = row.get(5)?;
    Ok(PlayRecord {
        event: ListeningEvent {
            id: row.get(0)?,
            track_id: row.get(1)?,
            timestamp_ms: row.get(2)?,
            play_duration_ms: row.get(3)?,
            completion_percent: row.get(4)?,
            source: EventSource::from_str(&source),
            was_skipped: row.get(6)?,
            is_replay: row.get(7)?,
            pause_count: row.get(8)?,
            session_ref: row.get(9)?,
        },
        title: row.get(10)?,
        album: row.get(11)?,
        primary_artist_id: row.get(12)?,
    })
}

impl SqliteStatsStore {
    fn query_plays(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<PlayRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(sql)?;
        let plays = stmt
            .query_map(params, row_to_play_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plays)
    }
}

impl ListeningStore for SqliteStatsStore {
    fn insert_event(&self, event: &NewListeningEvent) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO listening_event (track_id, timestamp_ms, play_duration_ms, \
             completion_percent, source, was_skipped, is_replay, pause_count, session_ref) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.track_id,
                event.timestamp_ms,
                event.play_duration_ms,
                event.completion_percent.clamp(0.0, 100.0),
                event.source.as_str(),
                event.was_skipped,
                event.is_replay,
                event.pause_count,
                event.session_ref,
            ],
        )
        .with_context(|| format!("Failed to insert event for track {}", event.track_id))?;
        Ok(conn.last_insert_rowid())
    }

    fn event_exists(&self, track_id: i64, timestamp_ms: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT 1 FROM listening_event WHERE track_id = ?1 AND timestamp_ms = ?2 LIMIT 1",
        )?;
        Ok(stmt.exists(params![track_id, timestamp_ms])?)
    }

    fn latest_event_timestamp(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(timestamp_ms) FROM listening_event", [], |r| {
                r.get(0)
            })?;
        Ok(latest)
    }

    fn count_events(&self, bounds: TimeBounds) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM listening_event WHERE timestamp_ms >= ?1 AND timestamp_ms < ?2",
            params![bounds.start_ms, bounds.end_ms],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn plays_in_range(&self, bounds: TimeBounds) -> Result<Vec<PlayRecord>> {
        self.query_plays(
            &format!(
                "SELECT {PLAY_RECORD_COLUMNS} FROM listening_event e \
                 JOIN track t ON t.id = e.track_id \
                 WHERE e.timestamp_ms >= ?1 AND e.timestamp_ms < ?2 \
                 ORDER BY e.timestamp_ms, e.id"
            ),
            params![bounds.start_ms, bounds.end_ms],
        )
    }

    fn plays_for_track(&self, track_id: i64, bounds: TimeBounds) -> Result<Vec<PlayRecord>> {
        self.query_plays(
            &format!(
                "SELECT {PLAY_RECORD_COLUMNS} FROM listening_event e \
                 JOIN track t ON t.id = e.track_id \
                 WHERE e.track_id = ?1 AND e.timestamp_ms >= ?2 AND e.timestamp_ms < ?3 \
                 ORDER BY e.timestamp_ms, e.id"
            ),
            params![track_id, bounds.start_ms, bounds.end_ms],
        )
    }

    fn plays_for_artist(&self, artist_id: i64, bounds: TimeBounds) -> Result<Vec<PlayRecord>> {
        self.query_plays(
            &format!(
                "SELECT {PLAY_RECORD_COLUMNS} FROM listening_event e \
                 JOIN track t ON t.id = e.track_id \
                 WHERE e.timestamp_ms >= ?2 AND e.timestamp_ms < ?3 \
                 AND EXISTS (SELECT 1 FROM {COUNTED_CREDITS} c \
                     WHERE c.track_id = e.track_id AND c.artist_id = ?1) \
                 ORDER BY e.timestamp_ms, e.id"
            ),
            params![artist_id, bounds.start_ms, bounds.end_ms],
        )
    }

    fn track_totals(&self, bounds: TimeBounds) -> Result<Vec<TrackTotals>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT t.id, t.title, t.raw_artist_string, t.album, t.primary_artist_id, \
             COUNT(e.id), COALESCE(SUM(MAX(e.play_duration_ms, 0)), 0) \
             FROM listening_event e JOIN track t ON t.id = e.track_id \
             WHERE e.timestamp_ms >= ?1 AND e.timestamp_ms < ?2 \
             GROUP BY t.id",
        )?;
        let totals = stmt
            .query_map(params![bounds.start_ms, bounds.end_ms], |row| {
                Ok(TrackTotals {
                    track_id: row.get(0)?,
                    title: row.get(1)?,
                    raw_artist_string: row.get(2)?,
                    album: row.get(3)?,
                    primary_artist_id: row.get(4)?,
                    play_count: row.get(5)?,
                    total_ms: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }

    fn artist_totals(&self, bounds: TimeBounds) -> Result<Vec<ArtistTotals>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT a.id, a.canonical_name, a.image_url, \
             COUNT(e.id), COALESCE(SUM(MAX(e.play_duration_ms, 0)), 0) \
             FROM listening_event e \
             JOIN {COUNTED_CREDITS} c ON c.track_id = e.track_id \
             JOIN artist a ON a.id = c.artist_id \
             WHERE e.timestamp_ms >= ?1 AND e.timestamp_ms < ?2 \
             GROUP BY a.id"
        ))?;
        let totals = stmt
            .query_map(params![bounds.start_ms, bounds.end_ms], |row| {
                Ok(ArtistTotals {
                    artist_id: row.get(0)?,
                    name: row.get(1)?,
                    image_url: row.get(2)?,
                    play_count: row.get(3)?,
                    total_ms: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }

    fn album_totals(&self, bounds: TimeBounds) -> Result<Vec<AlbumTotals>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT MIN(t.album), COALESCE(a.canonical_name, MIN(t.raw_artist_string)), \
             COUNT(e.id), COALESCE(SUM(MAX(e.play_duration_ms, 0)), 0) \
             FROM listening_event e \
             JOIN track t ON t.id = e.track_id \
             LEFT JOIN artist a ON a.id = t.primary_artist_id \
             WHERE e.timestamp_ms >= ?1 AND e.timestamp_ms < ?2 \
             AND t.album IS NOT NULL AND trim(t.album) != '' \
             GROUP BY lower(trim(t.album)), t.primary_artist_id",
        )?;
        let totals = stmt
            .query_map(params![bounds.start_ms, bounds.end_ms], |row| {
                Ok(AlbumTotals {
                    album: row.get(0)?,
                    artist: row.get(1)?,
                    play_count: row.get(2)?,
                    total_ms: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }

    fn first_plays_of_tracks(&self, bounds: TimeBounds) -> Result<Vec<(i64, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT e.track_id, MIN(e.timestamp_ms) FROM listening_event e \
             WHERE e.track_id IN (SELECT DISTINCT track_id FROM listening_event \
                 WHERE timestamp_ms >= ?1 AND timestamp_ms < ?2) \
             GROUP BY e.track_id",
        )?;
        let firsts = stmt
            .query_map(params![bounds.start_ms, bounds.end_ms], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(firsts)
    }

    fn first_plays_of_artists(&self, bounds: TimeBounds) -> Result<Vec<(i64, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT c.artist_id, MIN(e.timestamp_ms) FROM listening_event e \
             JOIN {COUNTED_CREDITS} c ON c.track_id = e.track_id \
             WHERE c.artist_id IN (SELECT DISTINCT c2.artist_id FROM listening_event e2 \
                 JOIN {COUNTED_CREDITS} c2 ON c2.track_id = e2.track_id \
                 WHERE e2.timestamp_ms >= ?1 AND e2.timestamp_ms < ?2) \
             GROUP BY c.artist_id"
        ))?;
        let firsts = stmt
            .query_map(params![bounds.start_ms, bounds.end_ms], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(firsts)
    }
}
