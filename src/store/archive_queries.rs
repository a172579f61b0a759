use super::sqlite_store::SqliteStatsStore;
use super::ArchiveStore;
use crate::archive::{ArchiveEntry, ImportBatch};
use crate::sqlite_persistence::is_unique_violation;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_entry(row: &Row) -> rusqlite::Result<ArchiveEntry> {
    Ok(ArchiveEntry {
        id: row.get(0)?,
        track_hash: row.get(1)?,
        artist: row.get(2)?,
        title: row.get(3)?,
        album: row.get(4)?,
        play_count: row.get(5)?,
        first_seen_ms: row.get(6)?,
        last_seen_ms: row.get(7)?,
        timestamps_blob: row.get(8)?,
        import_batch_id: row.get(9)?,
    })
}

impl ArchiveStore for SqliteStatsStore {
    fn insert_import_batch(&self, batch: &ImportBatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO import_batch (id, source_label, imported_at, active_count, \
             archived_count, play_count) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                batch.id,
                batch.source_label,
                batch.imported_at,
                batch.active_count,
                batch.archived_count,
                batch.play_count
            ],
        )
        .with_context(|| format!("Failed to insert import batch {}", batch.id))?;
        Ok(())
    }

    fn update_import_batch(&self, batch: &ImportBatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE import_batch SET active_count = ?1, archived_count = ?2, play_count = ?3 \
             WHERE id = ?4",
            params![
                batch.active_count,
                batch.archived_count,
                batch.play_count,
                batch.id
            ],
        )
        .with_context(|| format!("Failed to update import batch {}", batch.id))?;
        Ok(())
    }

    fn get_import_batch(&self, id: &str) -> Result<Option<ImportBatch>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, source_label, imported_at, active_count, archived_count, play_count \
             FROM import_batch WHERE id = ?1",
        )?;
        let batch = stmt
            .query_row(params![id], |row| {
                Ok(ImportBatch {
                    id: row.get(0)?,
                    source_label: row.get(1)?,
                    imported_at: row.get(2)?,
                    active_count: row.get(3)?,
                    archived_count: row.get(4)?,
                    play_count: row.get(5)?,
                })
            })
            .optional()?;
        Ok(batch)
    }

    fn get_archive_entry(&self, track_hash: &str) -> Result<Option<ArchiveEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, track_hash, artist, title, album, play_count, first_seen_ms, \
             last_seen_ms, timestamps_blob, import_batch_id FROM archive_entry \
             WHERE track_hash = ?1",
        )?;
        Ok(stmt.query_row(params![track_hash], row_to_entry).optional()?)
    }

    fn try_insert_archive_entry(&self, entry: &ArchiveEntry) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        match conn.execute(
            "INSERT INTO archive_entry (track_hash, artist, title, album, play_count, \
             first_seen_ms, last_seen_ms, timestamps_blob, import_batch_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.track_hash,
                entry.artist,
                entry.title,
                entry.album,
                entry.play_count,
                entry.first_seen_ms,
                entry.last_seen_ms,
                entry.timestamps_blob,
                entry.import_batch_id
            ],
        ) {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to insert archive entry {}", entry.track_hash)),
        }
    }

    fn update_archive_entry(&self, entry: &ArchiveEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE archive_entry SET play_count = ?1, first_seen_ms = ?2, last_seen_ms = ?3, \
             timestamps_blob = ?4, import_batch_id = ?5 WHERE track_hash = ?6",
            params![
                entry.play_count,
                entry.first_seen_ms,
                entry.last_seen_ms,
                entry.timestamps_blob,
                entry.import_batch_id,
                entry.track_hash
            ],
        )
        .with_context(|| format!("Failed to update archive entry {}", entry.track_hash))?;
        Ok(())
    }

    fn delete_archive_entry(&self, track_hash: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM archive_entry WHERE track_hash = ?1",
                params![track_hash],
            )
            .with_context(|| format!("Failed to delete archive entry {}", track_hash))?;
        Ok(deleted > 0)
    }

    fn count_archive_entries(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM archive_entry", [], |r| r.get(0))?)
    }

    fn sum_archived_plays(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COALESCE(SUM(play_count), 0) FROM archive_entry",
            [],
            |r| r.get(0),
        )?)
    }
}
