use super::sqlite_store::{decode_string_list, encode_string_list, now_secs, SqliteStatsStore};
use super::EntityStore;
use crate::enrichment::GenreSource;
use crate::entity::{Alias, Artist, CreditRole, TrackArtistCredit};
use crate::listening::{NewTrack, Track};
use crate::sqlite_persistence::is_unique_violation;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

const ARTIST_COLUMNS: &str =
    "id, canonical_name, normalized_name, country, genres, genre_source, image_url";
const TRACK_COLUMNS: &str =
    "id, title, raw_artist_string, album, duration_ms, primary_artist_id, track_hash";

fn row_to_artist(row: &Row) -> rusqlite::Result<Artist> {
    let genre_source: String = row.get(5)?;
    Ok(Artist {
        id: row.get(0)?,
        canonical_name: row.get(1)?,
        normalized_name: row.get(2)?,
        country: row.get(3)?,
        genres: decode_string_list(row.get(4)?),
        genre_source: GenreSource::from_str(&genre_source),
        image_url: row.get(6)?,
    })
}

fn row_to_track(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        raw_artist_string: row.get(2)?,
        album: row.get(3)?,
        duration_ms: row.get(4)?,
        primary_artist_id: row.get(5)?,
        track_hash: row.get(6)?,
    })
}

fn row_to_alias(row: &Row) -> rusqlite::Result<Alias> {
    Ok(Alias {
        original_key: row.get(0)?,
        target_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl SqliteStatsStore {
    /// Shared body of artist and track merges. `table` is a fixed alias table name.
    fn record_merge(
        &self,
        table: &str,
        original_key: &str,
        target_id: i64,
        flatten_from: Option<i64>,
    ) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {table} (original_key, target_id, created_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(original_key) DO UPDATE SET target_id = excluded.target_id"
            ),
            params![original_key, target_id, now_secs()],
        )
        .with_context(|| format!("Failed to record alias {}", original_key))?;
        let repointed = match flatten_from {
            Some(from) if from != target_id => tx.execute(
                &format!("UPDATE {table} SET target_id = ?1 WHERE target_id = ?2"),
                params![target_id, from],
            )?,
            _ => 0,
        };
        tx.commit()?;
        Ok(repointed)
    }
}

impl EntityStore for SqliteStatsStore {
    fn get_artist(&self, id: i64) -> Result<Option<Artist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {ARTIST_COLUMNS} FROM artist WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], row_to_artist).optional()?)
    }

    fn find_artist_by_normalized_name(&self, normalized: &str) -> Result<Option<Artist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ARTIST_COLUMNS} FROM artist WHERE normalized_name = ?1"
        ))?;
        Ok(stmt.query_row(params![normalized], row_to_artist).optional()?)
    }

    fn try_insert_artist(
        &self,
        canonical_name: &str,
        normalized_name: &str,
    ) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        match conn.execute(
            "INSERT INTO artist (canonical_name, normalized_name) VALUES (?1, ?2)",
            params![canonical_name, normalized_name],
        ) {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to insert artist {}", canonical_name)),
        }
    }

    fn count_artists_with_normalized_name(&self, normalized: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM artist WHERE normalized_name = ?1",
            params![normalized],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn get_artist_alias(&self, original_key: &str) -> Result<Option<Alias>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT original_key, target_id, created_at FROM artist_alias WHERE original_key = ?1",
        )?;
        Ok(stmt.query_row(params![original_key], row_to_alias).optional()?)
    }

    fn list_artist_aliases(&self) -> Result<Vec<Alias>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT original_key, target_id, created_at FROM artist_alias ORDER BY original_key",
        )?;
        let aliases = stmt
            .query_map([], row_to_alias)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aliases)
    }

    fn record_artist_merge(
        &self,
        original_key: &str,
        target_id: i64,
        flatten_from: Option<i64>,
    ) -> Result<usize> {
        self.record_merge("artist_alias", original_key, target_id, flatten_from)
    }

    fn get_track(&self, id: i64) -> Result<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {TRACK_COLUMNS} FROM track WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], row_to_track).optional()?)
    }

    fn find_track_by_hash(&self, track_hash: &str) -> Result<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TRACK_COLUMNS} FROM track WHERE track_hash = ?1"
        ))?;
        Ok(stmt.query_row(params![track_hash], row_to_track).optional()?)
    }

    fn try_insert_track(&self, track: &NewTrack) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        match conn.execute(
            "INSERT INTO track (title, raw_artist_string, album, duration_ms, track_hash) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                track.title,
                track.raw_artist_string,
                track.album,
                track.duration_ms,
                track.track_hash
            ],
        ) {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to insert track {}", track.title)),
        }
    }

    fn get_track_alias(&self, original_key: &str) -> Result<Option<Alias>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT original_key, target_id, created_at FROM track_alias WHERE original_key = ?1",
        )?;
        Ok(stmt.query_row(params![original_key], row_to_alias).optional()?)
    }

    fn record_track_merge(
        &self,
        original_key: &str,
        target_id: i64,
        flatten_from: Option<i64>,
    ) -> Result<usize> {
        self.record_merge("track_alias", original_key, target_id, flatten_from)
    }

    fn replace_track_credits(
        &self,
        track_id: i64,
        credits: &[TrackArtistCredit],
        primary_artist_id: i64,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM track_artist_credit WHERE track_id = ?1",
            params![track_id],
        )?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO track_artist_credit (track_id, artist_id, role, credit_order) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for credit in credits {
                insert.execute(params![
                    track_id,
                    credit.artist_id,
                    credit.role.as_str(),
                    credit.credit_order
                ])?;
            }
        }
        tx.execute(
            "UPDATE track SET primary_artist_id = ?1 WHERE id = ?2",
            params![primary_artist_id, track_id],
        )?;
        tx.commit()
            .with_context(|| format!("Failed to replace credits of track {}", track_id))?;
        Ok(())
    }

    fn get_track_credits(&self, track_id: i64) -> Result<Vec<TrackArtistCredit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT track_id, artist_id, role, credit_order FROM track_artist_credit \
             WHERE track_id = ?1 ORDER BY credit_order",
        )?;
        let rows = stmt
            .query_map(params![track_id], |row| {
                let role: String = row.get(2)?;
                Ok((row.get(0)?, row.get(1)?, role, row.get(3)?))
            })?
            .collect::<Result<Vec<(i64, i64, String, u32)>, _>>()?;

        let mut credits = Vec::with_capacity(rows.len());
        for (track_id, artist_id, role, credit_order) in rows {
            match CreditRole::from_str(&role) {
                Some(role) => credits.push(TrackArtistCredit {
                    track_id,
                    artist_id,
                    role,
                    credit_order,
                }),
                None => warn!("Ignoring credit with unknown role {} on track {}", role, track_id),
            }
        }
        Ok(credits)
    }

    fn unlinked_tracks(&self, after_id: i64, limit: usize) -> Result<Vec<Track>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TRACK_COLUMNS} FROM track \
             WHERE primary_artist_id IS NULL AND id > ?1 ORDER BY id LIMIT ?2"
        ))?;
        let tracks = stmt
            .query_map(params![after_id, limit as i64], row_to_track)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn tracks_credited_to_aliased_artists(&self, limit: usize) -> Result<Vec<Track>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT t.id, t.title, t.raw_artist_string, t.album, t.duration_ms, \
             t.primary_artist_id, t.track_hash FROM track t \
             JOIN track_artist_credit c ON c.track_id = t.id \
             JOIN artist a ON a.id = c.artist_id \
             JOIN artist_alias al ON al.original_key = a.normalized_name \
             WHERE al.target_id != a.id ORDER BY t.id LIMIT ?1",
        )?;
        let tracks = stmt
            .query_map(params![limit as i64], row_to_track)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn update_artist_genres(
        &self,
        artist_id: i64,
        genres: &[String],
        source: GenreSource,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE artist SET genres = ?1, genre_source = ?2 WHERE id = ?3",
            params![encode_string_list(genres)?, source.as_str(), artist_id],
        )?;
        Ok(())
    }
}
