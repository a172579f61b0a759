use super::sqlite_store::{
    decode_string_list, encode_string_list, escape_like, now_secs, SqliteStatsStore,
};
use super::EnrichmentStore;
use crate::enrichment::{AudioFeatures, EnrichedFacetSet, FeatureSource, GenreSource, ImageSource};
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const FACET_COLUMNS: &str = "track_id, genres, genre_source, valence, energy, danceability, \
     acousticness, tempo, feature_source, image_url, image_source, tags, updated_at";

fn row_to_facets(row: &Row) -> rusqlite::Result<EnrichedFacetSet> {
    let genre_source: String = row.get(2)?;
    let feature_source: Option<String> = row.get(8)?;
    let image_source: String = row.get(10)?;
    let features = AudioFeatures {
        valence: row.get(3)?,
        energy: row.get(4)?,
        danceability: row.get(5)?,
        acousticness: row.get(6)?,
        tempo: row.get(7)?,
    };
    Ok(EnrichedFacetSet {
        track_id: row.get(0)?,
        genres: decode_string_list(row.get(1)?),
        genre_source: GenreSource::from_str(&genre_source),
        audio_features: (!features.is_empty()).then_some(features),
        feature_source: feature_source.as_deref().and_then(FeatureSource::from_str),
        image_url: row.get(9)?,
        image_source: ImageSource::from_str(&image_source),
        tags: decode_string_list(row.get(11)?),
        updated_at: row.get(12)?,
    })
}

impl SqliteStatsStore {
    fn first_image(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(sql)?;
        let url: Option<String> = stmt.query_row(params, |r| r.get(0)).optional()?;
        Ok(url.filter(|u| !u.trim().is_empty()))
    }
}

impl EnrichmentStore for SqliteStatsStore {
    fn get_facets(&self, track_id: i64) -> Result<Option<EnrichedFacetSet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {FACET_COLUMNS} FROM track_enrichment WHERE track_id = ?1"
        ))?;
        Ok(stmt.query_row(params![track_id], row_to_facets).optional()?)
    }

    fn get_facets_for_tracks(&self, track_ids: &[i64]) -> Result<Vec<EnrichedFacetSet>> {
        let conn = self.conn.lock().unwrap();
        let mut all = Vec::with_capacity(track_ids.len());
        // Stay well below SQLite's bound parameter limit.
        for chunk in track_ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {FACET_COLUMNS} FROM track_enrichment WHERE track_id IN ({placeholders})"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), row_to_facets)?
                .collect::<Result<Vec<_>, _>>()?;
            all.extend(rows);
        }
        Ok(all)
    }

    fn save_facets(&self, facets: &EnrichedFacetSet) -> Result<()> {
        let features = facets.audio_features.clone().unwrap_or_default();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO track_enrichment (track_id, genres, genre_source, valence, \
             energy, danceability, acousticness, tempo, feature_source, image_url, image_source, \
             tags, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                facets.track_id,
                encode_string_list(&facets.genres)?,
                facets.genre_source.as_str(),
                features.valence,
                features.energy,
                features.danceability,
                features.acousticness,
                features.tempo,
                facets.feature_source.map(|s| s.as_str()),
                facets.image_url,
                facets.image_source.as_str(),
                encode_string_list(&facets.tags)?,
                facets.updated_at,
            ],
        )
        .with_context(|| format!("Failed to save facets of track {}", facets.track_id))?;
        Ok(())
    }

    fn identity_image(&self, artist_id: i64) -> Result<Option<String>> {
        self.first_image(
            "SELECT image_url FROM artist WHERE id = ?1 AND image_url IS NOT NULL",
            params![artist_id],
        )
    }

    fn named_image_exact(&self, normalized: &str) -> Result<Option<String>> {
        self.first_image(
            "SELECT image_url FROM artist_image WHERE normalized_name = ?1",
            params![normalized],
        )
    }

    fn named_image_partial(&self, normalized: &str) -> Result<Option<String>> {
        self.first_image(
            "SELECT image_url FROM artist_image \
             WHERE normalized_name LIKE '%' || ?1 || '%' ESCAPE '\\' \
             ORDER BY length(normalized_name) LIMIT 1",
            params![escape_like(normalized)],
        )
    }

    fn track_image_sole_artist(
        &self,
        artist_id: Option<i64>,
        normalized: &str,
    ) -> Result<Option<String>> {
        self.first_image(
            "SELECT te.image_url FROM track t JOIN track_enrichment te ON te.track_id = t.id \
             WHERE te.image_url IS NOT NULL \
             AND ((?1 IS NOT NULL AND t.primary_artist_id = ?1) \
             OR lower(trim(t.raw_artist_string)) = ?2) \
             ORDER BY t.id LIMIT 1",
            params![artist_id, normalized],
        )
    }

    fn track_image_first_credited(&self, normalized: &str) -> Result<Option<String>> {
        self.first_image(
            "SELECT te.image_url FROM track t JOIN track_enrichment te ON te.track_id = t.id \
             WHERE te.image_url IS NOT NULL \
             AND lower(trim(t.raw_artist_string)) LIKE ?1 || '%' ESCAPE '\\' \
             ORDER BY t.id LIMIT 1",
            params![escape_like(normalized)],
        )
    }

    fn track_image_mentioning(&self, normalized: &str) -> Result<Option<String>> {
        self.first_image(
            "SELECT te.image_url FROM track t JOIN track_enrichment te ON te.track_id = t.id \
             WHERE te.image_url IS NOT NULL \
             AND lower(t.raw_artist_string) LIKE '%' || ?1 || '%' ESCAPE '\\' \
             ORDER BY t.id LIMIT 1",
            params![escape_like(normalized)],
        )
    }

    fn save_artist_image(
        &self,
        artist_id: Option<i64>,
        normalized: &str,
        url: &str,
        source: ImageSource,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO artist_image (normalized_name, image_url, image_source, updated_at) \
             VALUES (?1, ?2, ?3, ?4) ON CONFLICT(normalized_name) DO UPDATE SET \
             image_url = excluded.image_url, image_source = excluded.image_source, \
             updated_at = excluded.updated_at",
            params![normalized, url, source.as_str(), now_secs()],
        )?;
        if let Some(artist_id) = artist_id {
            tx.execute(
                "UPDATE artist SET image_url = ?1 WHERE id = ?2",
                params![url, artist_id],
            )?;
        }
        tx.commit()
            .with_context(|| format!("Failed to save image for artist {}", normalized))?;
        Ok(())
    }
}
