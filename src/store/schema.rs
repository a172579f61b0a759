//! SQLite schema for the stats database.
//!
//! Version 0 holds the relational (active) tier: identities, aliases, credits, the
//! event log and per-track enrichment. Version 1 adds the long-tail archive tier and
//! the name-keyed artist image table.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::Connection;

// =============================================================================
// Version 0 - Active tier
// =============================================================================

const ARTIST_TABLE_V0: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("canonical_name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "normalized_name",
            &SqlType::Text,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("country", &SqlType::Text),
        // JSON array
        sqlite_column!("genres", &SqlType::Text),
        sqlite_column!(
            "genre_source",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'NONE'")
        ),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ARTIST_ALIAS_TABLE_V0: Table = Table {
    name: "artist_alias",
    columns: &[
        sqlite_column!("original_key", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "target_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "artist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_artist_alias_target", "target_id")],
    unique_constraints: &[],
};

const TRACK_TABLE_V0: Table = Table {
    name: "track",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("raw_artist_string", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("duration_ms", &SqlType::Integer),
        sqlite_column!(
            "primary_artist_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "artist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::SetNull,
            })
        ),
        sqlite_column!("track_hash", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_track_primary_artist", "primary_artist_id")],
    unique_constraints: &[],
};

const TRACK_ALIAS_TABLE_V0: Table = Table {
    name: "track_alias",
    columns: &[
        sqlite_column!("original_key", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "target_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "track",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_track_alias_target", "target_id")],
    unique_constraints: &[],
};

const TRACK_ARTIST_CREDIT_TABLE_V0: Table = Table {
    name: "track_artist_credit",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "track",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "artist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!("credit_order", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_credit_track", "track_id"),
        ("idx_credit_artist", "artist_id"),
    ],
    unique_constraints: &[&["track_id", "artist_id", "role"]],
};

const LISTENING_EVENT_TABLE_V0: Table = Table {
    name: "listening_event",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "track",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("timestamp_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("play_duration_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("completion_percent", &SqlType::Real, non_null = true),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("was_skipped", &SqlType::Integer, non_null = true),
        sqlite_column!("is_replay", &SqlType::Integer, non_null = true),
        sqlite_column!("pause_count", &SqlType::Integer, non_null = true),
        sqlite_column!("session_ref", &SqlType::Text),
    ],
    indices: &[
        ("idx_event_timestamp", "timestamp_ms"),
        ("idx_event_track_timestamp", "track_id, timestamp_ms"),
    ],
    unique_constraints: &[],
};

const TRACK_ENRICHMENT_TABLE_V0: Table = Table {
    name: "track_enrichment",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "track",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        // JSON array
        sqlite_column!("genres", &SqlType::Text),
        sqlite_column!("genre_source", &SqlType::Text, non_null = true),
        sqlite_column!("valence", &SqlType::Real),
        sqlite_column!("energy", &SqlType::Real),
        sqlite_column!("danceability", &SqlType::Real),
        sqlite_column!("acousticness", &SqlType::Real),
        sqlite_column!("tempo", &SqlType::Real),
        sqlite_column!("feature_source", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("image_source", &SqlType::Text, non_null = true),
        // JSON array
        sqlite_column!("tags", &SqlType::Text),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

// =============================================================================
// Version 1 - Archive tier and name-keyed artist images
// =============================================================================

const IMPORT_BATCH_TABLE_V1: Table = Table {
    name: "import_batch",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("source_label", &SqlType::Text, non_null = true),
        sqlite_column!("imported_at", &SqlType::Integer, non_null = true),
        sqlite_column!("active_count", &SqlType::Integer, non_null = true),
        sqlite_column!("archived_count", &SqlType::Integer, non_null = true),
        sqlite_column!("play_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ARCHIVE_ENTRY_TABLE_V1: Table = Table {
    name: "archive_entry",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("track_hash", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("play_count", &SqlType::Integer, non_null = true),
        sqlite_column!("first_seen_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("last_seen_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("timestamps_blob", &SqlType::Blob),
        sqlite_column!(
            "import_batch_id",
            &SqlType::Text,
            foreign_key = Some(&ForeignKey {
                foreign_table: "import_batch",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::SetNull,
            })
        ),
    ],
    indices: &[("idx_archive_last_seen", "last_seen_ms")],
    unique_constraints: &[],
};

const ARTIST_IMAGE_TABLE_V1: Table = Table {
    name: "artist_image",
    columns: &[
        sqlite_column!("normalized_name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
        sqlite_column!("image_source", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    IMPORT_BATCH_TABLE_V1.create(conn)?;
    ARCHIVE_ENTRY_TABLE_V1.create(conn)?;
    ARTIST_IMAGE_TABLE_V1.create(conn)?;
    Ok(())
}

pub const STATS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ARTIST_TABLE_V0,
            ARTIST_ALIAS_TABLE_V0,
            TRACK_TABLE_V0,
            TRACK_ALIAS_TABLE_V0,
            TRACK_ARTIST_CREDIT_TABLE_V0,
            LISTENING_EVENT_TABLE_V0,
            TRACK_ENRICHMENT_TABLE_V0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ARTIST_TABLE_V0,
            ARTIST_ALIAS_TABLE_V0,
            TRACK_TABLE_V0,
            TRACK_ALIAS_TABLE_V0,
            TRACK_ARTIST_CREDIT_TABLE_V0,
            LISTENING_EVENT_TABLE_V0,
            TRACK_ENRICHMENT_TABLE_V0,
            IMPORT_BATCH_TABLE_V1,
            ARCHIVE_ENTRY_TABLE_V1,
            ARTIST_IMAGE_TABLE_V1,
        ],
        migration: Some(migrate_v0_to_v1),
    },
];
