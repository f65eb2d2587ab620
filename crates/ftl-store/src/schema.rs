//! Canonical SQLite schema for the ingestion pipeline (spec §6).
//!
//! Six tables, normalized for provenance: `uploads` owns every row produced
//! by an ingestion run; `uploaded_files`/`raw_data` are the extractor's
//! output; `events`/`auth_devices_initial` are the mapper's output;
//! `event_comments` is a free-text annotation layer bound to events.

/// Migration v1: the full storage schema.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS uploads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform TEXT NOT NULL,
    given_name TEXT NOT NULL,
    upload_timestamp INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS uploaded_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL REFERENCES uploads(id) ON DELETE CASCADE,
    manifest_file_id TEXT,
    opfs_filename TEXT NOT NULL,
    manifest_filename TEXT NOT NULL,
    file_hash TEXT NOT NULL,
    upload_timestamp INTEGER NOT NULL,
    file_size_bytes INTEGER NOT NULL,
    parse_status TEXT NOT NULL CHECK (parse_status IN ('success', 'failure')),
    UNIQUE (upload_id, opfs_filename)
);

CREATE TABLE IF NOT EXISTS raw_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL REFERENCES uploads(id) ON DELETE CASCADE,
    file_id INTEGER NOT NULL REFERENCES uploaded_files(id) ON DELETE CASCADE,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL REFERENCES uploads(id) ON DELETE CASCADE,
    file_ids TEXT NOT NULL,
    raw_data_ids TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    event_action TEXT NOT NULL,
    event_kind TEXT NOT NULL,
    message TEXT NOT NULL,
    attributes TEXT NOT NULL,
    deduplicated INTEGER NOT NULL DEFAULT 0 CHECK (deduplicated IN (0, 1)),
    extra_timestamps TEXT NOT NULL DEFAULT '[]',
    event_category TEXT
);

CREATE TABLE IF NOT EXISTS auth_devices_initial (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL REFERENCES uploads(id) ON DELETE CASCADE,
    file_id INTEGER NOT NULL REFERENCES uploaded_files(id) ON DELETE CASCADE,
    raw_data_id INTEGER NOT NULL REFERENCES raw_data(id) ON DELETE CASCADE,
    entity_type TEXT NOT NULL,
    event_kind TEXT NOT NULL,
    attributes TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS event_comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    comment TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_uploaded_files_upload ON uploaded_files(upload_id);
CREATE INDEX IF NOT EXISTS idx_raw_data_upload_file ON raw_data(upload_id, file_id);
CREATE INDEX IF NOT EXISTS idx_events_upload_timestamp ON events(upload_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_events_kind_action ON events(event_kind, event_action);
CREATE INDEX IF NOT EXISTS idx_auth_devices_upload ON auth_devices_initial(upload_id);
CREATE INDEX IF NOT EXISTS idx_event_comments_event ON event_comments(event_id, created_at);
";

/// Every index created by [`MIGRATION_V1_SQL`], used by tests to assert the
/// migration actually ran.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_uploaded_files_upload",
    "idx_raw_data_upload_file",
    "idx_events_upload_timestamp",
    "idx_events_kind_action",
    "idx_auth_devices_upload",
    "idx_event_comments_event",
];
