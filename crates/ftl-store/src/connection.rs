//! Open the ingestion database, apply runtime pragmas, and migrate schema.
//!
//! Runtime defaults (spec §5's "SQLite WAL mode recommended"):
//! - `journal_mode = WAL` to let readers (search) run alongside a writer
//!   (extract/map)
//! - `busy_timeout = 5s` to absorb transient lock contention
//! - `foreign_keys = ON` so cascade-on-delete ownership (spec §3) is
//!   enforced by the database, not application code

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::migrations;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the ingestion database at `path`, apply pragmas, and
/// migrate schema to the latest version.
///
/// # Errors
/// Returns an error if the database cannot be opened, configured, or
/// migrated.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create database directory {}", parent.display()))?;
        }
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;

    configure(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply schema migrations")?;

    Ok(conn)
}

/// Open an in-memory database, migrated to the latest schema (used by
/// tests and by `ftl search` over an ephemeral index).
///
/// # Errors
/// Returns an error if configuration or migration fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory database")?;
    configure(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply schema migrations")?;
    Ok(conn)
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ftl.sqlite3");
        (dir, path)
    }

    #[test]
    fn open_sets_wal_busy_timeout_and_foreign_keys() {
        let (_dir, path) = temp_db_path();
        let conn = open(&path).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_runs_migrations() {
        let (_dir, path) = temp_db_path();
        let conn = open(&path).unwrap();
        assert_eq!(
            migrations::current_schema_version(&conn).unwrap(),
            migrations::LATEST_SCHEMA_VERSION
        );
    }
}
