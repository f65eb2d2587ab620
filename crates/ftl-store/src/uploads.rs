//! `uploads` table CRUD (spec §3's Upload entity, plus list/rename support
//! pulled from the original implementation's upload-management surface).

use chrono::Utc;
use ftl_core::model::Upload;
use rusqlite::{Connection, OptionalExtension, params};

/// Create a new upload row. The human name is auto-suffixed to stay unique
/// within the platform (spec §4.7's auto-naming: `platform`, `platform N`),
/// without enforcing global uniqueness (spec §9 Open Question).
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn create(conn: &Connection, platform: &str) -> rusqlite::Result<Upload> {
    let given_name = next_auto_name(conn, platform)?;
    let now = Utc::now().timestamp_millis();

    conn.execute(
        "INSERT INTO uploads (platform, given_name, upload_timestamp, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![platform, given_name, now],
    )?;
    let id = conn.last_insert_rowid();

    Ok(Upload {
        id,
        platform: platform.to_string(),
        given_name,
        upload_timestamp: now,
        updated_at: now,
    })
}

fn next_auto_name(conn: &Connection, platform: &str) -> rusqlite::Result<String> {
    let existing_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM uploads WHERE platform = ?1",
        params![platform],
        |row| row.get(0),
    )?;

    Ok(if existing_count == 0 {
        platform.to_string()
    } else {
        format!("{platform} {}", existing_count + 1)
    })
}

/// Fetch one upload by id.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn get(conn: &Connection, upload_id: i64) -> rusqlite::Result<Option<Upload>> {
    conn.query_row(
        "SELECT id, platform, given_name, upload_timestamp, updated_at
         FROM uploads WHERE id = ?1",
        params![upload_id],
        row_to_upload,
    )
    .optional()
}

/// List every upload, most recent first.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Upload>> {
    let mut stmt = conn.prepare(
        "SELECT id, platform, given_name, upload_timestamp, updated_at
         FROM uploads ORDER BY upload_timestamp DESC",
    )?;
    let rows = stmt.query_map([], row_to_upload)?;
    rows.collect()
}

/// Rename an upload's human-readable name.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn rename(conn: &Connection, upload_id: i64, given_name: &str) -> rusqlite::Result<()> {
    let now = Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE uploads SET given_name = ?1, updated_at = ?2 WHERE id = ?3",
        params![given_name, now, upload_id],
    )?;
    Ok(())
}

/// Delete an upload; cascades to every owned `UploadedFile`, `RawRecord`,
/// `Event`, and `Entity` row via `ON DELETE CASCADE` (spec §3's "Upload
/// isolation" invariant).
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn delete(conn: &Connection, upload_id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM uploads WHERE id = ?1", params![upload_id])?;
    Ok(())
}

fn row_to_upload(row: &rusqlite::Row<'_>) -> rusqlite::Result<Upload> {
    Ok(Upload {
        id: row.get(0)?,
        platform: row.get(1)?,
        given_name: row.get(2)?,
        upload_timestamp: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection;

    #[test]
    fn auto_names_successive_uploads_for_the_same_platform() {
        let conn = connection::open_in_memory().unwrap();
        let first = create(&conn, "instagram").unwrap();
        let second = create(&conn, "instagram").unwrap();
        assert_eq!(first.given_name, "instagram");
        assert_eq!(second.given_name, "instagram 2");
    }

    #[test]
    fn get_returns_none_for_missing_id() {
        let conn = connection::open_in_memory().unwrap();
        assert!(get(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn deleting_upload_cascades_to_uploaded_files() {
        let conn = connection::open_in_memory().unwrap();
        let upload = create(&conn, "twitter").unwrap();
        conn.execute(
            "INSERT INTO uploaded_files
                (upload_id, manifest_file_id, opfs_filename, manifest_filename,
                 file_hash, upload_timestamp, file_size_bytes, parse_status)
             VALUES (?1, 'f1', 'a.json', 'a.json', 'hash', 0, 10, 'success')",
            params![upload.id],
        )
        .unwrap();

        delete(&conn, upload.id).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM uploaded_files", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn list_orders_most_recent_first() {
        let conn = connection::open_in_memory().unwrap();
        create(&conn, "a").unwrap();
        create(&conn, "b").unwrap();
        let uploads = list(&conn).unwrap();
        assert_eq!(uploads.len(), 2);
    }
}
