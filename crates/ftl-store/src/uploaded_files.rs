//! `uploaded_files` table CRUD (spec §3's UploadedFile entity).

use chrono::Utc;
use ftl_core::model::{ParseStatus, UploadedFile};
use rusqlite::{Connection, params};

/// Insert one uploaded-file row.
///
/// # Errors
/// Returns an error on a SQLite failure.
#[allow(clippy::too_many_arguments)]
pub fn create(
    conn: &Connection,
    upload_id: i64,
    manifest_file_id: Option<&str>,
    opfs_filename: &str,
    manifest_filename: &str,
    file_hash: &str,
    file_size_bytes: i64,
    parse_status: ParseStatus,
) -> rusqlite::Result<UploadedFile> {
    let now = Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO uploaded_files
            (upload_id, manifest_file_id, opfs_filename, manifest_filename,
             file_hash, upload_timestamp, file_size_bytes, parse_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            upload_id,
            manifest_file_id,
            opfs_filename,
            manifest_filename,
            file_hash,
            now,
            file_size_bytes,
            parse_status.as_str(),
        ],
    )?;

    Ok(UploadedFile {
        id: conn.last_insert_rowid(),
        upload_id,
        manifest_file_id: manifest_file_id.map(ToString::to_string),
        opfs_filename: opfs_filename.to_string(),
        manifest_filename: manifest_filename.to_string(),
        file_hash: file_hash.to_string(),
        upload_timestamp: now,
        file_size_bytes,
        parse_status,
    })
}

/// List every uploaded-file row for an upload, in insertion order (spec §5:
/// "RawRecords inherit order from file-listing order").
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn list_for_upload(conn: &Connection, upload_id: i64) -> rusqlite::Result<Vec<UploadedFile>> {
    let mut stmt = conn.prepare(
        "SELECT id, upload_id, manifest_file_id, opfs_filename, manifest_filename,
                file_hash, upload_timestamp, file_size_bytes, parse_status
         FROM uploaded_files WHERE upload_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![upload_id], row_to_uploaded_file)?;
    rows.collect()
}

fn row_to_uploaded_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadedFile> {
    let parse_status: String = row.get(8)?;
    Ok(UploadedFile {
        id: row.get(0)?,
        upload_id: row.get(1)?,
        manifest_file_id: row.get(2)?,
        opfs_filename: row.get(3)?,
        manifest_filename: row.get(4)?,
        file_hash: row.get(5)?,
        upload_timestamp: row.get(6)?,
        file_size_bytes: row.get(7)?,
        parse_status: if parse_status == "success" {
            ParseStatus::Success
        } else {
            ParseStatus::Failure
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection, uploads};

    #[test]
    fn unmatched_file_is_recorded_with_null_manifest_id_and_failure_status() {
        let conn = connection::open_in_memory().unwrap();
        let upload = uploads::create(&conn, "platform").unwrap();

        let file = create(
            &conn,
            upload.id,
            None,
            "foo___unknown.bin",
            "foo/unknown.bin",
            "deadbeef",
            12,
            ParseStatus::Failure,
        )
        .unwrap();

        assert!(file.manifest_file_id.is_none());
        assert_eq!(file.parse_status, ParseStatus::Failure);
    }

    #[test]
    fn list_for_upload_preserves_insertion_order() {
        let conn = connection::open_in_memory().unwrap();
        let upload = uploads::create(&conn, "platform").unwrap();
        create(&conn, upload.id, Some("a"), "a.json", "a.json", "h1", 1, ParseStatus::Success).unwrap();
        create(&conn, upload.id, Some("b"), "b.json", "b.json", "h2", 1, ParseStatus::Success).unwrap();

        let files = list_for_upload(&conn, upload.id).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].opfs_filename, "a.json");
        assert_eq!(files[1].opfs_filename, "b.json");
    }
}
