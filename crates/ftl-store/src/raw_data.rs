//! `raw_data` table CRUD (spec §3's RawRecord entity).

use ftl_core::model::RawRecord;
use ftl_core::value::Value;
use rusqlite::{Connection, params};

/// Insert one raw record. `data` is encoded as JSON text (spec §3: "payload
/// round-trips to a mapping with string keys").
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn create(conn: &Connection, upload_id: i64, file_id: i64, data: &Value) -> rusqlite::Result<RawRecord> {
    let encoded = serde_json::to_string(&data.to_json())
        .unwrap_or_else(|_| "null".to_string());

    conn.execute(
        "INSERT INTO raw_data (upload_id, file_id, data) VALUES (?1, ?2, ?3)",
        params![upload_id, file_id, encoded],
    )?;

    Ok(RawRecord {
        id: conn.last_insert_rowid(),
        upload_id,
        file_id,
        data: data.clone(),
    })
}

/// Fetch every raw record for an upload, ordered by id and joined to its
/// source file's `manifest_file_id` (spec §4.8 step 1).
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn list_with_manifest_file_id(
    conn: &Connection,
    upload_id: i64,
) -> rusqlite::Result<Vec<(RawRecord, Option<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT raw_data.id, raw_data.upload_id, raw_data.file_id, raw_data.data,
                uploaded_files.manifest_file_id
         FROM raw_data
         JOIN uploaded_files ON uploaded_files.id = raw_data.file_id
         WHERE raw_data.upload_id = ?1
         ORDER BY raw_data.id",
    )?;

    let rows = stmt.query_map(params![upload_id], |row| {
        let data_text: String = row.get(3)?;
        let parsed: serde_json::Value =
            serde_json::from_str(&data_text).unwrap_or(serde_json::Value::Null);
        Ok((
            RawRecord {
                id: row.get(0)?,
                upload_id: row.get(1)?,
                file_id: row.get(2)?,
                data: Value::from_json(parsed),
            },
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    rows.collect()
}
