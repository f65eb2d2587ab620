//! `events` table CRUD (spec §3's Event entity), including the supplemental
//! delete/count operations the mapper's host surface also needs.

use ftl_core::model::Event;
use ftl_core::value::Value;
use rusqlite::{Connection, params};

fn encode_ids(ids: &[i64]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

fn decode_ids(text: &str) -> Vec<i64> {
    serde_json::from_str(text).unwrap_or_default()
}

fn encode_category(category: &Option<Vec<String>>) -> Option<String> {
    category
        .as_ref()
        .map(|c| serde_json::to_string(c).unwrap_or_else(|_| "[]".to_string()))
}

fn decode_category(text: Option<String>) -> Option<Vec<String>> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

/// Bulk-insert a deduplicated event list for an upload in one statement
/// (spec §4.8 step 8: "insert in two bulk statements... then commit" — this
/// is the events half).
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn insert_all(conn: &Connection, events: &[Event]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO events
            (upload_id, file_ids, raw_data_ids, timestamp, event_action, event_kind,
             message, attributes, deduplicated, extra_timestamps, event_category)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;

    for event in events {
        let attributes = serde_json::to_string(&Value::Mapping(event.attributes.clone()).to_json())
            .unwrap_or_else(|_| "{}".to_string());

        stmt.execute(params![
            event.upload_id,
            encode_ids(&event.file_ids),
            encode_ids(&event.raw_data_ids),
            event.timestamp,
            event.event_action,
            event.event_kind,
            event.message,
            attributes,
            event.deduplicated,
            encode_ids(&event.extra_timestamps),
            encode_category(&event.event_category),
        ])?;
    }

    Ok(())
}

/// List every event for an upload, ordered by timestamp.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn list_for_upload(conn: &Connection, upload_id: i64) -> rusqlite::Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT id, upload_id, file_ids, raw_data_ids, timestamp, event_action, event_kind,
                message, attributes, deduplicated, extra_timestamps, event_category
         FROM events WHERE upload_id = ?1 ORDER BY timestamp",
    )?;
    let rows = stmt.query_map(params![upload_id], row_to_event)?;
    rows.collect()
}

/// Delete a list of events by id (spec §3: "Events and Entities can be
/// deleted individually").
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn delete_events(conn: &Connection, event_ids: &[i64]) -> rusqlite::Result<()> {
    for id in event_ids {
        conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
    }
    Ok(())
}

/// Total event count for an upload.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn count_for_upload(conn: &Connection, upload_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM events WHERE upload_id = ?1",
        params![upload_id],
        |row| row.get(0),
    )
}

/// Event count grouped by upload id, used by `search_events`'s
/// `meta.count_per_upload` (spec §4.10).
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn count_per_upload(conn: &Connection) -> rusqlite::Result<Vec<(i64, i64)>> {
    let mut stmt =
        conn.prepare("SELECT upload_id, COUNT(*) FROM events GROUP BY upload_id")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let attributes_text: String = row.get(8)?;
    let attributes = serde_json::from_str::<serde_json::Value>(&attributes_text)
        .map(Value::from_json)
        .unwrap_or_else(|_| Value::mapping());

    let file_ids_text: String = row.get(2)?;
    let raw_data_ids_text: String = row.get(3)?;
    let extra_timestamps_text: String = row.get(10)?;

    Ok(Event {
        id: row.get(0)?,
        upload_id: row.get(1)?,
        file_ids: decode_ids(&file_ids_text),
        raw_data_ids: decode_ids(&raw_data_ids_text),
        timestamp: row.get(4)?,
        event_action: row.get(5)?,
        event_kind: row.get(6)?,
        message: row.get(7)?,
        attributes: attributes.as_mapping().cloned().unwrap_or_default(),
        deduplicated: row.get(9)?,
        extra_timestamps: decode_ids(&extra_timestamps_text),
        event_category: decode_category(row.get(11)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection, uploads};
    use indexmap::IndexMap;

    fn event(upload_id: i64, action: &str, timestamp: i64) -> Event {
        Event {
            id: 0,
            upload_id,
            file_ids: vec![1],
            raw_data_ids: vec![1],
            timestamp,
            event_action: action.into(),
            event_kind: "event".into(),
            message: action.into(),
            attributes: IndexMap::new(),
            deduplicated: false,
            extra_timestamps: Vec::new(),
            event_category: None,
        }
    }

    #[test]
    fn insert_and_list_round_trips() {
        let conn = connection::open_in_memory().unwrap();
        let upload = uploads::create(&conn, "p").unwrap();
        insert_all(&conn, &[event(upload.id, "LOGIN", 1000)]).unwrap();

        let events = list_for_upload(&conn, upload.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_action, "LOGIN");
        assert_eq!(events[0].timestamp, 1000);
    }

    #[test]
    fn delete_events_removes_only_named_rows() {
        let conn = connection::open_in_memory().unwrap();
        let upload = uploads::create(&conn, "p").unwrap();
        insert_all(
            &conn,
            &[event(upload.id, "A", 1000), event(upload.id, "B", 2000)],
        )
        .unwrap();

        let events = list_for_upload(&conn, upload.id).unwrap();
        let keep_id = events[1].id;
        delete_events(&conn, &[events[0].id]).unwrap();

        let remaining = list_for_upload(&conn, upload.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep_id);
    }

    #[test]
    fn count_for_upload_matches_inserted_rows() {
        let conn = connection::open_in_memory().unwrap();
        let upload = uploads::create(&conn, "p").unwrap();
        insert_all(
            &conn,
            &[event(upload.id, "A", 1000), event(upload.id, "B", 2000)],
        )
        .unwrap();
        assert_eq!(count_for_upload(&conn, upload.id).unwrap(), 2);
    }
}
