//! `event_comments` table CRUD (spec §3's Comment entity).

use chrono::Utc;
use ftl_core::model::Comment;
use rusqlite::{Connection, params};

/// Add a comment to an event.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn add(conn: &Connection, event_id: i64, comment: &str) -> rusqlite::Result<Comment> {
    let now = Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO event_comments (event_id, comment, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![event_id, comment, now],
    )?;

    Ok(Comment {
        id: conn.last_insert_rowid(),
        event_id,
        comment: comment.to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Update an existing comment's body.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn update(conn: &Connection, comment_id: i64, comment: &str) -> rusqlite::Result<()> {
    let now = Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE event_comments SET comment = ?1, updated_at = ?2 WHERE id = ?3",
        params![comment, now, comment_id],
    )?;
    Ok(())
}

/// Delete a comment.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn delete(conn: &Connection, comment_id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM event_comments WHERE id = ?1", params![comment_id])?;
    Ok(())
}

/// List every comment bound to an event, oldest first.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn comments_for_event(conn: &Connection, event_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, event_id, comment, created_at, updated_at
         FROM event_comments WHERE event_id = ?1 ORDER BY created_at",
    )?;
    let rows = stmt.query_map(params![event_id], |row| {
        Ok(Comment {
            id: row.get(0)?,
            event_id: row.get(1)?,
            comment: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection, events, uploads};

    fn seeded_event_id(conn: &Connection) -> i64 {
        let upload = uploads::create(conn, "p").unwrap();
        let event = ftl_core::model::Event {
            id: 0,
            upload_id: upload.id,
            file_ids: vec![],
            raw_data_ids: vec![],
            timestamp: 1000,
            event_action: "LOGIN".into(),
            event_kind: "event".into(),
            message: "LOGIN".into(),
            attributes: indexmap::IndexMap::new(),
            deduplicated: false,
            extra_timestamps: vec![],
            event_category: None,
        };
        events::insert_all(conn, &[event]).unwrap();
        events::list_for_upload(conn, upload.id).unwrap()[0].id
    }

    #[test]
    fn add_update_and_list_round_trips() {
        let conn = connection::open_in_memory().unwrap();
        let event_id = seeded_event_id(&conn);

        let comment = add(&conn, event_id, "investigating").unwrap();
        update(&conn, comment.id, "resolved").unwrap();

        let comments = comments_for_event(&conn, event_id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment, "resolved");
    }

    #[test]
    fn delete_removes_comment() {
        let conn = connection::open_in_memory().unwrap();
        let event_id = seeded_event_id(&conn);
        let comment = add(&conn, event_id, "note").unwrap();

        delete(&conn, comment.id).unwrap();
        assert!(comments_for_event(&conn, event_id).unwrap().is_empty());
    }
}
