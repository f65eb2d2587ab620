//! `auth_devices_initial` table CRUD (spec §3's Entity — "authenticated
//! device" — the only entity kind currently dispatched by the mapper).

use ftl_core::model::Entity;
use ftl_core::value::Value;
use rusqlite::{Connection, params};

/// Bulk-insert an entity list for an upload in one statement (the
/// `auth_devices_initial` half of spec §4.8 step 8's two bulk statements).
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn insert_all(conn: &Connection, entities: &[Entity]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO auth_devices_initial
            (upload_id, file_id, raw_data_id, entity_type, event_kind, attributes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for entity in entities {
        let attributes =
            serde_json::to_string(&Value::Mapping(entity.attributes.clone()).to_json())
                .unwrap_or_else(|_| "{}".to_string());

        stmt.execute(params![
            entity.upload_id,
            entity.file_id,
            entity.raw_data_id,
            entity.entity_type,
            entity.event_kind,
            attributes,
        ])?;
    }

    Ok(())
}

/// List every entity for an upload.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn list_for_upload(conn: &Connection, upload_id: i64) -> rusqlite::Result<Vec<Entity>> {
    let mut stmt = conn.prepare(
        "SELECT id, upload_id, file_id, raw_data_id, entity_type, event_kind, attributes
         FROM auth_devices_initial WHERE upload_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![upload_id], |row| {
        let attributes_text: String = row.get(6)?;
        let attributes = serde_json::from_str::<serde_json::Value>(&attributes_text)
            .map(Value::from_json)
            .unwrap_or_else(|_| Value::mapping());

        Ok(Entity {
            id: row.get(0)?,
            upload_id: row.get(1)?,
            file_id: row.get(2)?,
            raw_data_id: row.get(3)?,
            entity_type: row.get(4)?,
            event_kind: row.get(5)?,
            attributes: attributes.as_mapping().cloned().unwrap_or_default(),
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection, raw_data, uploaded_files, uploads};
    use ftl_core::model::ParseStatus;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn insert_and_list_round_trips() {
        let conn = connection::open_in_memory().unwrap();
        let upload = uploads::create(&conn, "p").unwrap();
        let file = uploaded_files::create(
            &conn, upload.id, Some("devices"), "d.json", "d.json", "h", 1, ParseStatus::Success,
        )
        .unwrap();
        let raw = raw_data::create(&conn, upload.id, file.id, &Value::from_json(json!({}))).unwrap();

        let mut attributes = IndexMap::new();
        attributes.insert("device_name".to_string(), Value::String("iPhone".into()));
        let entity = Entity {
            id: 0,
            upload_id: upload.id,
            file_id: file.id,
            raw_data_id: raw.id,
            entity_type: "authenticated_device".into(),
            event_kind: "entity".into(),
            attributes,
        };

        insert_all(&conn, &[entity]).unwrap();
        let entities = list_for_upload(&conn, upload.id).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0].attributes.get("device_name"),
            Some(&Value::String("iPhone".into()))
        );
    }
}
