//! Semantic mapper stage (spec §4.8): groups raw records by source file,
//! applies each bound view's filter and projection, dispatches the result
//! by `event_kind`, runs dedup, and bulk-inserts the result.

use ftl_core::dedup::{dedup, ConflictPolicy, DedupOptions};
use ftl_core::error::MapError;
use ftl_core::filter::CompiledFilter;
use ftl_core::manifest::Manifest;
use ftl_core::model::{action_message, Entity, Event};
use ftl_core::project::project;
use ftl_core::value::Value;
use indexmap::IndexMap;
use rusqlite::Connection;
use tracing::warn;

/// Report returned after mapping completes.
#[derive(Debug, Clone)]
pub struct MapReport {
    pub events_emitted: usize,
    pub entities_emitted: usize,
}

/// Map every raw record belonging to `upload_id` into normalized events and
/// entities, then persist them in one all-or-nothing transaction.
///
/// # Errors
/// Returns [`MapError`] if the upload does not exist or a storage operation
/// fails.
pub fn map(conn: &mut Connection, manifest: &Manifest, upload_id: i64) -> Result<MapReport, MapError> {
    let tx = conn.transaction().map_err(|e| storage_error(upload_id, &e))?;

    if ftl_store::uploads::get(&tx, upload_id)
        .map_err(|e| storage_error(upload_id, &e))?
        .is_none()
    {
        return Err(MapError::UploadNotFound {
            upload_id: upload_id.to_string(),
        });
    }

    let raw_records = ftl_store::raw_data::list_with_manifest_file_id(&tx, upload_id)
        .map_err(|e| storage_error(upload_id, &e))?;

    let mut events = Vec::new();
    let mut entities = Vec::new();

    for group in group_consecutive_by_file_id(&raw_records) {
        let Some(file_id) = group.manifest_file_id.as_deref() else {
            continue;
        };
        let views = manifest.views_for_file_id(file_id);
        if views.is_empty() {
            continue;
        }
        let compiled_filters: Vec<CompiledFilter> = views
            .iter()
            .map(|view| CompiledFilter::compile(view.r#where.as_ref()))
            .collect();

        for (record_id, record) in group.records {
            for (view, filter) in views.iter().zip(&compiled_filters) {
                if !filter.eval(record) {
                    continue;
                }

                let mut projected = project(record, view);
                let event_kind = pop_string(&mut projected, "event_kind");
                let event_action = pop_string(&mut projected, "event_action");
                let timestamp = pop_number(&mut projected, "timestamp");
                let entity_type = pop_string(&mut projected, "entity_type");

                match event_kind.as_deref() {
                    Some("event") => {
                        let action = event_action.unwrap_or_default();
                        events.push(Event {
                            id: 0,
                            upload_id,
                            file_ids: vec![group.file_row_id],
                            raw_data_ids: vec![record_id],
                            timestamp,
                            event_action: action.clone(),
                            event_kind: "event".to_string(),
                            message: action_message(&action),
                            attributes: projected,
                            deduplicated: false,
                            extra_timestamps: Vec::new(),
                            event_category: None,
                        });
                    }
                    Some(kind @ ("asset" | "entity"))
                        if entity_type.as_deref() == Some("authenticated_device") =>
                    {
                        entities.push(Entity {
                            id: 0,
                            upload_id,
                            file_id: group.file_row_id,
                            raw_data_id: record_id,
                            entity_type: entity_type.clone().unwrap_or_default(),
                            event_kind: kind.to_string(),
                            attributes: projected,
                        });
                    }
                    other => {
                        warn!(?other, "discarding projected record with unrecognized event_kind");
                    }
                }
            }
        }
    }

    let options = DedupOptions {
        tolerance_ms: 100,
        conflict_policy: ConflictPolicy::KeepOriginal,
        exclude_actions: Vec::new(),
    };
    let events = dedup(events, &options);

    ftl_store::events::insert_all(&tx, &events).map_err(|e| storage_error(upload_id, &e))?;
    ftl_store::entities::insert_all(&tx, &entities).map_err(|e| storage_error(upload_id, &e))?;
    tx.commit().map_err(|e| storage_error(upload_id, &e))?;

    Ok(MapReport {
        events_emitted: events.len(),
        entities_emitted: entities.len(),
    })
}

fn storage_error(upload_id: i64, error: &impl std::fmt::Display) -> MapError {
    // The spec names only `UploadNotFound` as a stage-level mapper failure;
    // a storage-layer error has no dedicated variant, so it rides the same
    // one with the underlying cause folded into the id string.
    MapError::UploadNotFound {
        upload_id: format!("{upload_id} (storage error: {error})"),
    }
}

fn pop_string(mapping: &mut IndexMap<String, Value>, key: &str) -> Option<String> {
    mapping.shift_remove(key).map(|v| v.coerce_to_string())
}

#[allow(clippy::cast_possible_truncation)]
fn pop_number(mapping: &mut IndexMap<String, Value>, key: &str) -> i64 {
    mapping
        .shift_remove(key)
        .and_then(|v| v.as_f64())
        .map_or(0, |n| n as i64)
}

struct FileGroup<'a> {
    manifest_file_id: Option<String>,
    file_row_id: i64,
    records: Vec<(i64, &'a Value)>,
}

/// Group consecutive raw records sharing the same `manifest_file_id` (spec
/// §4.8 step 2, mirroring Python's `itertools.groupby` — the caller must
/// preserve insertion order, which the `ORDER BY id` read already does).
fn group_consecutive_by_file_id(
    rows: &[(ftl_core::model::RawRecord, Option<String>)],
) -> Vec<FileGroup<'_>> {
    let mut groups: Vec<FileGroup<'_>> = Vec::new();

    for (record, manifest_file_id) in rows {
        let same_group = groups
            .last()
            .is_some_and(|g| g.manifest_file_id == *manifest_file_id);

        if same_group {
            groups
                .last_mut()
                .unwrap()
                .records
                .push((record.id, &record.data));
        } else {
            groups.push(FileGroup {
                manifest_file_id: manifest_file_id.clone(),
                file_row_id: record.file_id,
                records: vec![(record.id, &record.data)],
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftl_core::manifest::Manifest;
    use ftl_core::model::ParseStatus;
    use serde_json::json;
    use tempfile::tempdir;

    fn manifest_with_auth_view() -> Manifest {
        let yaml = r#"
files:
  - id: auth_log
    path: activity.json
    parser:
      format: json
      json_root: "events[]"
views:
  - file:
      id: auth_log
    where:
      source: type
      op: eq
      value: LOGIN
    static:
      event_kind: event
    fields:
      - target: event_action
        source: type
      - target: timestamp
        source: ts
        type: timestamp
      - target: attributes.device
        source: device
"#;
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.yaml");
        std::fs::write(&path, yaml).unwrap();
        Manifest::load(&path).unwrap()
    }

    #[test]
    fn unknown_upload_id_is_fatal() {
        let manifest = manifest_with_auth_view();
        let mut conn = ftl_store::connection::open_in_memory().unwrap();
        let result = map(&mut conn, &manifest, 999);
        assert!(matches!(result, Err(MapError::UploadNotFound { .. })));
    }

    #[test]
    fn matching_record_becomes_an_event() {
        let manifest = manifest_with_auth_view();
        let mut conn = ftl_store::connection::open_in_memory().unwrap();

        let upload = ftl_store::uploads::create(&conn, "p").unwrap();
        let file = ftl_store::uploaded_files::create(
            &conn, upload.id, Some("auth_log"), "activity.json", "activity.json", "h", 1,
            ParseStatus::Success,
        )
        .unwrap();
        ftl_store::raw_data::create(
            &conn,
            upload.id,
            file.id,
            &Value::from_json(json!({"type": "LOGIN", "ts": 1_705_318_200_000i64, "device": "iPhone"})),
        )
        .unwrap();

        let report = map(&mut conn, &manifest, upload.id).unwrap();
        assert_eq!(report.events_emitted, 1);

        let events = ftl_store::events::list_for_upload(&conn, upload.id).unwrap();
        assert_eq!(events[0].event_action, "LOGIN");
        assert_eq!(events[0].timestamp, 1_705_318_200_000);
        assert_eq!(events[0].message, "login");
    }

    #[test]
    fn non_matching_record_is_discarded() {
        let manifest = manifest_with_auth_view();
        let mut conn = ftl_store::connection::open_in_memory().unwrap();

        let upload = ftl_store::uploads::create(&conn, "p").unwrap();
        let file = ftl_store::uploaded_files::create(
            &conn, upload.id, Some("auth_log"), "activity.json", "activity.json", "h", 1,
            ParseStatus::Success,
        )
        .unwrap();
        ftl_store::raw_data::create(
            &conn,
            upload.id,
            file.id,
            &Value::from_json(json!({"type": "LOGOUT"})),
        )
        .unwrap();

        let report = map(&mut conn, &manifest, upload.id).unwrap();
        assert_eq!(report.events_emitted, 0);
    }

    fn manifest_with_asset_view() -> Manifest {
        let yaml = r#"
files:
  - id: devices
    path: devices.json
    parser:
      format: json
      json_root: "devices[]"
views:
  - file:
      id: devices
    static:
      event_kind: asset
    fields:
      - target: entity_type
        source: kind
      - target: attributes.name
        source: name
"#;
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.yaml");
        std::fs::write(&path, yaml).unwrap();
        Manifest::load(&path).unwrap()
    }

    #[test]
    fn asset_with_authenticated_device_type_becomes_an_entity() {
        let manifest = manifest_with_asset_view();
        let mut conn = ftl_store::connection::open_in_memory().unwrap();

        let upload = ftl_store::uploads::create(&conn, "p").unwrap();
        let file = ftl_store::uploaded_files::create(
            &conn, upload.id, Some("devices"), "devices.json", "devices.json", "h", 1,
            ParseStatus::Success,
        )
        .unwrap();
        ftl_store::raw_data::create(
            &conn,
            upload.id,
            file.id,
            &Value::from_json(json!({"kind": "authenticated_device", "name": "iPhone"})),
        )
        .unwrap();

        let report = map(&mut conn, &manifest, upload.id).unwrap();
        assert_eq!(report.entities_emitted, 1);
    }

    #[test]
    fn asset_with_other_entity_type_is_discarded() {
        let manifest = manifest_with_asset_view();
        let mut conn = ftl_store::connection::open_in_memory().unwrap();

        let upload = ftl_store::uploads::create(&conn, "p").unwrap();
        let file = ftl_store::uploaded_files::create(
            &conn, upload.id, Some("devices"), "devices.json", "devices.json", "h", 1,
            ParseStatus::Success,
        )
        .unwrap();
        ftl_store::raw_data::create(
            &conn,
            upload.id,
            file.id,
            &Value::from_json(json!({"kind": "browser_session", "name": "Chrome"})),
        )
        .unwrap();

        let report = map(&mut conn, &manifest, upload.id).unwrap();
        assert_eq!(report.entities_emitted, 0);
    }
}
