//! Field projector (spec §4.5): projects a raw record through a view's
//! static/dynamic field rules into a cleaned target-name mapping.

use indexmap::IndexMap;

use crate::manifest::{DynamicField, SourcePaths, ViewProjection};
use crate::path::get_at_path;
use crate::timeparse::parse_lenient_epoch_ms;
use crate::value::Value;

const DATETIME_TYPES: &[&str] = &["datetime", "date", "timestamp"];

/// Project `record` through `view`, producing a mapping from cleaned target
/// names to values. Dynamic fields override static fields on key collision.
#[must_use]
pub fn project(record: &Value, view: &ViewProjection) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();

    for (name, value) in &view.r#static {
        out.insert(clean_target_name(name), value.clone());
    }

    for field in &view.fields {
        let (target, value) = project_dynamic_field(record, field);
        out.insert(target, value);
    }

    out
}

fn project_dynamic_field(record: &Value, field: &DynamicField) -> (String, Value) {
    let paths = field.source.as_slice();
    let resolved = resolve_source(record, &paths, field.transform.as_deref());

    let value = match field.r#type.as_deref() {
        Some(t) if DATETIME_TYPES.contains(&t) => coerce_datetime(&resolved),
        _ => resolved,
    };

    (clean_target_name(&field.target), value)
}

/// Resolve a dynamic field's value from its candidate source paths.
///
/// With `transform: coalesce` and multiple paths, the first path whose
/// resolved value is non-trivial wins; otherwise the first path's value is
/// used regardless of triviality (spec §4.5).
fn resolve_source(record: &Value, paths: &[&str], transform: Option<&str>) -> Value {
    if paths.is_empty() {
        return Value::Null;
    }

    if transform == Some("coalesce") && paths.len() > 1 {
        for path in paths {
            let resolved = get_at_path(record, path, &Value::Null);
            if !resolved.is_trivial() {
                return resolved;
            }
        }
    }

    get_at_path(record, paths[0], &Value::Null)
}

/// Parse a value through the lenient datetime parser and convert to epoch
/// milliseconds; any failure yields `0` (spec §4.5). Mirrors the original's
/// `unix_ms(parse_date(str(val)))`, which stringifies every value — including
/// numbers — before parsing, so a numeric Unix-seconds value (e.g. `1705314600`)
/// is range-normalized to milliseconds the same way a string one is.
fn coerce_datetime(value: &Value) -> Value {
    let raw = value.coerce_to_string();
    let ms = if raw.trim().is_empty() {
        0
    } else {
        parse_lenient_epoch_ms(&raw).unwrap_or(0)
    };
    #[allow(clippy::cast_precision_loss)]
    Value::Number(ms as f64)
}

/// Clean a static/dynamic field's target name (spec §4.5): trim, strip `@`,
/// replace `.` with `_`, lowercase.
#[must_use]
pub fn clean_target_name(name: &str) -> String {
    name.trim()
        .replace('@', "")
        .replace('.', "_")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ViewFileRef;
    use serde_json::json;

    fn record(j: serde_json::Value) -> Value {
        Value::from_json(j)
    }

    fn view(static_fields: &[(&str, &str)], fields: Vec<DynamicField>) -> ViewProjection {
        let mut static_map = std::collections::HashMap::new();
        for (k, v) in static_fields {
            static_map.insert((*k).to_string(), Value::String((*v).to_string()));
        }
        ViewProjection {
            file: ViewFileRef { id: "f".into() },
            r#where: None,
            r#static: static_map,
            fields,
        }
    }

    #[test]
    fn static_field_name_is_cleaned_and_emitted() {
        let v = view(&[("@Event.Type", "login")], vec![]);
        let out = project(&record(json!({})), &v);
        assert_eq!(out.get("event_type"), Some(&Value::String("login".into())));
    }

    #[test]
    fn dynamic_field_overrides_static_on_collision() {
        let mut static_map = std::collections::HashMap::new();
        static_map.insert("kind".to_string(), Value::String("static-value".into()));
        let v = ViewProjection {
            file: ViewFileRef { id: "f".into() },
            r#where: None,
            r#static: static_map,
            fields: vec![DynamicField {
                target: "kind".into(),
                source: SourcePaths::Single("type".into()),
                r#type: None,
                transform: None,
            }],
        };
        let out = project(&record(json!({"type": "dynamic-value"})), &v);
        assert_eq!(out.get("kind"), Some(&Value::String("dynamic-value".into())));
    }

    #[test]
    fn coalesce_picks_first_non_trivial_source() {
        let field = DynamicField {
            target: "device".into(),
            source: SourcePaths::Many(vec!["device_name".into(), "fallback_name".into()]),
            r#type: None,
            transform: Some("coalesce".into()),
        };
        let v = view(&[], vec![field]);
        let out = project(
            &record(json!({"device_name": "  ", "fallback_name": "iPhone"})),
            &v,
        );
        assert_eq!(out.get("device"), Some(&Value::String("iPhone".into())));
    }

    #[test]
    fn datetime_field_coerces_to_epoch_ms() {
        let field = DynamicField {
            target: "ts".into(),
            source: SourcePaths::Single("when".into()),
            r#type: Some("datetime".into()),
            transform: None,
        };
        let v = view(&[], vec![field]);
        let out = project(&record(json!({"when": "2024-01-15T10:30:00Z"})), &v);
        assert_eq!(out.get("ts"), Some(&Value::Number(1_705_314_600_000.0)));
    }

    #[test]
    fn numeric_unix_seconds_timestamp_is_normalized_to_ms() {
        let field = DynamicField {
            target: "ts".into(),
            source: SourcePaths::Single("when".into()),
            r#type: Some("timestamp".into()),
            transform: None,
        };
        let v = view(&[], vec![field]);
        let out = project(&record(json!({"when": 1_705_314_600i64})), &v);
        assert_eq!(out.get("ts"), Some(&Value::Number(1_705_314_600_000.0)));
    }

    #[test]
    fn numeric_unix_milliseconds_timestamp_passes_through() {
        let field = DynamicField {
            target: "ts".into(),
            source: SourcePaths::Single("when".into()),
            r#type: Some("timestamp".into()),
            transform: None,
        };
        let v = view(&[], vec![field]);
        let out = project(&record(json!({"when": 1_705_314_600_000i64})), &v);
        assert_eq!(out.get("ts"), Some(&Value::Number(1_705_314_600_000.0)));
    }

    #[test]
    fn unparsable_datetime_yields_zero() {
        let field = DynamicField {
            target: "ts".into(),
            source: SourcePaths::Single("when".into()),
            r#type: Some("timestamp".into()),
            transform: None,
        };
        let v = view(&[], vec![field]);
        let out = project(&record(json!({"when": "not a date"})), &v);
        assert_eq!(out.get("ts"), Some(&Value::Number(0.0)));
    }

    #[test]
    fn clean_target_name_applies_full_pipeline() {
        assert_eq!(clean_target_name("  @Some.Field.Name  "), "some_field_name");
    }

    #[test]
    fn projection_is_idempotent() {
        let field = DynamicField {
            target: "device".into(),
            source: SourcePaths::Single("device_name".into()),
            r#type: None,
            transform: None,
        };
        let v = view(&[("kind", "login")], vec![field]);
        let r = record(json!({"device_name": "iPhone"}));
        assert_eq!(project(&r, &v), project(&r, &v));
    }
}
