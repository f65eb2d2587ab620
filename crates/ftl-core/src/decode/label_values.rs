//! Label-values JSON decoder (spec §4.2): after a normal JSON decode, flatten
//! any `label_values` array found on a record into a mapping keyed by each
//! entry's `label` (or `title`).

use indexmap::IndexMap;

use crate::value::Value;

use super::json;

/// Decode `text` as JSON (with `json_root` applied as usual), then flatten
/// each resulting record's `label_values` array, if present.
pub fn decode(text: &str, json_root: Option<&str>) -> Result<Vec<Value>, String> {
    let records = json::decode(text, json_root)?;
    Ok(records.into_iter().map(flatten_record).collect())
}

fn flatten_record(record: Value) -> Value {
    let Value::Mapping(mut mapping) = record else {
        return record;
    };
    let Some(Value::List(entries)) = mapping.shift_remove("label_values") else {
        return Value::Mapping(mapping);
    };

    match flatten_label_values(&entries) {
        Value::Mapping(flattened) => {
            for (key, value) in flattened {
                mapping.insert(key, value);
            }
            Value::Mapping(mapping)
        }
        Value::List(values) if mapping.is_empty() => Value::List(values),
        other => {
            mapping.insert("label_values".to_string(), other);
            Value::Mapping(mapping)
        }
    }
}

/// Flatten a `label_values` array into a mapping keyed by `label`/`title`,
/// resolving each entry's value from `dict`/`vec`/`timestamp_value`/`value`
/// in that priority. Unlabeled entries get a synthetic `UNNAMED_LABEL_n`
/// key; if every entry ends up synthetic, degrade to a plain list.
fn flatten_label_values(entries: &[Value]) -> Value {
    let mut mapping = IndexMap::new();
    let mut any_labeled = false;
    let mut unnamed_index = 0usize;

    for entry in entries {
        let Some(entry_map) = entry.as_mapping() else {
            continue;
        };

        let key = entry_map
            .get("label")
            .or_else(|| entry_map.get("title"))
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let value = entry_map
            .get("dict")
            .or_else(|| entry_map.get("vec"))
            .or_else(|| entry_map.get("timestamp_value"))
            .or_else(|| entry_map.get("value"))
            .cloned()
            .unwrap_or(Value::Null);

        let key = match key {
            Some(k) => {
                any_labeled = true;
                k
            }
            None => {
                let synthetic = format!("UNNAMED_LABEL_{unnamed_index}");
                unnamed_index += 1;
                synthetic
            }
        };

        mapping.insert(key, coerce_scalar(value));
    }

    if any_labeled {
        Value::Mapping(mapping)
    } else {
        Value::List(mapping.into_values().collect())
    }
}

/// Coerce a string scalar into a number when it parses cleanly, matching
/// "scalars are coerced into int/float where possible, else string".
fn coerce_scalar(value: Value) -> Value {
    match value {
        Value::String(s) => {
            if let Ok(n) = s.parse::<i64>() {
                #[allow(clippy::cast_precision_loss)]
                return Value::Number(n as f64);
            }
            if let Ok(n) = s.parse::<f64>() {
                return Value::Number(n);
            }
            Value::String(s)
        }
        other => other,
    }
}
