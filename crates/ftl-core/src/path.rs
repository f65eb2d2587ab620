//! Nested-path accessor (spec §4.3): read a value out of an arbitrarily
//! nested [`Value`] using a small path language.
//!
//! ```text
//! path    := segment ( '.' segment )*
//! segment := simple | quoted | indexed
//! simple  := [^.\[\]']+
//! quoted  := ''' [^']* '''       # quoted keys, e.g. 'Device ID'
//! indexed := simple '[' digit+ ']'  # e.g. tokens[0]
//! ```

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// A plain or quoted mapping key.
    Key(String),
    /// A mapping key followed by a list index, e.g. `tokens[0]`.
    Indexed(String, usize),
}

/// Parse a path string into segments. Never fails: an unparsable remainder
/// is folded into a `Key` segment as-is, since the accessor degrades to the
/// default on any traversal mismatch anyway.
fn parse_path(path: &str) -> Vec<Segment> {
    split_top_level_dots(path)
        .into_iter()
        .map(parse_segment)
        .collect()
}

/// Split on `.` but not inside a `'...'` quoted segment.
fn split_top_level_dots(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let bytes = path.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'.' if !in_quote => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[start..]);
    parts
}

fn parse_segment(segment: &str) -> Segment {
    let segment = segment.trim();

    if let Some(inner) = segment
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        return Segment::Key(inner.to_string());
    }

    if let Some(open) = segment.find('[') {
        if let Some(close) = segment[open..].find(']') {
            let key = &segment[..open];
            let index_str = &segment[open + 1..open + close];
            if let Ok(index) = index_str.parse::<usize>() {
                return Segment::Indexed(key.to_string(), index);
            }
        }
    }

    Segment::Key(segment.to_string())
}

/// Look up `path` within `value`, short-circuiting to `default.clone()` on
/// any missing key, out-of-bounds index, type mismatch, or null mid-path.
#[must_use]
pub fn get_at_path(value: &Value, path: &str, default: &Value) -> Value {
    let segments = parse_path(path);
    let mut current = value;

    for segment in &segments {
        if current.is_null() {
            return default.clone();
        }
        match segment {
            Segment::Key(key) => match current.as_mapping().and_then(|m| m.get(key)) {
                Some(v) => current = v,
                None => return default.clone(),
            },
            Segment::Indexed(key, index) => {
                let Some(mapping) = current.as_mapping() else {
                    return default.clone();
                };
                let Some(list_value) = mapping.get(key) else {
                    return default.clone();
                };
                let Some(list) = list_value.as_list() else {
                    return default.clone();
                };
                match list.get(*index) {
                    Some(v) => current = v,
                    None => return default.clone(),
                }
            }
        }
    }

    current.clone()
}

/// Navigate a "json_root" path (spec §4.2's JSON decoder) into a decoded
/// structure, without a default: missing paths resolve to `Value::Null`.
#[must_use]
pub fn navigate_root(value: &Value, json_root: &str) -> Value {
    if json_root.trim().is_empty() || json_root == "." {
        return value.clone();
    }
    // json_root paths may carry a trailing `[]` meaning "treat as array",
    // which is handled by the caller; strip it before path resolution.
    let cleaned = json_root.strip_suffix("[]").unwrap_or(json_root);
    if cleaned.is_empty() {
        return value.clone();
    }
    get_at_path(value, cleaned, &Value::Null)
}
