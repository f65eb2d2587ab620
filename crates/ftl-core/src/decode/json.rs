//! JSON decoder (spec §4.2): a five-stage fallback chain, first success
//! wins. Each stage is a lightweight textual repair rather than a full
//! alternate parser, since the inputs this guards against are minor vendor
//! export quirks (single quotes, trailing commas, unquoted keys, comments),
//! not arbitrary non-JSON.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::path::navigate_root;
use crate::value::Value;

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());
static UNQUOTED_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*:)"#).unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// One fallback stage's name, recorded on total failure for the error
/// message's `attempts` list.
const STAGE_NAMES: [&str; 5] = ["strict", "single_quote", "lenient", "es5", "human"];

/// Parse `text` as JSON using the fallback chain, returning the parsed
/// top-level value and which stage succeeded (by index into
/// [`STAGE_NAMES`]), or `None` with the text unusable by any stage.
fn parse_with_fallbacks(text: &str) -> Option<serde_json::Value> {
    if let Ok(v) = serde_json::from_str(text) {
        return Some(v);
    }
    let single_quoted = text.replace('\'', "\"");
    if let Ok(v) = serde_json::from_str(&single_quoted) {
        return Some(v);
    }
    let lenient = TRAILING_COMMA.replace_all(text, "$1").into_owned();
    if let Ok(v) = serde_json::from_str(&lenient) {
        return Some(v);
    }
    let es5 = UNQUOTED_KEY
        .replace_all(&lenient, r#"$1"$2"$3"#)
        .into_owned();
    if let Ok(v) = serde_json::from_str(&es5) {
        return Some(v);
    }
    let stripped = BLOCK_COMMENT.replace_all(text, "").into_owned();
    let stripped = LINE_COMMENT.replace_all(&stripped, "").into_owned();
    let human_lenient = TRAILING_COMMA.replace_all(&stripped, "$1").into_owned();
    let human = UNQUOTED_KEY
        .replace_all(&human_lenient, r#"$1"$2"$3"#)
        .into_owned();
    let human = human.replace('\'', "\"");
    serde_json::from_str(&human).ok()
}

/// Decode `text` as JSON, navigate `json_root` (defaulting to the document
/// root), and emit: the root's elements if it is an array, a single-element
/// list if it is a mapping, else an empty list (spec §4.2).
///
/// Returns `Err` listing every attempted fallback stage's name when all of
/// them fail to parse.
pub fn decode(text: &str, json_root: Option<&str>) -> Result<Vec<Value>, String> {
    let Some(parsed) = parse_with_fallbacks(text) else {
        return Err(STAGE_NAMES.join(", "));
    };

    let value = Value::from_json(parsed);
    let rooted = match json_root {
        Some(root) if !root.trim().is_empty() => navigate_root(&value, root),
        _ => value,
    };

    Ok(match rooted {
        Value::List(items) => items,
        Value::Mapping(_) => vec![rooted],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_decodes() {
        let records = decode(r#"{"a": 1}"#, None).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn single_quoted_json_decodes_via_fallback() {
        let records = decode("{'a': 1}", None).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn trailing_comma_decodes_via_lenient_fallback() {
        let records = decode(r#"{"a": 1, "b": [1, 2,],}"#, None).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn garbage_fails_all_stages() {
        let result = decode("not json at all {{{", None);
        assert!(result.is_err());
    }

    #[test]
    fn empty_array_decodes_to_no_records() {
        let records = decode("[]", None).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn json_root_navigates_into_array() {
        let records = decode(r#"{"events": [{"x": 1}, {"x": 2}]}"#, Some("events[]")).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn scalar_root_yields_empty_list() {
        let records = decode("42", None).unwrap();
        assert!(records.is_empty());
    }
}
