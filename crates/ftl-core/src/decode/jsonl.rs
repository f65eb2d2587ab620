//! JSONL decoder (spec §4.2): newline-delimited JSON with the same fallback
//! chain as [`super::json`] applied per line, an optional `where` filter,
//! and fatal-free per-line failures (errors accumulate, the file continues).
//!
//! Per spec §9's Design Note ("Stream-heavy decoders"), a production host
//! would want this as a lazy iterator rather than a materialized `Vec`; this
//! crate's call sites always need the full record list at once (mapping
//! groups by file before projecting), so the iterator form is left for a
//! caller that streams line-by-line from disk instead of an in-memory blob.

use crate::error::{ErrorContext, PipelineError};
use crate::filter::CompiledFilter;
use crate::value::Value;

use super::json;

/// Decode `text` line-by-line, applying `json_root` per line and dropping
/// lines rejected by `filter` (if any). Never fails the whole file: bad
/// lines are recorded as warnings and skipped.
pub fn decode(
    text: &str,
    json_root: Option<&str>,
    filter: &CompiledFilter,
    filename: &str,
) -> (Vec<Value>, Vec<PipelineError>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (row_index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match json::decode(line, json_root) {
            Ok(parsed) => {
                for record in parsed {
                    if filter.eval(&record) {
                        records.push(record);
                    }
                }
            }
            Err(attempts) => {
                errors.push(
                    PipelineError::warning(format!(
                        "failed to decode JSONL line (tried: {attempts})"
                    ))
                    .with_context(
                        ErrorContext::new()
                            .with_filename(filename)
                            .with_row_index(row_index),
                    ),
                );
            }
        }
    }

    (records, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_line_independently() {
        let text = "{\"a\": 1}\n{\"a\": 2}\n";
        let (records, errors) = decode(text, None, &CompiledFilter::Const(true), "f.jsonl");
        assert_eq!(records.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn bad_line_is_skipped_and_recorded_without_aborting_file() {
        let text = "{\"a\": 1}\nnot json {{\n{\"a\": 2}\n";
        let (records, errors) = decode(text, None, &CompiledFilter::Const(true), "f.jsonl");
        assert_eq!(records.len(), 2);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn empty_lines_are_skipped_silently() {
        let text = "{\"a\": 1}\n\n\n{\"a\": 2}\n";
        let (records, errors) = decode(text, None, &CompiledFilter::Const(true), "f.jsonl");
        assert_eq!(records.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn filter_drops_non_matching_lines() {
        let text = "{\"kind\": \"keep\"}\n{\"kind\": \"drop\"}\n";
        let mut m = indexmap::IndexMap::new();
        m.insert("source".into(), Value::String("kind".into()));
        m.insert("op".into(), Value::String("eq".into()));
        m.insert("value".into(), Value::String("keep".into()));
        let filter = CompiledFilter::compile(Some(&Value::Mapping(m)));

        let (records, _) = decode(text, None, &filter, "f.jsonl");
        assert_eq!(records.len(), 1);
    }
}
