//! CSV decoder (spec §4.2): header-bearing, minimally-quoted, all-string
//! cells. Empty rows are dropped; ragged lines are skipped with a warning;
//! an optional `drop_duplicates` pass runs after decoding.

use indexmap::IndexMap;

use crate::error::{ErrorContext, PipelineError};
use crate::manifest::DropDuplicates;
use crate::value::Value;

/// Decode `bytes` as header-bearing CSV.
pub fn decode(
    bytes: &[u8],
    drop_duplicates: Option<&DropDuplicates>,
    filename: &str,
) -> (Vec<Value>, Vec<PipelineError>) {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let Ok(headers) = reader.headers().cloned() else {
        return (Vec::new(), Vec::new());
    };

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (row_index, result) in reader.records().enumerate() {
        let Ok(row) = result else {
            errors.push(
                PipelineError::warning("malformed CSV line skipped").with_context(
                    ErrorContext::new()
                        .with_filename(filename)
                        .with_row_index(row_index),
                ),
            );
            continue;
        };

        if row.len() != headers.len() {
            errors.push(
                PipelineError::warning("ragged CSV line skipped").with_context(
                    ErrorContext::new()
                        .with_filename(filename)
                        .with_row_index(row_index),
                ),
            );
            continue;
        }

        if row.iter().all(str::is_empty) {
            continue;
        }

        let mut mapping = IndexMap::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            mapping.insert(header.to_string(), Value::String(cell.to_string()));
        }
        records.push(Value::Mapping(mapping));
    }

    if let Some(opts) = drop_duplicates {
        records = apply_drop_duplicates(records, opts);
    }

    (records, errors)
}

fn dedup_key(record: &Value, subset: &[String]) -> Vec<String> {
    let Some(mapping) = record.as_mapping() else {
        return Vec::new();
    };
    if subset.is_empty() {
        mapping.values().map(Value::coerce_to_string).collect()
    } else {
        subset
            .iter()
            .map(|field| {
                mapping
                    .get(field)
                    .map(Value::coerce_to_string)
                    .unwrap_or_default()
            })
            .collect()
    }
}

fn non_empty_cell_count(record: &Value) -> usize {
    record
        .as_mapping()
        .map(|m| m.values().filter(|v| !v.is_trivial()).count())
        .unwrap_or(0)
}

/// Apply the `{subset, keep}` duplicate-removal rule (spec §4.2): under
/// `row_completeness`, keep the row with the most non-empty cells, ties
/// broken by original order.
fn apply_drop_duplicates(records: Vec<Value>, opts: &DropDuplicates) -> Vec<Value> {
    let mut best_index_by_key: IndexMap<Vec<String>, usize> = IndexMap::new();

    for (index, record) in records.iter().enumerate() {
        let key = dedup_key(record, &opts.subset);
        match best_index_by_key.get(&key).copied() {
            None => {
                best_index_by_key.insert(key, index);
            }
            Some(existing) => {
                let replace = match opts.keep.as_str() {
                    "last" => true,
                    "row_completeness" => {
                        non_empty_cell_count(&records[index]) > non_empty_cell_count(&records[existing])
                    }
                    _ => false,
                };
                if replace {
                    best_index_by_key.insert(key, index);
                }
            }
        }
    }

    let mut kept_indices: Vec<usize> = best_index_by_key.values().copied().collect();
    kept_indices.sort_unstable();
    kept_indices.into_iter().map(|i| records[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_produces_mapping_per_line() {
        let (records, errors) = decode(b"a,b\n1,2\n3,4\n", None, "f.csv");
        assert!(errors.is_empty());
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].as_mapping().unwrap().get("a"),
            Some(&Value::String("1".into()))
        );
    }

    #[test]
    fn empty_row_is_dropped() {
        let (records, _) = decode(b"a,b\n,\n1,2\n", None, "f.csv");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn ragged_line_is_skipped_with_warning() {
        let (records, errors) = decode(b"a,b\n1,2,3\n4,5\n", None, "f.csv");
        assert_eq!(records.len(), 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn drop_duplicates_keep_first() {
        let opts = DropDuplicates {
            subset: vec!["a".to_string()],
            keep: "first".to_string(),
        };
        let (records, _) = decode(b"a,b\n1,x\n1,y\n", Some(&opts), "f.csv");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_mapping().unwrap().get("b"),
            Some(&Value::String("x".into()))
        );
    }

    #[test]
    fn drop_duplicates_row_completeness_keeps_fuller_row() {
        let opts = DropDuplicates {
            subset: vec!["a".to_string()],
            keep: "row_completeness".to_string(),
        };
        let (records, _) = decode(b"a,b,c\n1,,\n1,x,y\n", Some(&opts), "f.csv");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_mapping().unwrap().get("b"),
            Some(&Value::String("x".into()))
        );
    }
}
