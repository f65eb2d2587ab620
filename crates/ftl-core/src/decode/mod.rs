//! Structured-text decoders (spec §4.2): one module per supported format,
//! dispatched by `parser.format` from the manifest.

pub mod csv;
pub mod csv_multi;
pub mod json;
pub mod jsonl;
pub mod label_values;

use crate::error::{DecodeError, PipelineError};
use crate::filter::CompiledFilter;
use crate::manifest::ParserOptions;
use crate::value::Value;

/// The result of decoding one file: the records produced plus any non-fatal
/// (warning-level) errors accumulated along the way.
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    pub records: Vec<Value>,
    pub errors: Vec<PipelineError>,
}

/// Decode `bytes` according to `opts.format`, dispatching to the matching
/// format module.
///
/// # Errors
/// Returns [`DecodeError`] when every fallback attempt fails (JSON/JSONL
/// total failure has no successful line at all), the format is unrecognized,
/// or the format is the `csv_multi` stub.
pub fn decode(bytes: &[u8], opts: &ParserOptions, filename: &str) -> Result<DecodeOutcome, DecodeError> {
    match opts.format.as_str() {
        "json" => {
            let text = String::from_utf8_lossy(bytes);
            json::decode(&text, opts.json_root.as_deref())
                .map(|records| DecodeOutcome {
                    records,
                    errors: Vec::new(),
                })
                .map_err(|attempts| DecodeError::AllFallbacksFailed {
                    filename: filename.to_string(),
                    format: "json",
                    attempts,
                })
        }
        "jsonl" => {
            let text = String::from_utf8_lossy(bytes);
            let filter = CompiledFilter::compile(opts.filter.as_ref());
            let (records, errors) =
                jsonl::decode(&text, opts.json_root.as_deref(), &filter, filename);
            Ok(DecodeOutcome { records, errors })
        }
        "csv" => {
            let (records, errors) = csv::decode(bytes, opts.drop_duplicates.as_ref(), filename);
            Ok(DecodeOutcome { records, errors })
        }
        "json_label_values" => {
            let text = String::from_utf8_lossy(bytes);
            label_values::decode(&text, opts.json_root.as_deref())
                .map(|records| DecodeOutcome {
                    records,
                    errors: Vec::new(),
                })
                .map_err(|attempts| DecodeError::AllFallbacksFailed {
                    filename: filename.to_string(),
                    format: "json_label_values",
                    attempts,
                })
        }
        "csv_multi" => csv_multi::decode(filename).map(|records| DecodeOutcome {
            records,
            errors: Vec::new(),
        }),
        other => Err(DecodeError::UnsupportedFormat {
            filename: filename.to_string(),
            format: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(format: &str) -> ParserOptions {
        ParserOptions {
            format: format.to_string(),
            json_root: None,
            filter: None,
            drop_duplicates: None,
        }
    }

    #[test]
    fn dispatches_to_json_decoder() {
        let outcome = decode(br#"{"a": 1}"#, &opts("json"), "f.json").unwrap();
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn dispatches_to_csv_decoder() {
        let outcome = decode(b"a,b\n1,2\n", &opts("csv"), "f.csv").unwrap();
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn unsupported_format_is_fatal() {
        let result = decode(b"anything", &opts("xml"), "f.xml");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat { .. })));
    }

    #[test]
    fn csv_multi_is_fatal_stub() {
        let result = decode(b"a\nb", &opts("csv_multi"), "f.csv");
        assert!(matches!(
            result,
            Err(DecodeError::MultiSectionCsvUnsupported { .. })
        ));
    }

    #[test]
    fn empty_json_file_decodes_to_no_records_without_fatal_error() {
        let outcome = decode(b"[]", &opts("json"), "f.json").unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn garbage_json_is_fatal() {
        let result = decode(b"{{{not json", &opts("json"), "f.json");
        assert!(matches!(result, Err(DecodeError::AllFallbacksFailed { .. })));
    }
}
