//! Multi-section CSV decoder (spec §4.2, spec §9 Open Question): reserved
//! format, no defined record semantics. Emits a single file-level error
//! rather than guessing at a layout or panicking.

use crate::error::DecodeError;

/// Always fails: `csv_multi` has no defined decoding semantics (spec §9:
/// "An implementer must either raise fatal or coordinate with a domain
/// expert" — this crate raises fatal).
pub fn decode(filename: &str) -> Result<Vec<crate::value::Value>, DecodeError> {
    Err(DecodeError::MultiSectionCsvUnsupported {
        filename: filename.to_string(),
    })
}
