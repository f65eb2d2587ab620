//! Error types for the ingestion pipeline's core library.
//!
//! Every fatal-level error explains what went wrong, why, and how to fix it,
//! following the three-severity model (fatal / warning / info): fatal errors
//! abort a file or stage and are realized as [`thiserror`] enums below;
//! warning/info conditions are accumulated as [`PipelineError`] values rather
//! than returned as `Err`, since the caller continues past them.

use std::fmt;
use std::path::PathBuf;

/// One of the three severity levels a pipeline condition can carry.
///
/// Fatal aborts the current file or stage. Warning skips the current record
/// but the stage continues. Info substitutes a field's default and continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context accompanying a non-fatal pipeline condition, as available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub filename: Option<String>,
    pub row_index: Option<usize>,
    pub field_name: Option<String>,
    pub exception_type: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn with_row_index(mut self, row_index: usize) -> Self {
        self.row_index = Some(row_index);
        self
    }

    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    #[must_use]
    pub fn with_exception_type(mut self, exception_type: impl Into<String>) -> Self {
        self.exception_type = Some(exception_type.into());
        self
    }
}

/// A first-class accumulated condition: a warning or info recorded while a
/// stage continues past it (per spec §7's level-dependent propagation rules).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub severity: Severity,
    pub message: String,
    pub context: Option<ErrorContext>,
}

impl PipelineError {
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Errors raised while loading and validating a manifest document (spec §4.6).
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(
        "Error: failed to read manifest at {path}\nCause: {reason}\nFix: check that the manifest file exists and is readable."
    )]
    Io { path: PathBuf, reason: String },

    #[error(
        "Error: failed to parse manifest YAML at {path}\nCause: {reason}\nFix: fix the YAML syntax in the manifest file."
    )]
    ParseFailed { path: PathBuf, reason: String },

    #[error(
        "Error: manifest at {path} is missing the top-level '{key}' key\nCause: both 'files' and 'views' are required at the document root\nFix: add a '{key}' list to the manifest."
    )]
    MissingTopLevelKey { path: PathBuf, key: &'static str },

    #[error(
        "Error: manifest at {path} has a files[] entry missing '{key}'\nCause: every file entry requires an 'id' and a 'path'\nFix: add the missing '{key}' field to the file entry."
    )]
    FileEntryMissingKey { path: PathBuf, key: &'static str },

    #[error(
        "Error: manifest at {path} has a views[] entry missing '{key}'\nCause: every view entry requires a 'file.id'\nFix: add the missing '{key}' field to the view entry."
    )]
    ViewEntryMissingKey { path: PathBuf, key: &'static str },

    #[error(
        "Error: manifest at {path} has a duplicate files[].id '{id}'\nCause: file ids must be unique within a manifest\nFix: rename one of the duplicate file entries."
    )]
    DuplicateFileId { path: PathBuf, id: String },

    #[error(
        "Error: manifest at {path} has a views[] entry referencing unknown file id '{id}'\nCause: every view's 'file.id' must match a declared files[].id\nFix: fix the view's file.id or add the missing file entry."
    )]
    UnknownFileId { path: PathBuf, id: String },
}

/// Errors raised by the structured-text decoders (spec §4.2) on total failure.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(
        "Error: failed to decode '{filename}' as {format}\nCause: all fallback parsers failed ({attempts})\nFix: inspect the file contents; it may not conform to the declared format."
    )]
    AllFallbacksFailed {
        filename: String,
        format: &'static str,
        attempts: String,
    },

    #[error(
        "Error: unsupported parser format '{format}' for '{filename}'\nCause: only json, jsonl, csv, json_label_values, and csv_multi are recognized\nFix: correct the manifest's parser.format value."
    )]
    UnsupportedFormat { filename: String, format: String },

    #[error(
        "Error: multi-section CSV decoding is not implemented for '{filename}'\nCause: csv_multi is a reserved stub format with no defined record semantics\nFix: do not route files to csv_multi until the format is specified."
    )]
    MultiSectionCsvUnsupported { filename: String },
}

/// Errors raised by the extractor stage (spec §4.7) at the stage level.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(
        "Error: staging directory '{path}' does not exist\nCause: extraction requires an existing directory of source files\nFix: check the upload path passed to extract()."
    )]
    StagingMissing { path: PathBuf },

    #[error(
        "Error: staging directory '{path}' contains no visible files\nCause: extraction requires at least one file to ingest\nFix: check that the archive was unpacked into the staging directory."
    )]
    StagingEmpty { path: PathBuf },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Errors raised by the semantic mapper stage (spec §4.8) at the stage level.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Error: upload '{upload_id}' not found\nCause: no upload with this id exists\nFix: check the upload id passed to map().")]
    UploadNotFound { upload_id: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Fatal.to_string(), "fatal");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn pipeline_error_warning_carries_context() {
        let err = PipelineError::warning("ragged CSV line skipped").with_context(
            ErrorContext::new()
                .with_filename("export.csv")
                .with_row_index(12),
        );
        assert_eq!(err.severity, Severity::Warning);
        assert_eq!(err.context.as_ref().unwrap().row_index, Some(12));
        assert!(err.to_string().contains("ragged CSV line skipped"));
    }

    #[test]
    fn manifest_error_messages_follow_error_cause_fix() {
        let err = ManifestError::MissingTopLevelKey {
            path: PathBuf::from("manifest.yaml"),
            key: "views",
        };
        let msg = err.to_string();
        assert!(msg.contains("Error:"));
        assert!(msg.contains("Cause:"));
        assert!(msg.contains("Fix:"));
        assert!(msg.contains("views"));
    }

    #[test]
    fn decode_error_all_fallbacks_failed() {
        let err = DecodeError::AllFallbacksFailed {
            filename: "activity.json".into(),
            format: "json",
            attempts: "strict, single_quote, lenient, es5, human".into(),
        };
        assert!(err.to_string().contains("activity.json"));
    }
}
