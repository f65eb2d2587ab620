//! Manifest model (spec §4.6): a platform's declarative file-and-view
//! document, plus the path resolver (spec §4.1) that matches on-disk
//! filenames to a declared file entry.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ManifestError;
use crate::value::Value;

/// One `files[]` entry: a declared source file and its parser config.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub parser: ParserOptions,
}

/// Parser configuration carried on a `files[]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParserOptions {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub json_root: Option<String>,
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub drop_duplicates: Option<DropDuplicates>,
}

fn default_format() -> String {
    "json".to_string()
}

/// CSV-only `drop_duplicates` option (spec §4.2).
#[derive(Debug, Clone, Deserialize)]
pub struct DropDuplicates {
    #[serde(default)]
    pub subset: Vec<String>,
    #[serde(default = "default_keep")]
    pub keep: String,
}

fn default_keep() -> String {
    "first".to_string()
}

/// A `view.file` reference: which declared file id this view projects.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewFileRef {
    pub id: String,
}

/// A dynamic field entry within a view's `fields` list (spec §4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicField {
    pub target: String,
    pub source: SourcePaths,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub transform: Option<String>,
}

/// A dynamic field's `source`: either a single path string or a list of
/// candidate paths (used with `transform: coalesce`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourcePaths {
    Single(String),
    Many(Vec<String>),
}

impl SourcePaths {
    #[must_use]
    pub fn as_slice(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// One `views[]` entry: a filter + field-projection rule bound to a file id.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewProjection {
    pub file: ViewFileRef,
    #[serde(default)]
    pub r#where: Option<Value>,
    #[serde(default)]
    pub r#static: std::collections::HashMap<String, Value>,
    #[serde(default)]
    pub fields: Vec<DynamicField>,
}

/// The raw shape deserialized directly off the manifest YAML document.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    files: Option<Vec<FileEntry>>,
    #[serde(default)]
    views: Option<Vec<ViewProjection>>,
}

/// A loaded, validated platform manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    files: Vec<FileEntry>,
    views: Vec<ViewProjection>,
    view_index_by_file_id: HashMap<String, Vec<usize>>,
}

impl Manifest {
    /// Load and validate a manifest document from disk.
    ///
    /// # Errors
    /// Returns [`ManifestError`] when the file cannot be read, the YAML
    /// cannot be parsed, or a required key is missing (spec §4.6).
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest =
            serde_yaml::from_str(text).map_err(|e| ManifestError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let files = raw.files.ok_or_else(|| ManifestError::MissingTopLevelKey {
            path: path.to_path_buf(),
            key: "files",
        })?;
        let views = raw.views.ok_or_else(|| ManifestError::MissingTopLevelKey {
            path: path.to_path_buf(),
            key: "views",
        })?;

        let mut seen_ids = std::collections::HashSet::new();
        for file in &files {
            if file.id.is_empty() {
                return Err(ManifestError::FileEntryMissingKey {
                    path: path.to_path_buf(),
                    key: "id",
                });
            }
            if file.path.is_empty() {
                return Err(ManifestError::FileEntryMissingKey {
                    path: path.to_path_buf(),
                    key: "path",
                });
            }
            if !seen_ids.insert(file.id.clone()) {
                return Err(ManifestError::DuplicateFileId {
                    path: path.to_path_buf(),
                    id: file.id.clone(),
                });
            }
        }

        let known_ids: std::collections::HashSet<&str> =
            files.iter().map(|f| f.id.as_str()).collect();

        let mut view_index_by_file_id: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, view) in views.iter().enumerate() {
            if view.file.id.is_empty() {
                return Err(ManifestError::ViewEntryMissingKey {
                    path: path.to_path_buf(),
                    key: "file.id",
                });
            }
            if !known_ids.contains(view.file.id.as_str()) {
                return Err(ManifestError::UnknownFileId {
                    path: path.to_path_buf(),
                    id: view.file.id.clone(),
                });
            }
            view_index_by_file_id
                .entry(view.file.id.clone())
                .or_default()
                .push(index);
        }

        Ok(Self {
            files,
            views,
            view_index_by_file_id,
        })
    }

    /// Declared `files[].path` suffix patterns, in declaration order.
    #[must_use]
    pub fn file_paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    /// Resolve an on-disk filename to its declared file entry (spec §4.1):
    /// case-insensitive suffix match against the cleaned filename, first
    /// declared match wins.
    #[must_use]
    pub fn file_config_for(&self, filename: &str) -> Option<&FileEntry> {
        let cleaned = clean_staged_filename(filename);
        let cleaned_lower = cleaned.to_ascii_lowercase();
        self.files
            .iter()
            .find(|f| cleaned_lower.ends_with(&f.path.to_ascii_lowercase()))
    }

    /// The views bound to a declared file id, in declaration order.
    #[must_use]
    pub fn views_for_file_id(&self, file_id: &str) -> Vec<&ViewProjection> {
        self.view_index_by_file_id
            .get(file_id)
            .map(|indices| indices.iter().map(|&i| &self.views[i]).collect())
            .unwrap_or_default()
    }
}

/// Reverse the staging directory's path-flattening convention (spec §6):
/// `___` stands in for a path separator.
#[must_use]
pub fn clean_staged_filename(filename: &str) -> String {
    filename.replace("___", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
files:
  - id: auth_log
    path: auth/activity.json
    parser:
      format: json
  - id: devices
    path: devices.csv
    parser:
      format: csv
views:
  - file:
      id: auth_log
    fields: []
  - file:
      id: auth_log
    fields: []
  - file:
      id: devices
    fields: []
";

    #[test]
    fn loads_and_indexes_views_by_file_id() {
        let manifest = Manifest::parse(Path::new("manifest.yaml"), SAMPLE).unwrap();
        assert_eq!(manifest.file_paths(), vec!["auth/activity.json", "devices.csv"]);
        assert_eq!(manifest.views_for_file_id("auth_log").len(), 2);
        assert_eq!(manifest.views_for_file_id("devices").len(), 1);
        assert!(manifest.views_for_file_id("nonexistent").is_empty());
    }

    #[test]
    fn resolves_suffix_match_case_insensitively_with_flattened_path() {
        let manifest = Manifest::parse(Path::new("manifest.yaml"), SAMPLE).unwrap();
        let entry = manifest
            .file_config_for("export___auth___ACTIVITY.JSON")
            .unwrap();
        assert_eq!(entry.id, "auth_log");
    }

    #[test]
    fn unmatched_file_returns_none() {
        let manifest = Manifest::parse(Path::new("manifest.yaml"), SAMPLE).unwrap();
        assert!(manifest.file_config_for("unrelated.txt").is_none());
    }

    #[test]
    fn missing_views_key_is_fatal() {
        let err = Manifest::parse(Path::new("manifest.yaml"), "files: []").unwrap_err();
        assert!(matches!(err, ManifestError::MissingTopLevelKey { key: "views", .. }));
    }

    #[test]
    fn view_referencing_unknown_file_id_is_fatal() {
        let bad = r"
files:
  - id: a
    path: a.json
views:
  - file:
      id: nope
    fields: []
";
        let err = Manifest::parse(Path::new("manifest.yaml"), bad).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownFileId { .. }));
    }

    #[test]
    fn duplicate_file_id_is_fatal() {
        let bad = r"
files:
  - id: a
    path: a.json
  - id: a
    path: b.json
views: []
";
        let err = Manifest::parse(Path::new("manifest.yaml"), bad).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateFileId { .. }));
    }
}
