//! Data model (spec §3): the entities that flow through extraction,
//! mapping, and dedup, independent of how they are persisted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One record per user-initiated archive ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: i64,
    pub platform: String,
    pub given_name: String,
    pub upload_timestamp: i64,
    pub updated_at: i64,
}

/// Parse status recorded on an [`UploadedFile`] (spec §7's fatal/per-file
/// propagation: a per-file parse failure is a warning, not a stage abort).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Success,
    Failure,
}

impl ParseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// One record per source file seen during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: i64,
    pub upload_id: i64,
    /// The manifest `files[].id` this file matched, or `None` if unmatched.
    pub manifest_file_id: Option<String>,
    /// The flattened on-disk filename under the staging directory.
    pub opfs_filename: String,
    /// The cleaned (un-flattened) archive path used for path resolution.
    pub manifest_filename: String,
    pub file_hash: String,
    pub upload_timestamp: i64,
    pub file_size_bytes: i64,
    pub parse_status: ParseStatus,
}

/// One decoded entry from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: i64,
    pub upload_id: i64,
    pub file_id: i64,
    pub data: Value,
}

/// A normalized, point-in-time timeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub upload_id: i64,
    pub file_ids: Vec<i64>,
    pub raw_data_ids: Vec<i64>,
    /// Milliseconds since the epoch; `0` means untimed (spec §9 Open
    /// Question: `0` is overloaded as both "missing" and "epoch").
    pub timestamp: i64,
    pub event_action: String,
    /// Fixed to `"event"` for rows in this table (spec §3).
    pub event_kind: String,
    pub message: String,
    pub attributes: IndexMap<String, Value>,
    pub deduplicated: bool,
    pub extra_timestamps: Vec<i64>,
    pub event_category: Option<Vec<String>>,
}

/// A long-lived, non-timestamped entity (spec §3: currently only
/// authenticated devices are dispatched here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub upload_id: i64,
    pub file_id: i64,
    pub raw_data_id: i64,
    pub entity_type: String,
    /// One of `"asset"` or `"entity"` (spec §4.8 step 6).
    pub event_kind: String,
    pub attributes: IndexMap<String, Value>,
}

/// A free-text annotation bound to an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub event_id: i64,
    pub comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Map a canonical `event_action` to a human-readable message (spec
/// GLOSSARY: "Action→message lookup"), passing unrecognized actions through
/// verbatim. `event_action` is cleaned (spec §4.5's trim/strip-`@`/
/// dot-to-underscore/lowercase normalization) before matching, same as the
/// original lookup.
#[must_use]
pub fn action_message(event_action: &str) -> String {
    let cleaned = crate::project::clean_target_name(event_action);
    match cleaned.as_str() {
        "auth_checkpoint_init" => "Account verification request".to_string(),
        "auth_checkpoint_pass" => "Account verification passed".to_string(),
        "data_export_request" => "Data export requested by user".to_string(),
        "email_addition" => "Email added".to_string(),
        "password_reset_request" => "Password reset requested by user".to_string(),
        "recovery_contact_addition" | "legacy_contact_addition" => {
            "Recovery/legacy contact added".to_string()
        }
        "user_login_success" => "Successful login".to_string(),
        "user_logout" => "Logout".to_string(),
        "user_password_change" => "Password changed".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_action_maps_to_message() {
        assert_eq!(action_message("user_login_success"), "Successful login");
    }

    #[test]
    fn legacy_contact_alias_maps_same_as_recovery_contact() {
        assert_eq!(action_message("recovery_contact_addition"), "Recovery/legacy contact added");
        assert_eq!(action_message("legacy_contact_addition"), "Recovery/legacy contact added");
    }

    #[test]
    fn unrecognized_action_passes_through_cleaned() {
        assert_eq!(action_message("  @LOGIN.Attempt "), "login_attempt");
    }

    #[test]
    fn parse_status_as_str() {
        assert_eq!(ParseStatus::Success.as_str(), "success");
        assert_eq!(ParseStatus::Failure.as_str(), "failure");
    }
}
