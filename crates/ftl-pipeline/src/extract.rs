//! Extractor stage (spec §4.7): walk the staging directory, resolve each
//! file against the manifest, decode it, and persist raw records with
//! provenance — all within one upload transaction.

use std::path::Path;

use ftl_core::error::ExtractError;
use ftl_core::manifest::{clean_staged_filename, Manifest};
use ftl_core::model::{ParseStatus, Upload};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Report returned after extraction completes.
#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub upload: Upload,
    pub files_seen: usize,
    pub files_matched: usize,
    pub records_decoded: usize,
}

/// Extract every file in `staging_dir` into a new upload.
///
/// # Errors
/// Returns [`ExtractError`] when the staging directory is missing or empty;
/// per-file decode failures are recorded as warnings on `UploadedFile` and
/// do not abort the run.
pub fn extract(
    conn: &mut Connection,
    manifest: &Manifest,
    platform: &str,
    staging_dir: &Path,
) -> Result<ExtractReport, ExtractError> {
    if !staging_dir.is_dir() {
        return Err(ExtractError::StagingMissing {
            path: staging_dir.to_path_buf(),
        });
    }

    let mut entries: Vec<_> = std::fs::read_dir(staging_dir)
        .map_err(|_| ExtractError::StagingMissing {
            path: staging_dir.to_path_buf(),
        })?
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    if entries.is_empty() {
        return Err(ExtractError::StagingEmpty {
            path: staging_dir.to_path_buf(),
        });
    }

    let tx = conn
        .transaction()
        .map_err(|e| io_as_staging_missing(staging_dir, &e))?;
    let upload = ftl_store::uploads::create(&tx, platform)
        .map_err(|e| io_as_staging_missing(staging_dir, &e))?;

    let mut files_matched = 0usize;
    let mut records_decoded = 0usize;

    for entry in &entries {
        let opfs_filename = entry.file_name().to_string_lossy().to_string();
        let bytes = std::fs::read(entry.path())
            .map_err(|e| io_as_staging_missing(staging_dir, &e))?;

        let manifest_filename = clean_staged_filename(&opfs_filename);
        let hash = hex_sha256(&bytes);
        let file_size = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        let file_config = manifest.file_config_for(&opfs_filename);

        let Some(file_config) = file_config else {
            warn!(filename = %opfs_filename, "file did not match any manifest entry");
            ftl_store::uploaded_files::create(
                &tx,
                upload.id,
                None,
                &opfs_filename,
                &manifest_filename,
                &hash,
                file_size,
                ParseStatus::Failure,
            )
            .map_err(|e| io_as_staging_missing(staging_dir, &e))?;
            continue;
        };

        match ftl_core::decode::decode(&bytes, &file_config.parser, &opfs_filename) {
            Ok(outcome) => {
                let uploaded_file = ftl_store::uploaded_files::create(
                    &tx,
                    upload.id,
                    Some(&file_config.id),
                    &opfs_filename,
                    &manifest_filename,
                    &hash,
                    file_size,
                    ParseStatus::Success,
                )
                .map_err(|e| io_as_staging_missing(staging_dir, &e))?;

                for warning in &outcome.errors {
                    warn!(filename = %opfs_filename, %warning, "non-fatal decode error");
                }

                for record in &outcome.records {
                    ftl_store::raw_data::create(&tx, upload.id, uploaded_file.id, record)
                        .map_err(|e| io_as_staging_missing(staging_dir, &e))?;
                    records_decoded += 1;
                }
                files_matched += 1;
            }
            Err(decode_error) => {
                warn!(filename = %opfs_filename, error = %decode_error, "file failed to decode");
                ftl_store::uploaded_files::create(
                    &tx,
                    upload.id,
                    Some(&file_config.id),
                    &opfs_filename,
                    &manifest_filename,
                    &hash,
                    file_size,
                    ParseStatus::Failure,
                )
                .map_err(|e| io_as_staging_missing(staging_dir, &e))?;
            }
        }
    }

    tx.commit().map_err(|e| io_as_staging_missing(staging_dir, &e))?;

    Ok(ExtractReport {
        upload,
        files_seen: entries.len(),
        files_matched,
        records_decoded,
    })
}

/// Storage failures during extraction have no dedicated `ExtractError`
/// variant in the spec's three named failure modes; fold them into the
/// staging-missing variant with the underlying reason preserved in the
/// message text.
fn io_as_staging_missing(staging_dir: &Path, error: &impl std::fmt::Display) -> ExtractError {
    ExtractError::StagingMissing {
        path: staging_dir.join(format!(".storage-error: {error}")),
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
