use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use ftl_core::manifest::Manifest;
use serde::Serialize;

use crate::output::{render_item, OutputMode, Renderable};
use crate::resolve_manifest_path;

#[derive(Args)]
pub struct ExtractArgs {
    /// Platform label recorded on the new upload (e.g. "instagram").
    #[arg(long)]
    pub platform: String,

    /// Directory of unpacked source files to extract.
    #[arg(long)]
    pub staging_dir: PathBuf,

    /// Path to the manifest YAML. Falls back to `FTL_MANIFEST_PATH`, then
    /// `manifest.yaml` in the current directory.
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct ExtractSummary {
    upload_id: i64,
    given_name: String,
    files_seen: usize,
    files_matched: usize,
    records_decoded: usize,
}

impl Renderable for ExtractSummary {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "upload {} ({})", self.upload_id, self.given_name)?;
        writeln!(w, "files seen:      {}", self.files_seen)?;
        writeln!(w, "files matched:   {}", self.files_matched)?;
        writeln!(w, "records decoded: {}", self.records_decoded)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{}", serde_json::to_string(self).unwrap_or_default())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            self.upload_id, self.given_name, self.files_seen, self.files_matched, self.records_decoded
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["UPLOAD_ID", "NAME", "SEEN", "MATCHED", "DECODED"]
    }
}

/// Run the `extract` subcommand.
///
/// # Errors
/// Returns an error if the manifest fails to load, the database cannot be
/// opened, or extraction itself fails (missing/empty staging directory).
pub fn run(args: &ExtractArgs, db_path: &std::path::Path, mode: OutputMode) -> anyhow::Result<()> {
    let manifest_path = resolve_manifest_path(args.manifest_path.clone());
    let manifest = Manifest::load(&manifest_path)?;

    let mut conn = ftl_store::connection::open(db_path)?;
    let report = ftl_pipeline::extract::extract(&mut conn, &manifest, &args.platform, &args.staging_dir)?;

    let summary = ExtractSummary {
        upload_id: report.upload.id,
        given_name: report.upload.given_name,
        files_seen: report.files_seen,
        files_matched: report.files_matched,
        records_decoded: report.records_decoded,
    };
    render_item(&summary, mode)?;
    Ok(())
}
