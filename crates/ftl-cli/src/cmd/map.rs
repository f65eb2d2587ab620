use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use ftl_core::manifest::Manifest;
use serde::Serialize;

use crate::output::{render_item, OutputMode, Renderable};
use crate::resolve_manifest_path;

#[derive(Args)]
pub struct MapArgs {
    /// Id of the upload whose raw records should be mapped.
    #[arg(long)]
    pub upload_id: i64,

    /// Path to the manifest YAML. Falls back to `FTL_MANIFEST_PATH`, then
    /// `manifest.yaml` in the current directory.
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct MapSummary {
    upload_id: i64,
    events_emitted: usize,
    entities_emitted: usize,
}

impl Renderable for MapSummary {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "upload {}", self.upload_id)?;
        writeln!(w, "events emitted:   {}", self.events_emitted)?;
        writeln!(w, "entities emitted: {}", self.entities_emitted)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{}", serde_json::to_string(self).unwrap_or_default())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}", self.upload_id, self.events_emitted, self.entities_emitted)
    }

    fn table_headers() -> &'static [&'static str] {
        &["UPLOAD_ID", "EVENTS", "ENTITIES"]
    }
}

/// Run the `map` subcommand.
///
/// # Errors
/// Returns an error if the manifest fails to load, the database cannot be
/// opened, or the upload id does not exist.
pub fn run(args: &MapArgs, db_path: &std::path::Path, mode: OutputMode) -> anyhow::Result<()> {
    let manifest_path = resolve_manifest_path(args.manifest_path.clone());
    let manifest = Manifest::load(&manifest_path)?;

    let mut conn = ftl_store::connection::open(db_path)?;
    let report = ftl_pipeline::map::map(&mut conn, &manifest, args.upload_id)?;

    let summary = MapSummary {
        upload_id: args.upload_id,
        events_emitted: report.events_emitted,
        entities_emitted: report.entities_emitted,
    };
    render_item(&summary, mode)?;
    Ok(())
}
