//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::{catalog_files, ingest_catalog, load_catalog_file, IngestReport};
use crate::rag::open_catalog;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(path: &str, force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let files = catalog_files(&Settings::expand_path(path))?;
    if files.is_empty() {
        Output::warning(&format!("No catalog files found in {}", path));
        return Ok(());
    }

    let catalog = open_catalog(&settings)?;
    let mut total = IngestReport::default();

    let pb = Output::progress_bar(files.len() as u64, "Ingesting");
    for file in &files {
        pb.set_message(display_name(file));

        let loaded = load_catalog_file(file)?;
        let report = ingest_catalog(&catalog, &loaded, force).await?;

        total.courses_added += report.courses_added;
        total.passages_added += report.passages_added;
        total.skipped.extend(report.skipped);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Output::success(&format!(
        "Added {} courses ({} passages)",
        total.courses_added, total.passages_added
    ));
    if !total.skipped.is_empty() {
        Output::info(&format!(
            "Skipped {} already stored (use --force to replace):",
            total.skipped.len()
        ));
        for title in &total.skipped {
            Output::list_item(title);
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
