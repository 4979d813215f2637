//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::open_catalog;
use anyhow::Result;
use std::num::NonZeroUsize;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let limit = match limit {
        Some(n) => Some(
            NonZeroUsize::new(n).ok_or_else(|| anyhow::anyhow!("--limit must be greater than 0"))?,
        ),
        None => None,
    };

    let catalog = open_catalog(&settings)?;

    let spinner = Output::spinner("Searching...");
    let results = catalog.search(query, course, lesson, limit).await;
    spinner.finish_and_clear();

    if let Some(error) = results.error {
        Output::warning(&error);
        return Ok(());
    }

    if results.is_empty() {
        Output::info("No relevant content found.");
        return Ok(());
    }

    Output::header(&format!("Results for \"{}\"", query));
    for hit in &results.hits {
        Output::search_hit(hit);
    }
    println!();

    Ok(())
}
