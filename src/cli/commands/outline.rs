//! Outline command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::open_catalog;
use anyhow::Result;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let catalog = open_catalog(&settings)?;

    match catalog.get_course_outline(course).await? {
        Some(outline) => {
            Output::outline(&outline);
            println!();
        }
        None => Output::info(&format!("No course found matching {}.", course)),
    }

    Ok(())
}
