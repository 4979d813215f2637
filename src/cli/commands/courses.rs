//! Courses command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::open_catalog;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let catalog = open_catalog(&settings)?;

    match catalog.list_courses().await {
        Ok(courses) => {
            if courses.is_empty() {
                Output::info("No courses stored yet. Use 'syllabus ingest <path>' to add some.");
            } else {
                Output::header(&format!("Courses ({})", courses.len()));
                println!();

                for course in &courses {
                    Output::course_info(course);
                }

                let total_passages: u32 = courses.iter().map(|c| c.passage_count).sum();
                println!();
                Output::kv("Total courses", &courses.len().to_string());
                Output::kv("Total passages", &total_passages.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list courses: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
