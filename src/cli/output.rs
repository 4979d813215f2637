//! CLI output formatting utilities.

use crate::catalog::{CourseOutline, CourseSummary, PassageHit};
use crate::tools::Source;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a numbered citation.
    pub fn source(index: usize, source: &Source) {
        match &source.link {
            Some(link) => println!(
                "  {} {} {}",
                style(format!("[{}]", index)).cyan(),
                source.label,
                style(link).dim()
            ),
            None => println!("  {} {}", style(format!("[{}]", index)).cyan(), source.label),
        }
    }

    /// Print a course summary line.
    pub fn course_info(course: &CourseSummary) {
        let instructor = course.instructor.as_deref().unwrap_or("unknown instructor");
        println!(
            "  {} {} ({}, {} lessons, {} passages)",
            style("*").cyan(),
            style(&course.title).bold(),
            style(instructor).dim(),
            course.lesson_count,
            course.passage_count
        );
    }

    /// Print a course outline.
    pub fn outline(outline: &CourseOutline) {
        Output::header(&outline.title);
        if let Some(link) = &outline.course_link {
            Output::kv("Link", link);
        }
        if let Some(instructor) = &outline.instructor {
            Output::kv("Instructor", instructor);
        }
        println!();
        for lesson in &outline.lessons {
            let number = style(format!("{:>3}.", lesson.lesson_number)).cyan();
            match &lesson.lesson_link {
                Some(link) => println!("  {} {} {}", number, lesson.lesson_title, style(link).dim()),
                None => println!("  {} {}", number, lesson.lesson_title),
            }
        }
    }

    /// Print a search hit.
    pub fn search_hit(hit: &PassageHit) {
        let location = match hit.passage.lesson_number {
            Some(n) => format!("Lesson {}", n),
            None => "Course".to_string(),
        };
        println!(
            "\n{} {} / {} (score: {:.2})",
            style(">>").green(),
            style(&hit.passage.course_title).bold(),
            style(location).cyan(),
            hit.score
        );
        println!("   {}", content_preview(&hit.passage.content, 200));
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten newlines and truncate with an ellipsis on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 50), "short text");
        assert_eq!(content_preview("abcdef", 3), "abc...");
        // Multi-byte characters are not split
        assert_eq!(content_preview("ééééé", 2), "éé...");
    }
}
