//! Course outline tool: structured course and lesson listing.

use super::{parse_args, Source, Tool, ToolDefinition, ToolOutput};
use crate::catalog::{CourseCatalog, CourseOutline};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Returns the title, link, instructor and lesson list of a course.
pub struct CourseOutlineTool {
    catalog: CourseCatalog,
}

impl CourseOutlineTool {
    pub const NAME: &'static str = "get_course_outline";

    pub fn new(catalog: CourseCatalog) -> Self {
        Self { catalog }
    }
}

/// Render an outline as plain text for the model.
pub fn render_outline(outline: &CourseOutline) -> String {
    let mut lines = vec![format!("Course: {}", outline.title)];
    if let Some(link) = &outline.course_link {
        lines.push(format!("Link: {}", link));
    }
    if let Some(instructor) = &outline.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }

    lines.push(String::new());
    lines.push(format!("Lessons ({}):", outline.lessons.len()));
    for lesson in &outline.lessons {
        let mut line = format!("  Lesson {}: {}", lesson.lesson_number, lesson.lesson_title);
        if let Some(link) = &lesson.lesson_link {
            line.push_str(&format!(" ({})", link));
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Get the outline of a course: title, link, instructor and the complete \
                lesson list with lesson numbers, titles and links"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
        let args: OutlineArgs = parse_args(Self::NAME, input)?;

        match self.catalog.get_course_outline(&args.course_name).await? {
            Some(outline) => {
                let source = Source::new(outline.title.clone(), outline.course_link.clone());
                Ok(ToolOutput::with_sources(render_outline(&outline), vec![source]))
            }
            None => Ok(ToolOutput::text(format!(
                "No course found matching {}.",
                args.course_name
            ))),
        }
    }
}
