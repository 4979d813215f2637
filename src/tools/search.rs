//! Content search tool: semantic passage lookup scoped by course and lesson.

use super::{parse_args, Source, Tool, ToolDefinition, ToolOutput};
use crate::catalog::{CourseCatalog, PassageHit};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course passages, optionally filtered by course name and lesson.
pub struct CourseSearchTool {
    catalog: CourseCatalog,
}

impl CourseSearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(catalog: CourseCatalog) -> Self {
        Self { catalog }
    }

    fn no_results_message(args: &SearchArgs) -> String {
        let mut scope = String::new();
        if let Some(course) = &args.course_name {
            scope.push_str(&format!(" in course '{}'", course));
        }
        if let Some(lesson) = args.lesson_number {
            scope.push_str(&format!(" in lesson {}", lesson));
        }
        format!("No relevant content found{}.", scope)
    }

    fn label(hit: &PassageHit) -> String {
        match hit.passage.lesson_number {
            Some(n) => format!("{} - Lesson {}", hit.passage.course_title, n),
            None => hit.passage.course_title.clone(),
        }
    }

    async fn link_for(&self, hit: &PassageHit) -> Option<String> {
        let lesson = hit.passage.lesson_number?;
        match self.catalog.lesson_link(&hit.passage.course_title, lesson).await {
            Ok(link) => link,
            Err(e) => {
                warn!("Lesson link lookup failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
        let args: SearchArgs = parse_args(Self::NAME, input)?;

        let results = self
            .catalog
            .search(&args.query, args.course_name.as_deref(), args.lesson_number, None)
            .await;

        // Relay catalog errors verbatim so the model does not improvise
        if let Some(error) = results.error {
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            return Ok(ToolOutput::text(Self::no_results_message(&args)));
        }

        debug!("Formatting {} passages", results.hits.len());

        let mut blocks = Vec::with_capacity(results.hits.len());
        let mut sources: Vec<Source> = Vec::new();

        for hit in &results.hits {
            let label = Self::label(hit);
            blocks.push(format!("[{}]\n{}", label, hit.passage.content));

            if !sources.iter().any(|s| s.label == label) {
                let link = self.link_for(hit).await;
                sources.push(Source::new(label, link));
            }
        }

        Ok(ToolOutput::with_sources(blocks.join("\n\n"), sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Course, CoursePassage, Lesson, MemoryCatalogIndex};
    use crate::embedding::HashingEmbedder;
    use std::sync::Arc;

    async fn tool() -> CourseSearchTool {
        let catalog = CourseCatalog::new(
            Arc::new(MemoryCatalogIndex::new()),
            Arc::new(HashingEmbedder::default()),
            5,
        )
        .unwrap();

        catalog
            .add_course_metadata(&Course {
                title: "Building Towards Computer Use".to_string(),
                course_link: None,
                instructor: None,
                lessons: vec![Lesson {
                    lesson_number: 1,
                    title: "Prompting".to_string(),
                    lesson_link: Some("https://example.com/cu/1".to_string()),
                }],
            })
            .await
            .unwrap();
        catalog
            .add_course_content(&[
                CoursePassage {
                    content: "Prompt caching reuses a prefix of the prompt.".to_string(),
                    course_title: "Building Towards Computer Use".to_string(),
                    lesson_number: Some(1),
                    chunk_index: 0,
                },
                CoursePassage {
                    content: "Caching the prompt prefix lowers latency.".to_string(),
                    course_title: "Building Towards Computer Use".to_string(),
                    lesson_number: Some(1),
                    chunk_index: 1,
                },
            ])
            .await
            .unwrap();

        CourseSearchTool::new(catalog)
    }

    #[test]
    fn test_definition_schema() {
        let catalog = CourseCatalog::new(
            Arc::new(MemoryCatalogIndex::new()),
            Arc::new(HashingEmbedder::default()),
            5,
        )
        .unwrap();
        let definition = CourseSearchTool::new(catalog).definition();

        assert_eq!(definition.name, "search_course_content");
        assert_eq!(definition.input_schema["required"], serde_json::json!(["query"]));
        assert!(definition.input_schema["properties"]["course_name"].is_object());
        assert!(definition.input_schema["properties"]["lesson_number"].is_object());
    }

    #[tokio::test]
    async fn test_formats_passages_with_headers_and_sources() {
        let tool = tool().await;
        let output = tool
            .execute(&serde_json::json!({"query": "prompt caching", "course_name": "Computer Use"}))
            .await
            .unwrap();

        assert!(output.content.contains("[Building Towards Computer Use - Lesson 1]"));
        assert!(output.content.contains("Prompt caching reuses"));
        // Two passages from the same lesson share one attribution
        assert_eq!(output.sources.len(), 1);
        assert_eq!(output.sources[0].label, "Building Towards Computer Use - Lesson 1");
        assert_eq!(output.sources[0].link.as_deref(), Some("https://example.com/cu/1"));
    }

    #[tokio::test]
    async fn test_no_results_names_filters() {
        let tool = tool().await;
        let output = tool
            .execute(&serde_json::json!({"query": "anything", "course_name": "Computer", "lesson_number": 7}))
            .await
            .unwrap();

        assert_eq!(
            output.content,
            "No relevant content found in course 'Computer' in lesson 7."
        );
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_error_relayed_verbatim() {
        let catalog = CourseCatalog::new(
            Arc::new(MemoryCatalogIndex::new()),
            Arc::new(HashingEmbedder::default()),
            5,
        )
        .unwrap();
        let tool = CourseSearchTool::new(catalog);

        let output = tool
            .execute(&serde_json::json!({"query": "q", "course_name": "Nonexistent"}))
            .await
            .unwrap();
        assert_eq!(output.content, "No course found matching 'Nonexistent'");
    }

    #[tokio::test]
    async fn test_empty_catalog_plain_search() {
        let catalog = CourseCatalog::new(
            Arc::new(MemoryCatalogIndex::new()),
            Arc::new(HashingEmbedder::default()),
            5,
        )
        .unwrap();
        let tool = CourseSearchTool::new(catalog);

        let output = tool.execute(&serde_json::json!({"query": "what is retrieval?"})).await;
        tokio_test::assert_ok!(&output);
        assert_eq!(output.unwrap().content, "No relevant content found.");
    }

    #[tokio::test]
    async fn test_missing_query_is_error() {
        let tool = tool().await;
        assert!(tool.execute(&serde_json::json!({})).await.is_err());
    }
}
