//! Question answering over the course catalog.
//!
//! [`RagSystem`] wires the catalog, the course tools, the response generator
//! and session history together behind a single `query` call.

mod session;

pub use session::SessionManager;

use crate::catalog::{open_index, CourseCatalog};
use crate::config::{Prompts, Settings};
use crate::embedding::create_embedder;
use crate::error::Result;
use crate::generator::ResponseGenerator;
use crate::llm::{LlmClient, OpenAiChatClient};
use crate::tools::{CourseOutlineTool, CourseSearchTool, Source, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Answer to a query with the sources the tools drew on.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl RagResponse {
    /// Format sources for display.
    pub fn format_sources(&self) -> String {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, s)| match &s.link {
                Some(link) => format!("[{}] {} ({})", i + 1, s.label, link),
                None => format!("[{}] {}", i + 1, s.label),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Catalog-backed question answering with per-session history.
pub struct RagSystem {
    catalog: CourseCatalog,
    generator: ResponseGenerator,
    sessions: SessionManager,
}

impl RagSystem {
    pub fn new(catalog: CourseCatalog, generator: ResponseGenerator, sessions: SessionManager) -> Self {
        Self {
            catalog,
            generator,
            sessions,
        }
    }

    /// Build the full stack from settings, talking to OpenAI for answers.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client: Arc<dyn LlmClient> = Arc::new(OpenAiChatClient::new(Duration::from_secs(
            settings.llm.timeout_seconds,
        ))?);
        Self::with_client(settings, client)
    }

    /// Build the stack from settings with a caller-supplied LLM client.
    pub fn with_client(settings: &Settings, client: Arc<dyn LlmClient>) -> Result<Self> {
        let catalog = open_catalog(settings)?;
        let prompts = Prompts::load(&settings.prompts)?;
        let generator = ResponseGenerator::from_settings(client, &settings.llm, prompts);
        let sessions = SessionManager::new(settings.session.max_history)
            .with_max_sessions(settings.session.max_sessions);

        Ok(Self::new(catalog, generator, sessions))
    }

    pub fn catalog(&self) -> &CourseCatalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Tools exposed to the model for one query.
    pub fn tool_registry(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(CourseSearchTool::new(self.catalog.clone())))?;
        registry.register_tool(Arc::new(CourseOutlineTool::new(self.catalog.clone())))?;
        Ok(registry)
    }

    /// Answer a question, using and extending the session's history if given.
    #[instrument(skip(self))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<RagResponse> {
        let prompt = format!("Answer this question about course materials: {}", query);
        let history = session_id.and_then(|id| self.sessions.get_conversation_history(id));

        // A registry per query keeps concurrent queries from sharing sources
        let registry = self.tool_registry()?;
        let definitions = registry.tool_definitions();

        let answer = self
            .generator
            .generate_response(&prompt, history.as_deref(), Some(&definitions), Some(&registry))
            .await?;

        let sources = registry.get_last_sources();
        registry.reset_sources();

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, query, &answer);
        }

        info!("Answered with {} sources", sources.len());
        Ok(RagResponse { answer, sources })
    }

    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.catalog.existing_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }
}

/// Open the configured catalog index and embedder as a [`CourseCatalog`].
pub fn open_catalog(settings: &Settings) -> Result<CourseCatalog> {
    let index = open_index(settings)?;
    let embedder = create_embedder(&settings.embedding)?;
    CourseCatalog::new(index, embedder, settings.catalog.max_results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sources() {
        let response = RagResponse {
            answer: "a".to_string(),
            sources: vec![
                Source::new("Course A - Lesson 1", Some("https://example.com/a/1".to_string())),
                Source::new("Course B", None),
            ],
        };
        assert_eq!(
            response.format_sources(),
            "[1] Course A - Lesson 1 (https://example.com/a/1)\n[2] Course B"
        );
    }
}
