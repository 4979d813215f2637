//! Tools the model can call while answering a question.
//!
//! A [`Tool`] is a named capability with a JSON schema describing its input.
//! Tools return their text output together with the source attributions
//! backing it; the [`ToolRegistry`] dispatches by name and keeps the most
//! recent attributions for citation.

mod outline;
mod registry;
mod search;

pub use outline::CourseOutlineTool;
pub use registry::ToolRegistry;
pub use search::CourseSearchTool;

use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Machine-readable tool description handed to the model verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A citation identifying which course or lesson backed part of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Human-readable label, e.g. "Course Title - Lesson 2".
    pub label: String,
    /// Link to the lesson or course, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Source {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Text produced by a tool plus the sources it drew on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output with no attributions.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            content: content.into(),
            sources,
        }
    }
}

/// A capability exposed to the model.
///
/// `execute` reports expected "no data" conditions as ordinary text. An
/// `Err` means the tool itself failed and is treated as critical by the
/// response generator.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Schema and description for the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied JSON input.
    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput>;
}

/// Decode a tool's JSON input into its argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, input: &serde_json::Value) -> Result<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| SyllabusError::Tool(format!("Invalid arguments for '{}': {}", tool, e)))
}
