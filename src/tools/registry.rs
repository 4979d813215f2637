//! Name-keyed tool dispatch with per-tool source tracking.

use super::{Source, Tool, ToolDefinition};
use crate::error::{Result, SyllabusError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

/// Registry of tools available to a single conversation turn.
///
/// Keeps the sources produced by each tool's executions in the latest round
/// it ran, so the caller can collect citations after the model is done.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    sources: Mutex<SourceTracker>,
}

/// Sources per tool, tagged with the round that produced them.
#[derive(Default)]
struct SourceTracker {
    round: u64,
    by_tool: HashMap<String, (u64, Vec<Source>)>,
}

impl SourceTracker {
    /// Merge into the tool's sources for the current round, replacing any
    /// left over from an earlier round. Labels are kept unique.
    fn record(&mut self, tool: &str, sources: Vec<Source>) {
        let round = self.round;
        let entry = self
            .by_tool
            .entry(tool.to_string())
            .or_insert_with(|| (round, Vec::new()));
        if entry.0 != round {
            *entry = (round, Vec::new());
        }
        for source in sources {
            if !entry.1.iter().any(|s| s.label == source.label) {
                entry.1.push(source);
            }
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name();
        if name.is_empty() {
            return Err(SyllabusError::Config("Tool name must not be empty".to_string()));
        }
        if self.tools.iter().any(|t| t.name() == name) {
            return Err(SyllabusError::Config(format!(
                "Tool '{}' is already registered",
                name
            )));
        }

        debug!("Registered tool '{}'", name);
        self.tools.push(tool);
        Ok(())
    }

    /// Definitions of every registered tool, in registration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// An unknown name is reported as text, not as an error, so the model
    /// can recover. Errors from the tool itself propagate.
    #[instrument(skip(self, input))]
    pub async fn execute_tool(&self, name: &str, input: &serde_json::Value) -> Result<String> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!("Model requested unknown tool '{}'", name);
            return Ok(format!("Tool '{}' not found", name));
        };

        let output = tool.execute(input).await?;
        debug!(
            "Tool '{}' returned {} chars, {} sources",
            name,
            output.content.len(),
            output.sources.len()
        );

        self.lock_sources()?.record(name, output.sources);
        Ok(output.content)
    }

    /// Start a new round of tool calls.
    ///
    /// Calls within one round accumulate their sources; a tool that runs
    /// again in a later round replaces what it recorded before.
    pub fn begin_round(&self) {
        if let Ok(mut tracker) = self.sources.lock() {
            tracker.round += 1;
        }
    }

    /// Sources from each tool's latest round, in registration order.
    pub fn get_last_sources(&self) -> Vec<Source> {
        let Ok(tracker) = self.sources.lock() else {
            return Vec::new();
        };

        let mut sources: Vec<Source> = Vec::new();
        for (_, tool_sources) in self.tools.iter().filter_map(|t| tracker.by_tool.get(t.name())) {
            for source in tool_sources {
                if !sources.iter().any(|s| s.label == source.label) {
                    sources.push(source.clone());
                }
            }
        }
        sources
    }

    /// Forget all tracked sources.
    pub fn reset_sources(&self) {
        if let Ok(mut tracker) = self.sources.lock() {
            tracker.by_tool.clear();
        }
    }

    fn lock_sources(&self) -> Result<MutexGuard<'_, SourceTracker>> {
        self.sources
            .lock()
            .map_err(|_| SyllabusError::Tool("Source tracker lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutput;
    use async_trait::async_trait;

    struct EchoTool {
        name: &'static str,
        sources: Vec<Source>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: "Echo input".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
            Ok(ToolOutput::with_sources(input.to_string(), self.sources.clone()))
        }
    }

    /// Cites whatever label it is given.
    struct LabelTool;

    #[async_trait]
    impl Tool for LabelTool {
        fn name(&self) -> &str {
            "label"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "label".to_string(),
                description: "Cite a label".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
            let label = input["label"].as_str().unwrap_or_default();
            Ok(ToolOutput::with_sources(label, vec![Source::new(label, None)]))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "fail".to_string(),
                description: "Always fails".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, _: &serde_json::Value) -> Result<ToolOutput> {
            Err(SyllabusError::Tool("boom".to_string()))
        }
    }

    fn echo(name: &'static str, label: &str) -> Arc<dyn Tool> {
        Arc::new(EchoTool {
            name,
            sources: vec![Source::new(label, None)],
        })
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(echo("a", "A")).unwrap();
        assert!(registry.register_tool(echo("a", "A2")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(echo("second", "S")).unwrap();
        registry.register_tool(echo("first", "F")).unwrap();

        let names: Vec<String> = registry.tool_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_text() {
        let registry = ToolRegistry::new();
        let result = registry
            .execute_tool("nonexistent", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(result, "Tool 'nonexistent' not found");
        assert!(registry.get_last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_sources_tracked_and_reset() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(echo("a", "A")).unwrap();
        registry.register_tool(echo("b", "B")).unwrap();

        registry.begin_round();
        registry.execute_tool("b", &serde_json::json!({})).await.unwrap();
        registry.execute_tool("a", &serde_json::json!({})).await.unwrap();

        let labels: Vec<String> = registry.get_last_sources().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["A", "B"]);

        registry.reset_sources();
        assert!(registry.get_last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_same_round_calls_accumulate() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(LabelTool)).unwrap();

        registry.begin_round();
        registry
            .execute_tool("label", &serde_json::json!({"label": "Lesson 1"}))
            .await
            .unwrap();
        registry
            .execute_tool("label", &serde_json::json!({"label": "Lesson 2"}))
            .await
            .unwrap();
        registry
            .execute_tool("label", &serde_json::json!({"label": "Lesson 1"}))
            .await
            .unwrap();

        let labels: Vec<String> = registry.get_last_sources().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Lesson 1", "Lesson 2"]);

        // A later round replaces the tool's earlier sources
        registry.begin_round();
        registry
            .execute_tool("label", &serde_json::json!({"label": "Lesson 3"}))
            .await
            .unwrap();
        let labels: Vec<String> = registry.get_last_sources().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Lesson 3"]);
    }

    #[tokio::test]
    async fn test_tool_error_propagates() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(FailingTool)).unwrap();

        let result = registry.execute_tool("fail", &serde_json::json!({})).await;
        assert!(matches!(result, Err(SyllabusError::Tool(_))));
    }
}
