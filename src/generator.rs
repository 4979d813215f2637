//! Tool-augmented answer generation.
//!
//! [`ResponseGenerator`] drives a bounded sequence of LLM calls. Each round
//! the model either answers or asks for tools; tool results are folded back
//! into the conversation. After `max_tool_rounds` rounds, or as soon as a
//! tool fails outright, one last call is made with no tools attached so the
//! model has to answer with what it has.

use crate::config::{LlmSettings, Prompts};
use crate::error::Result;
use crate::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, StopReason,
    ToolChoice,
};
use crate::tools::{ToolDefinition, ToolRegistry};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Record of a tool call made while answering.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: serde_json::Value,
    pub result: String,
    /// The tool itself failed, as opposed to reporting "no data".
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.input)
    }
}

/// Final answer plus a trace of how it was produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of completion requests sent.
    pub llm_calls: usize,
}

/// Bounded multi-round conversation with an LLM that may call tools.
pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_tool_rounds: usize,
    prompts: Prompts,
}

impl ResponseGenerator {
    /// Create a generator with the default prompt and limits.
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        let defaults = LlmSettings::default();
        Self {
            client,
            model: model.to_string(),
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
            max_tool_rounds: defaults.max_tool_rounds,
            prompts: Prompts::default(),
        }
    }

    pub fn from_settings(client: Arc<dyn LlmClient>, settings: &LlmSettings, prompts: Prompts) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
            max_tool_rounds: settings.max_tool_rounds,
            prompts,
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer a query, returning only the text.
    pub async fn generate_response(
        &self,
        query: &str,
        conversation_history: Option<&str>,
        tool_definitions: Option<&[ToolDefinition]>,
        tool_registry: Option<&ToolRegistry>,
    ) -> Result<String> {
        self.generate(query, conversation_history, tool_definitions, tool_registry)
            .await
            .map(|outcome| outcome.answer)
    }

    /// Answer a query and report the tool calls and LLM calls it took.
    ///
    /// In-band failures (unknown tools, tool errors, empty results) never
    /// surface here; only a failing LLM call returns `Err`.
    #[instrument(skip(self, conversation_history, tool_definitions, tool_registry))]
    pub async fn generate(
        &self,
        query: &str,
        conversation_history: Option<&str>,
        tool_definitions: Option<&[ToolDefinition]>,
        tool_registry: Option<&ToolRegistry>,
    ) -> Result<GenerationOutcome> {
        let system = self
            .prompts
            .system_with_history(self.max_tool_rounds, conversation_history);
        let tools: Option<Vec<ToolDefinition>> = tool_definitions
            .filter(|t| !t.is_empty())
            .map(|t| t.to_vec());

        let mut messages = vec![Message::user_text(query)];
        let mut tool_calls = Vec::new();
        let mut llm_calls = 0;
        let mut round = 0;

        while round < self.max_tool_rounds {
            debug!("Tool round {} of {}", round + 1, self.max_tool_rounds);

            let response = self
                .complete(&system, &messages, tools.clone(), &mut llm_calls)
                .await?;

            let registry = match (&response.stop_reason, tool_registry) {
                (StopReason::ToolUse, Some(registry)) => registry,
                _ => return Ok(Self::finish(response.text(), tool_calls, llm_calls)),
            };

            if response.tool_uses().is_empty() {
                warn!("Model signalled tool use without any tool calls");
                return Ok(Self::finish(response.text(), tool_calls, llm_calls));
            }

            let (results, records) = Self::execute_tools(registry, &response).await;
            let critical = records.iter().any(|r| r.is_error);
            tool_calls.extend(records);

            messages.push(Message::assistant(response.content));
            messages.push(Message::tool_results(results));

            if critical {
                warn!("Tool execution failed; forcing a final answer without tools");
                break;
            }

            round += 1;
        }

        let response = self.complete(&system, &messages, None, &mut llm_calls).await?;
        Ok(Self::finish(response.text(), tool_calls, llm_calls))
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: Option<Vec<ToolDefinition>>,
        llm_calls: &mut usize,
    ) -> Result<CompletionResponse> {
        let tool_choice = tools.as_ref().map(|_| ToolChoice::Auto);
        let request = CompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            system: system.to_string(),
            messages: messages.to_vec(),
            tools,
            tool_choice,
        };

        *llm_calls += 1;
        let response = self.client.create_completion(&request).await?;
        debug!("LLM call {} stopped with {:?}", llm_calls, response.stop_reason);
        Ok(response)
    }

    /// Run every tool call of a response, keeping results in call order.
    async fn execute_tools(
        registry: &ToolRegistry,
        response: &CompletionResponse,
    ) -> (Vec<ContentBlock>, Vec<ToolCallRecord>) {
        let uses = response.tool_uses();
        registry.begin_round();

        let outputs = join_all(uses.iter().map(|(_, name, input)| async move {
            info!("Calling tool {} with {}", name, input);
            match AssertUnwindSafe(registry.execute_tool(name, input))
                .catch_unwind()
                .await
            {
                Ok(Ok(content)) => (content, false),
                Ok(Err(e)) => {
                    warn!("Tool '{}' failed: {}", name, e);
                    (format!("Tool execution error: {}", e), true)
                }
                Err(_) => {
                    warn!("Tool '{}' panicked", name);
                    (format!("Tool execution error: tool '{}' panicked", name), true)
                }
            }
        }))
        .await;

        uses.iter()
            .zip(outputs)
            .map(|((id, name, input), (content, is_error))| {
                let block = ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content: content.clone(),
                    is_error,
                };
                let record = ToolCallRecord {
                    name: name.to_string(),
                    input: (*input).clone(),
                    result: content,
                    is_error,
                };
                (block, record)
            })
            .unzip()
    }

    fn finish(answer: String, tool_calls: Vec<ToolCallRecord>, llm_calls: usize) -> GenerationOutcome {
        info!(
            "Answer ready after {} LLM calls and {} tool calls",
            llm_calls,
            tool_calls.len()
        );
        GenerationOutcome {
            answer,
            tool_calls,
            llm_calls,
        }
    }
}
