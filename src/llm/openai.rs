//! OpenAI chat completions adapter.

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, Role, StopReason,
    ToolChoice,
};
use crate::error::{Result, SyllabusError};
use crate::openai::create_client_with_timeout;
use crate::tools::ToolDefinition;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// [`LlmClient`] backed by the OpenAI chat completions API.
pub struct OpenAiChatClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAiChatClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
        })
    }
}

fn build_err(e: impl std::fmt::Display) -> SyllabusError {
    SyllabusError::Llm(e.to_string())
}

fn to_openai_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.input_schema.clone()),
            strict: None,
        },
    }
}

/// Flatten one neutral message into zero or more OpenAI messages.
///
/// Tool results become one `tool` message each; any plain text in the same
/// turn follows as a user message.
fn to_openai_messages(message: &Message) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out = Vec::new();
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in &message.content {
        match block {
            ContentBlock::Text { text } => texts.push(text.as_str()),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ChatCompletionMessageToolCall {
                    id: id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => {
                out.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(tool_use_id.clone())
                        .content(content.clone())
                        .build()
                        .map_err(build_err)?
                        .into(),
                );
            }
        }
    }

    let text = texts.join("\n");
    match message.role {
        Role::User => {
            if !text.is_empty() || out.is_empty() {
                out.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()
                        .map_err(build_err)?
                        .into(),
                );
            }
        }
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !text.is_empty() {
                args.content(text);
            }
            if !tool_calls.is_empty() {
                args.tool_calls(tool_calls);
            }
            out.push(args.build().map_err(build_err)?.into());
        }
    }

    Ok(out)
}

fn map_finish_reason(reason: Option<FinishReason>) -> StopReason {
    match reason {
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        Some(FinishReason::ToolCalls) | Some(FinishReason::FunctionCall) => StopReason::ToolUse,
        Some(FinishReason::ContentFilter) => StopReason::Other("content_filter".to_string()),
        None => StopReason::Other("unknown".to_string()),
    }
}

fn parse_arguments(name: &str, raw: &str) -> serde_json::Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Malformed arguments for tool '{}': {}", name, e);
            serde_json::Value::String(raw.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn create_completion(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(build_err)?
                .into(),
        ];
        for message in &request.messages {
            messages.extend(to_openai_messages(message)?);
        }

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_output_tokens);

        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            args.tools(tools.iter().map(to_openai_tool).collect::<Vec<_>>());
            if let Some(ToolChoice::Auto) = request.tool_choice {
                args.tool_choice(ChatCompletionToolChoiceOption::Auto);
            }
        }

        let api_request = args.build().map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| SyllabusError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SyllabusError::Llm("No response from model".to_string()))?;

        let mut content = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlock::Text { text });
        }
        for call in choice.message.tool_calls.unwrap_or_default() {
            content.push(ContentBlock::ToolUse {
                input: parse_arguments(&call.function.name, &call.function.arguments),
                id: call.id,
                name: call.function.name,
            });
        }

        let stop_reason = map_finish_reason(choice.finish_reason);
        debug!("Completion finished: {:?}, {} blocks", stop_reason, content.len());

        Ok(CompletionResponse {
            stop_reason,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some(FinishReason::Stop)), StopReason::EndTurn);
        assert_eq!(map_finish_reason(Some(FinishReason::Length)), StopReason::MaxTokens);
        assert_eq!(map_finish_reason(Some(FinishReason::ToolCalls)), StopReason::ToolUse);
        assert!(matches!(
            map_finish_reason(Some(FinishReason::ContentFilter)),
            StopReason::Other(_)
        ));
    }

    #[test]
    fn test_malformed_arguments_kept_raw() {
        assert_eq!(
            parse_arguments("t", r#"{"query": "x"}"#),
            serde_json::json!({"query": "x"})
        );
        assert_eq!(
            parse_arguments("t", "{not json"),
            serde_json::Value::String("{not json".to_string())
        );
    }

    #[test]
    fn test_tool_results_become_tool_messages() {
        let message = Message::tool_results(vec![
            ContentBlock::ToolResult {
                tool_use_id: "a".to_string(),
                content: "one".to_string(),
                is_error: false,
            },
            ContentBlock::ToolResult {
                tool_use_id: "b".to_string(),
                content: "two".to_string(),
                is_error: true,
            },
        ]);

        let converted = to_openai_messages(&message).unwrap();
        assert_eq!(converted.len(), 2);
        assert!(converted
            .iter()
            .all(|m| matches!(m, ChatCompletionRequestMessage::Tool(_))));
    }

    #[test]
    fn test_assistant_tool_use_becomes_tool_calls() {
        let message = Message::assistant(vec![ContentBlock::ToolUse {
            id: "call_1".to_string(),
            name: "get_course_outline".to_string(),
            input: serde_json::json!({"course_name": "MCP"}),
        }]);

        let converted = to_openai_messages(&message).unwrap();
        assert_eq!(converted.len(), 1);
        match &converted[0] {
            ChatCompletionRequestMessage::Assistant(a) => {
                let calls = a.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].function.name, "get_course_outline");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_tool_definition_conversion() {
        let definition = ToolDefinition {
            name: "search_course_content".to_string(),
            description: "Search".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let tool = to_openai_tool(&definition);
        assert_eq!(tool.function.name, "search_course_content");
        assert_eq!(tool.function.parameters, Some(serde_json::json!({"type": "object"})));
    }
}
