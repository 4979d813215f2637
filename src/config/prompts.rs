//! System prompt for answer generation.
//!
//! The built-in prompt can be replaced by pointing `prompts.system_prompt_file`
//! at a plain-text file. `{max_tool_rounds}` in either is replaced with the
//! configured round limit.

use super::{PromptSettings, Settings};
use crate::error::Result;

/// Placeholder for the round limit in system prompts.
pub const MAX_TOOL_ROUNDS_PLACEHOLDER: &str = "{max_tool_rounds}";

/// Built-in system instruction: tool-usage policy and response style.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI assistant specialized in course materials and educational content with access to tools for course information.

Available Tools:
1. **search_course_content**: Search course materials for specific content or educational details
2. **get_course_outline**: Get course structure including title, link, and complete lesson list with links

Tool Usage Guidelines:
- Use **search_course_content** for questions about specific course content, concepts, or detailed material
- Use **get_course_outline** for questions about course structure, lesson lists, what topics a course covers, or course outlines
- **Up to {max_tool_rounds} sequential tool rounds available** - Use multiple rounds when one tool's results inform the next search (e.g., get course outline first, then search based on lesson title)
- Synthesize all tool results into accurate, fact-based responses
- If a tool yields no results, state this clearly without offering alternatives

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without tools
- **Course-specific questions**: Use appropriate tool first, then answer
- **Multi-step queries**: Chain tool calls when needed (e.g., first get outline to find lesson title, then search for related content)
- **No meta-commentary**:
  - Provide direct answers only, with no reasoning process, tool explanations, or question-type analysis
  - Do not mention "based on the search results" or "based on the outline"

All responses must be:
1. **Brief, Concise and focused** - Get to the point quickly
2. **Educational** - Maintain instructional value
3. **Clear** - Use accessible language
4. **Example-supported** - Include relevant examples when they aid understanding
Provide only the direct answer to what was asked."#;

/// Prompt templates used by the generator.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub system: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, honouring a custom system prompt file if configured.
    pub fn load(settings: &PromptSettings) -> Result<Self> {
        match &settings.system_prompt_file {
            Some(path) => {
                let system = std::fs::read_to_string(Settings::expand_path(path))?;
                Ok(Self {
                    system: system.trim().to_string(),
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// System instruction for a conversation allowed `max_tool_rounds`
    /// rounds, with prior conversation folded in as plain text.
    pub fn system_with_history(&self, max_tool_rounds: usize, conversation_history: Option<&str>) -> String {
        let system = self
            .system
            .replace(MAX_TOOL_ROUNDS_PLACEHOLDER, &max_tool_rounds.to_string());
        match conversation_history {
            Some(history) if !history.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", system, history)
            }
            _ => system,
        }
    }
}
