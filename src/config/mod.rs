//! Configuration module for Syllabus.
//!
//! Handles loading and managing application settings and the system prompt.

mod prompts;
mod settings;

pub use prompts::{Prompts, DEFAULT_SYSTEM_PROMPT};
pub use settings::{
    CatalogProvider, CatalogSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings,
    LlmSettings, PromptSettings, SessionSettings, Settings,
};
