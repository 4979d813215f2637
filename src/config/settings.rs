//! Configuration settings for Syllabus.

use crate::error::{Result, SyllabusError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub catalog: CatalogSettings,
    pub session: SessionSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.syllabus".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Settings for the answer-generating model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model used for answers.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on tokens produced per completion.
    pub max_output_tokens: u32,
    /// Number of tool-calling rounds before a forced tool-less answer.
    pub max_tool_rounds: usize,
    /// HTTP timeout for a single completion call.
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_output_tokens: 800,
            max_tool_rounds: 2,
            timeout_seconds: 300,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI embeddings API.
    #[default]
    OpenAI,
    /// Local feature-hashing embedder (no network).
    Hashing,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "hashing" | "local" => Ok(EmbeddingProvider::Hashing),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::OpenAI => write!(f, "openai"),
            EmbeddingProvider::Hashing => write!(f, "hashing"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, hashing).
    pub provider: EmbeddingProvider,
    /// Embedding model to use (openai provider only).
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Catalog backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogProvider {
    /// SQLite file on disk.
    #[default]
    Sqlite,
    /// Process-local, lost on exit.
    Memory,
}

impl std::fmt::Display for CatalogProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogProvider::Sqlite => write!(f, "sqlite"),
            CatalogProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Course catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Catalog backend (sqlite, memory).
    pub provider: CatalogProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Default number of passages returned by a content search.
    pub max_results: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            provider: CatalogProvider::Sqlite,
            sqlite_path: "~/.syllabus/catalog.db".to_string(),
            max_results: 5,
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Number of question/answer exchanges remembered per session.
    pub max_history: usize,
    /// Sessions held in memory before the least recently used is evicted.
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_history: 2,
            max_sessions: 1000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// File whose contents replace the built-in system prompt.
    pub system_prompt_file: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would only fail later, mid-query.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.max_results == 0 {
            return Err(SyllabusError::Config(
                "catalog.max_results must be greater than 0".to_string(),
            ));
        }
        if self.llm.max_output_tokens == 0 {
            return Err(SyllabusError::Config(
                "llm.max_output_tokens must be greater than 0".to_string(),
            ));
        }
        if self.llm.max_tool_rounds == 0 {
            return Err(SyllabusError::Config(
                "llm.max_tool_rounds must be greater than 0".to_string(),
            ));
        }
        if self.session.max_sessions == 0 {
            return Err(SyllabusError::Config(
                "session.max_sessions must be greater than 0".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(SyllabusError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SyllabusError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("syllabus")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.catalog.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.catalog.max_results, 5);
        assert_eq!(settings.llm.max_tool_rounds, 2);
        assert_eq!(settings.llm.max_output_tokens, 800);
        assert_eq!(settings.llm.temperature, 0.0);
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let mut settings = Settings::default();
        settings.catalog.max_results = 0;
        assert!(matches!(settings.validate(), Err(SyllabusError::Config(_))));
    }

    #[test]
    fn test_zero_max_sessions_rejected() {
        let mut settings = Settings::default();
        assert_eq!(settings.session.max_sessions, 1000);
        settings.session.max_sessions = 0;
        assert!(matches!(settings.validate(), Err(SyllabusError::Config(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [catalog]
            provider = "memory"

            [embedding]
            provider = "hashing"
            "#,
        )
        .unwrap();

        assert_eq!(settings.catalog.provider, CatalogProvider::Memory);
        assert_eq!(settings.catalog.max_results, 5);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[catalog]\nmax_results = 0\n").unwrap();

        assert!(Settings::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.session.max_history = 4;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.session.max_history, 4);
    }

    #[test]
    fn test_embedding_provider_from_str() {
        assert_eq!("local".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Hashing);
        assert!("bogus".parse::<EmbeddingProvider>().is_err());
    }
}
