//! Pre-flight checks before operations that call external services.
//!
//! Catches a missing API key up front instead of failing after the catalog
//! has been opened and the first request is under way.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::Result;
use crate::openai::check_api_key;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions always needs the chat model.
    Ask,
    /// Search and course resolution embed the query.
    Search,
    /// Ingestion embeds titles and passages.
    Ingest,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => check_api_key(),
        Operation::Search | Operation::Ingest => match settings.embedding.provider {
            EmbeddingProvider::OpenAI => check_api_key(),
            EmbeddingProvider::Hashing => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_embeddings_need_no_key() {
        let mut settings = Settings::default();
        settings.embedding.provider = EmbeddingProvider::Hashing;
        assert!(check(Operation::Search, &settings).is_ok());
        assert!(check(Operation::Ingest, &settings).is_ok());
    }
}
