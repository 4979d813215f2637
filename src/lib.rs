//! Syllabus - Question answering over course materials
//!
//! Answers natural-language questions about a catalog of courses by letting
//! a chat model call retrieval tools before it answers.
//!
//! # Architecture
//!
//! - `catalog` - Course metadata and passages, fuzzy course resolution, filtered search
//! - `tools` - Content search and outline tools, and the registry that dispatches them
//! - `llm` - Chat completion types and the OpenAI adapter
//! - `generator` - Bounded tool-calling conversation loop
//! - `rag` - Query facade with sessions and citations
//! - `ingest` - Loading pre-chunked course catalogs
//! - `embedding` - Embedding generation (OpenAI or local hashing)
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use syllabus::config::Settings;
//! use syllabus::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let rag = RagSystem::from_settings(&settings)?;
//!
//!     let response = rag.query("What does lesson 2 of the MCP course cover?", None).await?;
//!     println!("{}", response.answer);
//!     println!("{}", response.format_sources());
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod tools;

pub use error::{Result, SyllabusError};
