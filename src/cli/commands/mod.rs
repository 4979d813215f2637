//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod ingest;
mod outline;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::run_courses;
pub use ingest::run_ingest;
pub use outline::run_outline;
pub use search::run_search;
pub use serve::{router, run_serve};
