//! CLI module for Syllabus.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Syllabus - Question answering over course materials
///
/// Ingest pre-chunked course catalogs, then ask questions answered by a
/// tool-calling model with citations back to courses and lessons.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SYLLABUS_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about the course materials
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive chat session with conversation memory
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search course content directly, without the model
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names are resolved)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(short = 'n', long)]
        lesson: Option<u32>,

        /// Maximum number of results (defaults to catalog.max_results)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a course outline
    Outline {
        /// Course name (partial names are resolved)
        course: String,
    },

    /// List stored courses
    Courses,

    /// Load a course catalog file, or a directory of them
    Ingest {
        /// Path to a catalog JSON file or a directory of JSON files
        path: String,

        /// Replace courses that are already stored
        #[arg(short, long)]
        force: bool,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::parse_from([
            "syllabus", "-vv", "search", "neural nets", "--course", "Intro", "-n", "2",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search {
                query,
                course,
                lesson,
                limit,
            } => {
                assert_eq!(query, "neural nets");
                assert_eq!(course.as_deref(), Some("Intro"));
                assert_eq!(lesson, Some(2));
                assert_eq!(limit, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_ingest_force() {
        let cli = Cli::parse_from(["syllabus", "ingest", "docs/", "--force"]);
        assert!(matches!(cli.command, Commands::Ingest { force: true, .. }));
    }
}
