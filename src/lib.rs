//! Commit message generator library
//!
//! Reads staged changes from a git repository, asks a local Ollama server for
//! a commit message, and formats the reply as a conventional, emoji or plain
//! commit message.
pub mod analysis;
pub mod api;
pub mod config;
pub mod connection;
pub mod diff;
pub mod error;
pub mod generate;
pub mod git;
pub mod message;
pub mod preview;
pub mod style;
pub mod templates;
pub mod types;

// Re-export commonly used types
pub use api::OllamaClient;
pub use config::Config;
pub use error::{CommitGenError, Result};
pub use git::DiffSource;
pub use types::{CommitMessage, CommitStyle, DiffStats, Language};
