use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitGenError {
   #[error("Git command failed: {0}")]
   GitError(String),

   #[error("libgit2 error: {0}")]
   Libgit(#[from] git2::Error),

   #[error("No git repository found in {dir}")]
   NoRepository { dir: String },

   #[error("No staged changes found. Stage your changes first with `git add`")]
   NoStagedChanges,

   #[error("Failed to create commit: {0}")]
   CommitFailed(String),

   #[error("Cannot connect to Ollama server at {host}")]
   ConnectionFailed { host: String },

   #[error("Generation request failed (HTTP {status}): {body}")]
   Generation { status: u16, body: String },

   #[error("Configuration error: {0}")]
   Config(String),

   #[error("Failed to parse config: {0}")]
   TomlDe(#[from] toml::de::Error),

   #[error("Failed to serialize config: {0}")]
   TomlSer(#[from] toml::ser::Error),

   #[error("Template error: {0}")]
   Template(#[from] tera::Error),

   #[error("IO error: {0}")]
   IoError(#[from] std::io::Error),

   #[error("JSON error: {0}")]
   JsonError(#[from] serde_json::Error),

   #[error("HTTP error: {0}")]
   HttpError(#[from] reqwest::Error),

   #[error("Clipboard error: {0}")]
   ClipboardError(#[from] arboard::Error),

   #[error("Prompt error: {0}")]
   PromptError(#[from] dialoguer::Error),

   #[error("{0}")]
   Other(String),
}

impl CommitGenError {
   /// Transport-level and server-side failures worth another attempt
   pub fn is_transient(&self) -> bool {
      match self {
         Self::Generation { status, .. } => *status >= 500,
         Self::HttpError(e) => e.is_connect() || e.is_timeout(),
         _ => false,
      }
   }
}

pub type Result<T> = std::result::Result<T, CommitGenError>;
