use std::{fmt, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Line-prefix statistics for a unified diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
   pub files_changed: usize,
   pub insertions:    usize,
   pub deletions:     usize,
}

/// Status of a staged file, as reported by `git diff --name-status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
   Added,
   Modified,
   Deleted,
   Renamed,
   Copied,
   TypeChanged,
   Unmerged,
   Unknown(String),
}

impl ChangeStatus {
   /// Parse a name-status code. Rename/copy scores (`R100`) are ignored.
   pub fn from_code(code: &str) -> Self {
      match code.chars().next() {
         Some('A') => Self::Added,
         Some('M') => Self::Modified,
         Some('D') => Self::Deleted,
         Some('R') => Self::Renamed,
         Some('C') => Self::Copied,
         Some('T') => Self::TypeChanged,
         Some('U') => Self::Unmerged,
         _ => Self::Unknown(code.to_string()),
      }
   }

   pub fn code(&self) -> &str {
      match self {
         Self::Added => "A",
         Self::Modified => "M",
         Self::Deleted => "D",
         Self::Renamed => "R",
         Self::Copied => "C",
         Self::TypeChanged => "T",
         Self::Unmerged => "U",
         Self::Unknown(code) => code,
      }
   }
}

impl fmt::Display for ChangeStatus {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.code())
   }
}

/// A single staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
   pub path:   String,
   pub status: ChangeStatus,
}

/// Commit message parsed from model output.
///
/// `commit_type` is empty when the first line is not a conventional header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitMessage {
   #[serde(rename = "type")]
   pub commit_type: String,
   pub scope:       Option<String>,
   pub subject:     String,
   pub body:        Option<String>,
}

/// Model entry from `GET /api/tags`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
   pub name: String,
   #[serde(default)]
   pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
   /// Bahasa Indonesia
   #[default]
   Id,
   /// English
   En,
}

impl Language {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Id => "id",
         Self::En => "en",
      }
   }
}

impl fmt::Display for Language {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommitStyle {
   /// type(scope): subject
   #[default]
   Conventional,
   /// Emoji-prefixed type: subject
   Emoji,
   /// Subject and body only
   Simple,
}

impl CommitStyle {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Conventional => "conventional",
         Self::Emoji => "emoji",
         Self::Simple => "simple",
      }
   }
}

impl fmt::Display for CommitStyle {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

// CLI Args
#[derive(Parser, Debug)]
#[command(
   name = "ocommit",
   author,
   version,
   about = "Generate commit messages for staged changes using a local Ollama server"
)]
pub struct Args {
   /// Directory to run git commands in
   #[arg(long, global = true, default_value = ".")]
   pub dir: PathBuf,

   /// Path to config file (default: ~/.config/ollama-commit/config.toml)
   #[arg(long, global = true)]
   pub config: Option<PathBuf>,

   /// Increase log verbosity (-v info, -vv debug)
   #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
   pub verbose: u8,

   #[command(subcommand)]
   pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
   /// Generate a commit message for the staged changes (default)
   Generate(GenerateArgs),

   /// Check that the Ollama server is reachable and list its models
   TestConnection,

   /// Show or change configuration
   #[command(subcommand)]
   Config(ConfigCommand),
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct GenerateArgs {
   /// Output language for the commit message
   #[arg(long, short = 'l', value_enum)]
   pub language: Option<Language>,

   /// Commit message style
   #[arg(long, short = 's', value_enum)]
   pub style: Option<CommitStyle>,

   /// Ollama model to use
   #[arg(long, short = 'm')]
   pub model: Option<String>,

   /// Ollama server URL
   #[arg(long)]
   pub host: Option<String>,

   /// Sampling temperature (0.0-1.0)
   #[arg(long, short = 't')]
   pub temperature: Option<f32>,

   /// Commit without showing the preview
   #[arg(long, short = 'y')]
   pub yes: bool,

   /// Print the message without committing
   #[arg(long)]
   pub dry_run: bool,

   /// Copy the message to clipboard
   #[arg(long)]
   pub copy: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
   /// Print the effective configuration
   Show,
   /// Print the config file location
   Path,
   /// Open the config file in $EDITOR
   Edit,
   /// Set a single value, e.g. `ollama.model qwen3:8b`
   Set { key: String, value: String },
}
