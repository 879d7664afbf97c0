use std::path::PathBuf;

use rust_embed::RustEmbed;
use tera::{Context, Tera};

use crate::{
   config::Config,
   error::{CommitGenError, Result},
   message::COMMIT_TYPES,
   types::{DiffStats, Language},
};

/// Embedded prompts folder (compiled into binary)
#[derive(RustEmbed)]
#[folder = "prompts/"]
struct Prompts;

/// User prompt overrides live in `~/.config/ollama-commit/prompts/`
fn get_user_prompts_dir() -> Option<PathBuf> {
   Config::config_dir().ok().map(|dir| dir.join("prompts"))
}

/// Template bundled with the binary
pub fn embedded_template(category: &str, variant: &str) -> Result<String> {
   let embedded_key = format!("{category}/{variant}.md");
   let bytes = Prompts::get(&embedded_key).ok_or_else(|| {
      CommitGenError::Other(format!(
         "Template variant '{variant}' in category '{category}' not found as user override or \
          embedded default"
      ))
   })?;

   std::str::from_utf8(bytes.data.as_ref())
      .map(|s| s.to_string())
      .map_err(|e| {
         CommitGenError::Other(format!("Embedded template {embedded_key} is not valid UTF-8: {e}"))
      })
}

/// Load template content, preferring a user-provided file
fn load_template_file(category: &str, variant: &str) -> Result<String> {
   if let Some(prompts_dir) = get_user_prompts_dir() {
      let template_path = prompts_dir.join(category).join(format!("{variant}.md"));
      if template_path.exists() {
         tracing::debug!(path = %template_path.display(), "using user prompt template");
         return std::fs::read_to_string(&template_path).map_err(|e| {
            CommitGenError::Other(format!(
               "Failed to read template file {}: {}",
               template_path.display(),
               e
            ))
         });
      }
   }

   embedded_template(category, variant)
}

/// Render a commit prompt template with diff and stats
pub fn render_template(template: &str, diff: &str, stats: &DiffStats) -> Result<String> {
   let mut context = Context::new();
   context.insert("diff", diff);
   context.insert("files_changed", &stats.files_changed);
   context.insert("insertions", &stats.insertions);
   context.insert("deletions", &stats.deletions);
   context.insert("allowed_types", &COMMIT_TYPES.join(", "));

   // No auto-escaping: the output is plain text for the model
   Ok(Tera::one_off(template, &context, false)?)
}

/// Render the commit prompt for the given language
pub fn render_commit_prompt(diff: &str, stats: &DiffStats, language: Language) -> Result<String> {
   let template = load_template_file("commit", language.as_str())?;
   render_template(&template, diff, stats)
}
