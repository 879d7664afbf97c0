use tracing::info;

use crate::{
   api::OllamaClient,
   config::Config,
   error::{CommitGenError, Result},
   style,
   types::ModelInfo,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Size in megabytes with one decimal, e.g. `2498.5 MB`
pub fn format_size_mb(bytes: u64) -> String {
   format!("{:.1} MB", bytes as f64 / BYTES_PER_MB)
}

/// Probe the server, list its models and check the configured one is there
pub fn run_test_connection(config: &Config, client: &OllamaClient) -> Result<Vec<ModelInfo>> {
   println!("{}", style::section_header("Ollama Connection", style::term_width().min(60)));
   println!("  Host:  {}", style::info(client.host()));
   println!("  Model: {}", style::model(&config.ollama.model));
   println!();

   let reachable = style::with_spinner(&format!("Connecting to {}", client.host()), || {
      client.check_connection()
   });

   if !reachable {
      eprintln!("{} Cannot reach Ollama at {}", style::error(style::icons::ERROR), client.host());
      eprintln!("\nPossible solutions:");
      for hint in [
         "Make sure Ollama is installed: https://ollama.com/download",
         "Start the server with `ollama serve`",
         "Check `ollama.host` with `ocommit config show` or set OLLAMA_HOST",
      ] {
         eprintln!("  {} {hint}", style::icons::BULLET);
      }
      return Err(CommitGenError::ConnectionFailed { host: client.host().to_string() });
   }

   let models = client.list_models();
   info!(count = models.len(), "listed models");

   println!("\n{} ({}):", style::bold("Available models"), models.len());
   for model in &models {
      println!(
         "  {} {} {}",
         style::icons::BULLET,
         style::model(&model.name),
         style::dim(&format!("({})", format_size_mb(model.size)))
      );
   }

   if !models.iter().any(|m| m.name == config.ollama.model) {
      style::warn(&format!(
         "Model '{}' is not installed. Pull it with `ollama pull {}`",
         config.ollama.model, config.ollama.model
      ));
   }

   println!("\n{} Connection OK", style::success(style::icons::SUCCESS));
   Ok(models)
}
