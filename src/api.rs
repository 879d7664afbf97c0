use std::{thread, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
   config::OllamaConfig,
   error::{CommitGenError, Result},
   types::ModelInfo,
};

#[derive(Debug, Serialize)]
struct GenerateOptions {
   temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
   model:   &'a str,
   prompt:  &'a str,
   stream:  bool,
   options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
   #[serde(default)]
   response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
   #[serde(default)]
   models: Vec<ModelInfo>,
}

/// Blocking client for a local Ollama server
#[derive(Debug)]
pub struct OllamaClient {
   client:             reqwest::blocking::Client,
   host:               String,
   temperature:        f32,
   max_retries:        u32,
   initial_backoff_ms: u64,
}

impl OllamaClient {
   /// Build a client with timeouts from config
   pub fn new(config: &OllamaConfig) -> Result<Self> {
      let client = reqwest::blocking::Client::builder()
         .timeout(Duration::from_secs(config.request_timeout_secs))
         .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
         .build()?;

      let host = config.host.strip_suffix('/').unwrap_or(&config.host).to_string();

      Ok(Self {
         client,
         host,
         temperature: config.temperature,
         max_retries: config.max_retries,
         initial_backoff_ms: config.initial_backoff_ms,
      })
   }

   pub fn host(&self) -> &str {
      &self.host
   }

   /// Probe `GET /api/tags`; any failure reads as unreachable
   pub fn check_connection(&self) -> bool {
      match self.client.get(format!("{}/api/tags", self.host)).send() {
         Ok(response) => response.status().is_success(),
         Err(e) => {
            debug!(error = %e, host = %self.host, "connection probe failed");
            false
         },
      }
   }

   /// Installed models, or an empty list when the server can't be queried
   pub fn list_models(&self) -> Vec<ModelInfo> {
      let result = self
         .client
         .get(format!("{}/api/tags", self.host))
         .send()
         .and_then(|response| response.error_for_status())
         .and_then(|response| response.json::<TagsResponse>());

      match result {
         Ok(tags) => tags.models,
         Err(e) => {
            warn!(error = %e, "failed to list models");
            Vec::new()
         },
      }
   }

   /// Run a single non-streaming completion and return the trimmed text
   pub fn generate(&self, model: &str, prompt: &str) -> Result<String> {
      let request = GenerateRequest {
         model,
         prompt,
         stream: false,
         options: GenerateOptions { temperature: self.temperature },
      };

      retry_api_call(self.max_retries, self.initial_backoff_ms, || {
         let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()?;

         let status = response.status();
         if !status.is_success() {
            let body = response
               .text()
               .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CommitGenError::Generation { status: status.as_u16(), body });
         }

         let parsed: GenerateResponse = response.json()?;
         Ok(parsed.response.trim().to_string())
      })
   }
}

/// Retry a call with exponential backoff. Only transient errors are retried,
/// and at most `max_retries` times.
pub fn retry_api_call<F, T>(max_retries: u32, initial_backoff_ms: u64, mut f: F) -> Result<T>
where
   F: FnMut() -> Result<T>,
{
   let mut attempt = 0;

   loop {
      match f() {
         Ok(result) => return Ok(result),
         Err(e) if e.is_transient() && attempt < max_retries => {
            attempt += 1;
            let backoff_ms = initial_backoff_ms.saturating_mul(1 << (attempt - 1).min(16));
            warn!("{e} - retry {attempt}/{max_retries} after {backoff_ms}ms");
            thread::sleep(Duration::from_millis(backoff_ms));
         },
         Err(e) => return Err(e),
      }
   }
}
