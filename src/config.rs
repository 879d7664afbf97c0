use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
   error::{CommitGenError, Result},
   types::{CommitStyle, Language},
};

/// Per-repository config file, looked up from the working directory up to the
/// repository root
pub const PROJECT_CONFIG_NAME: &str = ".ollama-commit.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub ollama: OllamaConfig,
   pub app:    AppConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
   /// Base URL of the Ollama server
   pub host:        String,
   pub model:       String,
   pub temperature: f32,

   /// HTTP request timeout in seconds
   pub request_timeout_secs: u64,

   /// HTTP connection timeout in seconds
   pub connect_timeout_secs: u64,

   /// Extra attempts for a failed generation request (0 disables retrying)
   pub max_retries:        u32,
   pub initial_backoff_ms: u64,
}

impl Default for OllamaConfig {
   fn default() -> Self {
      Self {
         host:                 "http://localhost:11434".to_string(),
         model:                "qwen3:4b".to_string(),
         temperature:          0.7,
         request_timeout_secs: 120,
         connect_timeout_secs: 10,
         max_retries:          0,
         initial_backoff_ms:   1000,
      }
   }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
   pub language:    Language,
   pub style:       CommitStyle,
   pub auto_commit: bool,

   /// Diff characters sent to the model; longer diffs are cut at a line
   /// boundary
   pub max_diff_length: usize,

   /// Files sent to the model (0 = no limit)
   pub max_files: usize,

   /// Mask password/token/secret assignments before they leave the machine
   pub redact_secrets: bool,
}

impl Default for AppConfig {
   fn default() -> Self {
      Self {
         language:        Language::Id,
         style:           CommitStyle::Conventional,
         auto_commit:     false,
         max_diff_length: 12000,
         max_files:       10,
         redact_secrets:  true,
      }
   }
}

/// Keys accepted by `config set`
pub const SETTABLE_KEYS: &[&str] = &[
   "ollama.host",
   "ollama.model",
   "ollama.temperature",
   "ollama.request_timeout_secs",
   "ollama.connect_timeout_secs",
   "ollama.max_retries",
   "app.language",
   "app.style",
   "app.auto_commit",
   "app.max_diff_length",
   "app.max_files",
   "app.redact_secrets",
];

impl Config {
   /// Load the effective config for a working directory.
   ///
   /// Layers, lowest precedence first: defaults, user file
   /// (`explicit` > `OLLAMA_COMMIT_CONFIG` > `~/.config/ollama-commit/config.toml`),
   /// project file, environment variables.
   pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
      let mut layered = toml::Table::new();

      match explicit {
         Some(path) => merge_tables(&mut layered, read_table(path)?),
         None => {
            let user_path = Self::user_config_path()?;
            if user_path.exists() {
               merge_tables(&mut layered, read_table(&user_path)?);
            }
         },
      }

      if let Some(project_path) = find_project_config(dir) {
         debug!(path = %project_path.display(), "applying project config");
         merge_tables(&mut layered, read_table(&project_path)?);
      }

      let mut config: Self = toml::Value::Table(layered).try_into()?;
      config.apply_env_overrides(|key| std::env::var(key).ok());
      config.normalize();
      Ok(config)
   }

   /// Load config from a single file, without other layers
   pub fn from_file(path: &Path) -> Result<Self> {
      let mut config: Self = toml::Value::Table(read_table(path)?).try_into()?;
      config.normalize();
      Ok(config)
   }

   /// Write config as TOML, creating parent directories
   pub fn save(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         std::fs::create_dir_all(parent)?;
      }
      std::fs::write(path, self.to_toml()?)?;
      Ok(())
   }

   pub fn to_toml(&self) -> Result<String> {
      Ok(toml::to_string_pretty(self)?)
   }

   /// Apply environment variable overrides. Unparseable values are skipped.
   pub fn apply_env_overrides<F>(&mut self, lookup: F)
   where
      F: Fn(&str) -> Option<String>,
   {
      if let Some(host) = lookup("OLLAMA_HOST") {
         self.ollama.host = host;
      }
      if let Some(model) = lookup("OLLAMA_MODEL") {
         self.ollama.model = model;
      }
      if let Some(raw) = lookup("OLLAMA_TEMPERATURE") {
         match raw.trim().parse() {
            Ok(temp) => self.ollama.temperature = temp,
            Err(_) => warn!("ignoring OLLAMA_TEMPERATURE={raw:?}: not a number"),
         }
      }
      if let Some(raw) = lookup("OLLAMA_TIMEOUT") {
         match raw.trim().parse() {
            Ok(secs) => self.ollama.request_timeout_secs = secs,
            Err(_) => warn!("ignoring OLLAMA_TIMEOUT={raw:?}: not a whole number of seconds"),
         }
      }
      if let Some(raw) = lookup("OLLAMA_COMMIT_LANGUAGE") {
         match Language::from_str(raw.trim(), true) {
            Ok(language) => self.app.language = language,
            Err(_) => warn!("ignoring OLLAMA_COMMIT_LANGUAGE={raw:?}: expected id or en"),
         }
      }
      if let Some(raw) = lookup("OLLAMA_COMMIT_STYLE") {
         match CommitStyle::from_str(raw.trim(), true) {
            Ok(style) => self.app.style = style,
            Err(_) => warn!("ignoring OLLAMA_COMMIT_STYLE={raw:?}"),
         }
      }
      if let Some(raw) = lookup("OLLAMA_COMMIT_AUTO_COMMIT") {
         match parse_bool(&raw) {
            Some(auto_commit) => self.app.auto_commit = auto_commit,
            None => warn!("ignoring OLLAMA_COMMIT_AUTO_COMMIT={raw:?}: expected true or false"),
         }
      }
   }

   /// Set a single dotted key from its string form
   pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
      let value = value.trim();
      match key {
         "ollama.host" => self.ollama.host = value.to_string(),
         "ollama.model" => self.ollama.model = value.to_string(),
         "ollama.temperature" => {
            let temp: f32 = parse_field(key, value)?;
            if !(0.0..=1.0).contains(&temp) {
               return Err(CommitGenError::Config(format!(
                  "temperature {temp} out of range [0.0, 1.0]"
               )));
            }
            self.ollama.temperature = temp;
         },
         "ollama.request_timeout_secs" => self.ollama.request_timeout_secs = parse_field(key, value)?,
         "ollama.connect_timeout_secs" => self.ollama.connect_timeout_secs = parse_field(key, value)?,
         "ollama.max_retries" => self.ollama.max_retries = parse_field(key, value)?,
         "app.language" => {
            self.app.language = Language::from_str(value, true)
               .map_err(|_| CommitGenError::Config(format!("{key}: expected id or en")))?;
         },
         "app.style" => {
            self.app.style = CommitStyle::from_str(value, true).map_err(|_| {
               CommitGenError::Config(format!("{key}: expected conventional, emoji or simple"))
            })?;
         },
         "app.auto_commit" => self.app.auto_commit = parse_field(key, value)?,
         "app.max_diff_length" => self.app.max_diff_length = parse_field(key, value)?,
         "app.max_files" => self.app.max_files = parse_field(key, value)?,
         "app.redact_secrets" => self.app.redact_secrets = parse_field(key, value)?,
         _ => {
            return Err(CommitGenError::Config(format!(
               "unknown key '{key}' (expected one of: {})",
               SETTABLE_KEYS.join(", ")
            )));
         },
      }
      self.normalize();
      Ok(())
   }

   /// Resolve the user config path: `OLLAMA_COMMIT_CONFIG`, else the default
   /// location
   pub fn user_config_path() -> Result<PathBuf> {
      if let Ok(custom_path) = std::env::var("OLLAMA_COMMIT_CONFIG") {
         return Ok(PathBuf::from(custom_path));
      }
      Ok(Self::config_dir()?.join("config.toml"))
   }

   /// Get config directory (platform-safe)
   /// Tries HOME (Unix/Linux/macOS) then USERPROFILE (Windows)
   pub fn config_dir() -> Result<PathBuf> {
      std::env::var("HOME")
         .or_else(|_| std::env::var("USERPROFILE"))
         .map(|home| PathBuf::from(home).join(".config").join("ollama-commit"))
         .map_err(|_| {
            CommitGenError::Config("No home directory found (tried HOME and USERPROFILE)".to_string())
         })
   }

   fn normalize(&mut self) {
      self.ollama.host = normalize_host(&self.ollama.host);
   }
}

pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Trim whitespace and one trailing slash. A host without a scheme gets
/// `http://` and, when it names no port, Ollama's default port; an explicit
/// scheme keeps its own default.
pub fn normalize_host(host: &str) -> String {
   let host = host.trim();
   let host = host.strip_suffix('/').unwrap_or(host);
   if host.contains("://") {
      return host.to_string();
   }

   let (authority, path) = host.split_at(host.find('/').unwrap_or(host.len()));
   let authority = if authority.starts_with(':') {
      format!("127.0.0.1{authority}")
   } else if has_port(authority) {
      authority.to_string()
   } else {
      format!("{}:{DEFAULT_OLLAMA_PORT}", if authority.is_empty() { "127.0.0.1" } else { authority })
   };
   format!("http://{authority}{path}")
}

fn has_port(authority: &str) -> bool {
   match authority.rsplit_once(']') {
      // [::1]:11434
      Some((_, rest)) => rest.starts_with(':'),
      None => authority.contains(':'),
   }
}

fn parse_bool(raw: &str) -> Option<bool> {
   match raw.trim().to_lowercase().as_str() {
      "true" | "1" | "yes" | "on" => Some(true),
      "false" | "0" | "no" | "off" => Some(false),
      _ => None,
   }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
   value
      .parse()
      .map_err(|_| CommitGenError::Config(format!("invalid value '{value}' for {key}")))
}

fn read_table(path: &Path) -> Result<toml::Table> {
   let contents = std::fs::read_to_string(path).map_err(|e| {
      CommitGenError::Config(format!("Failed to read config {}: {e}", path.display()))
   })?;
   Ok(toml::from_str(&contents)?)
}

/// Recursively overlay `overlay` onto `base`; nested tables merge, other values
/// replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
   for (key, value) in overlay {
      match (base.get_mut(&key), value) {
         (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
            merge_tables(existing, incoming);
         },
         (_, value) => {
            base.insert(key, value);
         },
      }
   }
}

/// Walk up from `dir` looking for the project config, stopping at the
/// repository root
fn find_project_config(dir: &Path) -> Option<PathBuf> {
   let start = dir.canonicalize().ok()?;
   for ancestor in start.ancestors() {
      let candidate = ancestor.join(PROJECT_CONFIG_NAME);
      if candidate.is_file() {
         return Some(candidate);
      }
      if ancestor.join(".git").exists() {
         break;
      }
   }
   None
}

#[cfg(test)]
mod tests {
   use std::collections::HashMap;

   use super::*;

   fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
      let map: HashMap<String, String> = pairs
         .iter()
         .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
         .collect();
      move |key| map.get(key).cloned()
   }

   #[test]
   fn test_defaults() {
      let config = Config::default();
      assert_eq!(config.ollama.host, "http://localhost:11434");
      assert_eq!(config.ollama.model, "qwen3:4b");
      assert_eq!(config.ollama.temperature, 0.7);
      assert_eq!(config.ollama.max_retries, 0);
      assert_eq!(config.app.language, Language::Id);
      assert_eq!(config.app.style, CommitStyle::Conventional);
      assert!(!config.app.auto_commit);
   }

   #[test]
   fn test_partial_file_keeps_defaults() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      std::fs::write(&path, "[app]\nstyle = \"emoji\"\n").unwrap();

      let config = Config::from_file(&path).unwrap();
      assert_eq!(config.app.style, CommitStyle::Emoji);
      assert_eq!(config.app.language, Language::Id);
      assert_eq!(config.ollama.model, "qwen3:4b");
   }

   #[test]
   fn test_invalid_style_in_file_is_error() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      std::fs::write(&path, "[app]\nstyle = \"fancy\"\n").unwrap();
      assert!(matches!(Config::from_file(&path), Err(CommitGenError::TomlDe(_))));
   }

   #[test]
   fn test_project_config_overrides_user_config() {
      let home = tempfile::tempdir().unwrap();
      let user = home.path().join("user.toml");
      std::fs::write(
         &user,
         "[ollama]\nmodel = \"llama3\"\nhost = \"http://gpu-box:11434/\"\n[app]\nlanguage = \"en\"\n",
      )
      .unwrap();

      let repo = tempfile::tempdir().unwrap();
      std::fs::create_dir(repo.path().join(".git")).unwrap();
      std::fs::write(repo.path().join(PROJECT_CONFIG_NAME), "[ollama]\nmodel = \"qwen3:8b\"\n")
         .unwrap();
      let nested = repo.path().join("src");
      std::fs::create_dir(&nested).unwrap();

      temp_env::with_vars_unset(
         [
            "OLLAMA_HOST",
            "OLLAMA_MODEL",
            "OLLAMA_TEMPERATURE",
            "OLLAMA_TIMEOUT",
            "OLLAMA_COMMIT_LANGUAGE",
            "OLLAMA_COMMIT_STYLE",
            "OLLAMA_COMMIT_AUTO_COMMIT",
         ],
         || {
            let config = Config::load(&nested, Some(user.as_path())).unwrap();
            assert_eq!(config.ollama.model, "qwen3:8b");
            assert_eq!(config.ollama.host, "http://gpu-box:11434");
            assert_eq!(config.app.language, Language::En);
         },
      );
   }

   #[test]
   fn test_project_lookup_stops_at_repo_root() {
      let outer = tempfile::tempdir().unwrap();
      std::fs::write(outer.path().join(PROJECT_CONFIG_NAME), "[app]\nstyle = \"simple\"\n").unwrap();
      let repo = outer.path().join("repo");
      std::fs::create_dir_all(repo.join(".git")).unwrap();

      assert_eq!(find_project_config(&repo), None);
   }

   #[test]
   fn test_explicit_missing_file_is_error() {
      let dir = tempfile::tempdir().unwrap();
      let missing = dir.path().join("nope.toml");
      assert!(matches!(
         Config::load(dir.path(), Some(missing.as_path())),
         Err(CommitGenError::Config(_))
      ));
   }

   #[test]
   fn test_env_overrides() {
      let mut config = Config::default();
      config.apply_env_overrides(lookup_from(&[
         ("OLLAMA_HOST", "http://10.0.0.2:11434"),
         ("OLLAMA_MODEL", "mistral"),
         ("OLLAMA_TEMPERATURE", "0.2"),
         ("OLLAMA_TIMEOUT", "30"),
         ("OLLAMA_COMMIT_LANGUAGE", "EN"),
         ("OLLAMA_COMMIT_STYLE", "simple"),
         ("OLLAMA_COMMIT_AUTO_COMMIT", "yes"),
      ]));

      assert_eq!(config.ollama.host, "http://10.0.0.2:11434");
      assert_eq!(config.ollama.model, "mistral");
      assert_eq!(config.ollama.temperature, 0.2);
      assert_eq!(config.ollama.request_timeout_secs, 30);
      assert_eq!(config.app.language, Language::En);
      assert_eq!(config.app.style, CommitStyle::Simple);
      assert!(config.app.auto_commit);
   }

   #[test]
   fn test_env_overrides_skip_garbage() {
      let mut config = Config::default();
      config.app.auto_commit = true;
      config.apply_env_overrides(lookup_from(&[
         ("OLLAMA_TEMPERATURE", "warm"),
         ("OLLAMA_COMMIT_LANGUAGE", "fr"),
         ("OLLAMA_COMMIT_AUTO_COMMIT", "enabled"),
      ]));

      assert_eq!(config.ollama.temperature, 0.7);
      assert_eq!(config.app.language, Language::Id);
      assert!(config.app.auto_commit);
   }

   #[test]
   fn test_env_auto_commit_can_be_switched_off() {
      let mut config = Config::default();
      config.app.auto_commit = true;
      config.apply_env_overrides(lookup_from(&[("OLLAMA_COMMIT_AUTO_COMMIT", " Off ")]));
      assert!(!config.app.auto_commit);

      assert_eq!(parse_bool("0"), Some(false));
      assert_eq!(parse_bool("YES"), Some(true));
      assert_eq!(parse_bool("nah"), None);
   }

   #[test]
   fn test_normalize_host() {
      assert_eq!(normalize_host("http://localhost:11434/"), "http://localhost:11434");
      assert_eq!(normalize_host(" https://ollama.example.com "), "https://ollama.example.com");
      assert_eq!(normalize_host("127.0.0.1:11434"), "http://127.0.0.1:11434");
      assert_eq!(normalize_host("http://box"), "http://box");
   }

   #[test]
   fn test_normalize_host_defaults_ollama_port() {
      assert_eq!(normalize_host("0.0.0.0"), "http://0.0.0.0:11434");
      assert_eq!(normalize_host("127.0.0.1/"), "http://127.0.0.1:11434");
      assert_eq!(normalize_host("gpu-box"), "http://gpu-box:11434");
      assert_eq!(normalize_host(":8080"), "http://127.0.0.1:8080");
      assert_eq!(normalize_host("[::1]"), "http://[::1]:11434");
      assert_eq!(normalize_host("[::1]:9000"), "http://[::1]:9000");
      assert_eq!(normalize_host("box/ollama"), "http://box:11434/ollama");
   }

   #[test]
   fn test_set_value() {
      let mut config = Config::default();
      config.set_value("ollama.model", "qwen3:8b").unwrap();
      config.set_value("ollama.host", "http://box:11434/").unwrap();
      config.set_value("app.style", "Emoji").unwrap();
      config.set_value("app.auto_commit", "true").unwrap();
      config.set_value("app.max_files", "3").unwrap();

      assert_eq!(config.ollama.model, "qwen3:8b");
      assert_eq!(config.ollama.host, "http://box:11434");
      assert_eq!(config.app.style, CommitStyle::Emoji);
      assert!(config.app.auto_commit);
      assert_eq!(config.app.max_files, 3);
   }

   #[test]
   fn test_set_value_rejects_bad_input() {
      let mut config = Config::default();
      assert!(config.set_value("ollama.temperature", "1.5").is_err());
      assert!(config.set_value("ollama.max_retries", "-1").is_err());
      assert!(config.set_value("app.language", "de").is_err());
      assert!(config.set_value("app.colour", "blue").is_err());
      assert_eq!(config, Config::default());
   }

   #[test]
   fn test_save_and_reload() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("nested").join("config.toml");
      let mut config = Config::default();
      config.set_value("app.language", "en").unwrap();
      config.save(&path).unwrap();

      assert_eq!(Config::from_file(&path).unwrap(), config);
   }
}
