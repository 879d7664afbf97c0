use std::{
   path::{Path, PathBuf},
   process::ExitCode,
};

use clap::Parser;
use dialoguer::Editor;
use ollama_commit::{
   api::OllamaClient,
   config::{Config, normalize_host},
   connection::run_test_connection,
   error::{CommitGenError, Result},
   generate::{GenerateOptions, Outcome, run_generate},
   git::DiffSource,
   preview::TerminalSurface,
   style,
   types::{Args, Command, ConfigCommand, GenerateArgs},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// `OLLAMA_COMMIT_LOG` wins over `-v`
fn init_logging(verbose: u8) {
   let filter = EnvFilter::try_from_env("OLLAMA_COMMIT_LOG").unwrap_or_else(|_| {
      let level = match verbose {
         0 => "warn",
         1 => "info",
         _ => "debug",
      };
      EnvFilter::new(format!("warn,ollama_commit={level},ocommit={level}"))
   });

   tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .with_target(false)
      .init();
}

/// Apply CLI overrides to config
fn apply_cli_overrides(config: &mut Config, args: &GenerateArgs) {
   if let Some(language) = args.language {
      config.app.language = language;
   }
   if let Some(style) = args.style {
      config.app.style = style;
   }
   if let Some(ref model) = args.model {
      config.ollama.model.clone_from(model);
   }
   if let Some(ref host) = args.host {
      config.ollama.host = normalize_host(host);
   }
   if let Some(temp) = args.temperature {
      if (0.0..=1.0).contains(&temp) {
         config.ollama.temperature = temp;
      } else {
         style::warn(&format!(
            "Temperature {temp} out of range [0.0, 1.0], using {}",
            config.ollama.temperature
         ));
      }
   }
   if args.yes {
      config.app.auto_commit = true;
   }
}

/// File that `config path|edit|set` operate on
fn target_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
   explicit.map_or_else(Config::user_config_path, |path| Ok(path.to_path_buf()))
}

fn run_config_command(cmd: ConfigCommand, dir: &Path, explicit: Option<&Path>) -> Result<()> {
   match cmd {
      ConfigCommand::Show => {
         let config = Config::load(dir, explicit)?;
         print!("{}", config.to_toml()?);
      },
      ConfigCommand::Path => {
         println!("{}", target_config_path(explicit)?.display());
      },
      ConfigCommand::Edit => {
         let path = target_config_path(explicit)?;
         let current = if path.exists() {
            std::fs::read_to_string(&path)?
         } else {
            Config::default().to_toml()?
         };

         let Some(edited) = Editor::new().extension(".toml").edit(&current)? else {
            println!("{}", style::dim("No changes saved"));
            return Ok(());
         };

         // Reject anything that wouldn't load next time
         toml::from_str::<Config>(&edited)?;

         if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
         }
         std::fs::write(&path, edited)?;
         println!("{} Saved {}", style::success(style::icons::SUCCESS), path.display());
      },
      ConfigCommand::Set { key, value } => {
         let path = target_config_path(explicit)?;
         let mut config = if path.exists() {
            Config::from_file(&path)?
         } else {
            Config::default()
         };
         config.set_value(&key, &value)?;
         config.save(&path)?;
         println!(
            "{} {} = {} {}",
            style::success(style::icons::SUCCESS),
            style::bold(&key),
            value.trim(),
            style::dim(&format!("({})", path.display()))
         );
      },
   }
   Ok(())
}

fn run(args: Args) -> Result<()> {
   let Args { dir, config: config_path, command, .. } = args;

   match command.unwrap_or_else(|| Command::Generate(GenerateArgs::default())) {
      Command::Generate(gen_args) => {
         let mut config = Config::load(&dir, config_path.as_deref())?;
         apply_cli_overrides(&mut config, &gen_args);
         debug!(?config, "effective config");

         let mut source = DiffSource::open(&dir)?;
         let client = OllamaClient::new(&config.ollama)?;
         let opts = GenerateOptions { dry_run: gen_args.dry_run, copy: gen_args.copy };

         let outcome =
            run_generate(&opts, &config, &mut source, &client, &mut TerminalSurface::new())?;
         if let Outcome::DryRun(_) = outcome {
            println!("{}", style::dim("Dry run, nothing committed"));
         }
         Ok(())
      },
      Command::TestConnection => {
         let config = Config::load(&dir, config_path.as_deref())?;
         let client = OllamaClient::new(&config.ollama)?;
         run_test_connection(&config, &client).map(|_| ())
      },
      Command::Config(cmd) => run_config_command(cmd, &dir, config_path.as_deref()),
   }
}

fn main() -> ExitCode {
   dotenvy::dotenv().ok();
   let args = Args::parse();
   init_logging(args.verbose);

   match run(args) {
      Ok(()) => ExitCode::SUCCESS,
      Err(e) => {
         eprintln!("{} {}", style::error(style::icons::ERROR), style::error(&e.to_string()));
         if let CommitGenError::ConnectionFailed { .. } = e {
            eprintln!("{}", style::dim("Run `ocommit test-connection` for details"));
         }
         ExitCode::FAILURE
      },
   }
}
