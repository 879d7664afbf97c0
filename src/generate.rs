use arboard::Clipboard;
use tracing::{debug, info};

use crate::{
   analysis,
   api::OllamaClient,
   config::Config,
   diff,
   error::{CommitGenError, Result},
   git::DiffSource,
   message,
   preview::{Decision, PreviewPanel, PreviewSurface},
   style, templates,
   types::CommitMessage,
};

/// Per-run switches that don't live in config
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
   pub dry_run: bool,
   pub copy:    bool,
}

/// How a generate run ended; each variant carries the final message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
   Committed(String),
   DryRun(String),
   Cancelled(String),
}

/// Generate a message for the staged changes, then preview or commit it
pub fn run_generate(
   opts: &GenerateOptions,
   config: &Config,
   source: &mut DiffSource,
   client: &OllamaClient,
   surface: &mut impl PreviewSurface,
) -> Result<Outcome> {
   if !source.has_staged_changes()? {
      return Err(CommitGenError::NoStagedChanges);
   }

   let diff = source.staged_diff()?;
   if diff.trim().is_empty() {
      return Err(CommitGenError::NoStagedChanges);
   }

   let stats = diff::diff_stats(&diff);
   info!(
      files = stats.files_changed,
      insertions = stats.insertions,
      deletions = stats.deletions,
      backend = source.backend_name(),
      "analyzing staged changes"
   );
   style::print_info(&format!(
      "{} file(s) changed, {} {}",
      stats.files_changed,
      style::success(&format!("+{}", stats.insertions)),
      style::error(&format!("-{}", stats.deletions)),
   ));

   let changes = source.changes()?;
   for change in &changes {
      debug!("{} {}", change.status, change.path);
   }

   let prepared = diff::prepare_for_prompt(&diff, &config.app);
   let prompt = templates::render_commit_prompt(&prepared, &stats, config.app.language)?;
   debug!(chars = prompt.len(), language = %config.app.language, "rendered prompt");

   let model = &config.ollama.model;
   let raw = style::with_spinner_result(
      &format!("Generating commit message with {}", style::model(model)),
      || client.generate(model, &prompt),
   )
   .map_err(|e| match e {
      CommitGenError::HttpError(ref err) if err.is_connect() => {
         CommitGenError::ConnectionFailed { host: client.host().to_string() }
      },
      other => other,
   })?;

   let reply = message::strip_reasoning(&raw);
   let commit = if reply.is_empty() {
      style::warn("Model returned an empty response, using a message built from the changed files");
      analysis::fallback_message(&changes, &stats, config.app.language)
   } else {
      CommitMessage::parse(reply)
   };
   debug!(message = %serde_json::to_string(&commit)?, "parsed commit message");

   let rendered = commit.format(config.app.style);

   if opts.dry_run {
      println!(
         "\n{}",
         style::boxed_message("Commit Message (dry run)", &rendered, style::term_width())
      );
      if opts.copy {
         copy_with_note(&rendered);
      }
      return Ok(Outcome::DryRun(rendered));
   }

   let final_text = if config.app.auto_commit {
      rendered
   } else {
      match PreviewPanel::open(commit, config.app.style).resolve(surface)? {
         Decision::Commit(text) => text,
         Decision::Cancel => {
            println!("{}", style::dim("Commit cancelled"));
            return Ok(Outcome::Cancelled(rendered));
         },
      }
   };

   if opts.copy {
      copy_with_note(&final_text);
   }

   source.commit(&final_text)?;
   let subject = final_text.lines().next().unwrap_or_default();
   println!("{} Committed: {}", style::success(style::icons::SUCCESS), style::bold(subject));

   Ok(Outcome::Committed(final_text))
}

/// Copy text to clipboard
fn copy_to_clipboard(text: &str) -> Result<()> {
   let mut clipboard = Clipboard::new()?;
   clipboard.set_text(text)?;
   Ok(())
}

fn copy_with_note(text: &str) {
   match copy_to_clipboard(text) {
      Ok(()) => println!("{} Copied to clipboard", style::success(style::icons::SUCCESS)),
      Err(e) => println!("{}", style::dim(&format!("Note: Failed to copy to clipboard: {e}"))),
   }
}

#[cfg(test)]
mod tests {
   use std::path::Path;

   use git2::Repository;
   use tempfile::TempDir;
   use wiremock::{
      Mock, MockServer, ResponseTemplate,
      matchers::{method, path},
   };

   use super::*;
   use crate::{
      config::OllamaConfig,
      preview::{SurfaceAction, tests::ScriptedSurface},
      types::{CommitStyle, Language},
   };

   fn init_repo(files: &[(&str, &str)]) -> (TempDir, Repository) {
      let dir = tempfile::tempdir().unwrap();
      let repo = Repository::init(dir.path()).unwrap();
      {
         let mut config = repo.config().unwrap();
         config.set_str("user.name", "Test").unwrap();
         config.set_str("user.email", "test@test.com").unwrap();
         config.set_bool("commit.gpgsign", false).unwrap();
      }
      {
         let mut index = repo.index().unwrap();
         for (name, contents) in files {
            let full = dir.path().join(name);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, contents).unwrap();
            index.add_path(Path::new(name)).unwrap();
         }
         index.write().unwrap();
      }
      (dir, repo)
   }

   fn head_message(repo: &Repository) -> Option<String> {
      let head = repo.head().ok()?;
      Some(head.peel_to_commit().ok()?.message()?.to_string())
   }

   async fn mock_reply(reply: &str) -> MockServer {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/api/generate"))
         .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "qwen3:4b",
            "response": reply,
            "done": true
         })))
         .mount(&server)
         .await;
      server
   }

   fn config_for(server: &MockServer, style: CommitStyle, auto_commit: bool) -> Config {
      let mut config = Config {
         ollama: OllamaConfig { host: server.uri(), ..Default::default() },
         ..Default::default()
      };
      config.app.style = style;
      config.app.auto_commit = auto_commit;
      config.app.language = Language::En;
      config
   }

   /// Runs the whole pipeline on a blocking thread (the HTTP client is
   /// blocking)
   async fn generate_in(
      dir: &Path,
      config: Config,
      opts: GenerateOptions,
      mut surface: ScriptedSurface,
   ) -> (Result<Outcome>, ScriptedSurface) {
      let dir = dir.to_path_buf();
      tokio::task::spawn_blocking(move || {
         let mut source = DiffSource::open(&dir).unwrap();
         let client = OllamaClient::new(&config.ollama).unwrap();
         let result = run_generate(&opts, &config, &mut source, &client, &mut surface);
         (result, surface)
      })
      .await
      .unwrap()
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_preview_accept_commits() {
      let server = mock_reply("feat(parser): add lexer\n\nTokenizes input").await;
      let (dir, repo) = init_repo(&[("src/parser/lexer.rs", "pub fn lex() {}\n")]);

      let config = config_for(&server, CommitStyle::Conventional, false);
      let (result, surface) = generate_in(
         dir.path(),
         config,
         GenerateOptions::default(),
         ScriptedSurface::new(SurfaceAction::Accept),
      )
      .await;

      let expected = "feat(parser): add lexer\n\nTokenizes input";
      assert_eq!(result.unwrap(), Outcome::Committed(expected.to_string()));
      assert_eq!(surface.shown, vec![expected.to_string()]);
      assert_eq!(head_message(&repo).as_deref(), Some("feat(parser): add lexer\n\nTokenizes input\n"));
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_preview_cancel_leaves_repo_untouched() {
      let server = mock_reply("fix: x").await;
      let (dir, repo) = init_repo(&[("a.txt", "a\n")]);

      let config = config_for(&server, CommitStyle::Conventional, false);
      let (result, _) = generate_in(
         dir.path(),
         config,
         GenerateOptions::default(),
         ScriptedSurface::new(SurfaceAction::Cancel),
      )
      .await;

      assert_eq!(result.unwrap(), Outcome::Cancelled("fix: x".to_string()));
      assert!(head_message(&repo).is_none());
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_preview_edit_commits_edited_text() {
      let server = mock_reply("fix: x").await;
      let (dir, repo) = init_repo(&[("a.txt", "a\n")]);

      let config = config_for(&server, CommitStyle::Conventional, false);
      let (result, _) = generate_in(
         dir.path(),
         config,
         GenerateOptions::default(),
         ScriptedSurface::editing("fix: clearer subject"),
      )
      .await;

      assert_eq!(result.unwrap(), Outcome::Committed("fix: clearer subject".to_string()));
      assert_eq!(head_message(&repo).as_deref(), Some("fix: clearer subject\n"));
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_auto_commit_skips_preview_and_uses_style() {
      let server = mock_reply("<think>\nsmall change\n</think>\ndocs(readme): fix typo").await;
      let (dir, repo) = init_repo(&[("README.md", "# Title\n")]);

      let config = config_for(&server, CommitStyle::Emoji, true);
      let (result, surface) = generate_in(
         dir.path(),
         config,
         GenerateOptions::default(),
         ScriptedSurface::new(SurfaceAction::Cancel),
      )
      .await;

      // Auto-commit renders with the configured style, here emoji, exactly as
      // the preview would; it does not force conventional.
      let expected = "\u{1F4DD} docs: fix typo";
      assert_eq!(result.unwrap(), Outcome::Committed(expected.to_string()));
      assert!(surface.shown.is_empty());
      assert_eq!(head_message(&repo).as_deref(), Some(format!("{expected}\n").as_str()));
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_dry_run_does_not_commit() {
      let server = mock_reply("chore: tidy").await;
      let (dir, repo) = init_repo(&[("a.txt", "a\n")]);

      let config = config_for(&server, CommitStyle::Simple, true);
      let opts = GenerateOptions { dry_run: true, copy: false };
      let (result, _) =
         generate_in(dir.path(), config, opts, ScriptedSurface::new(SurfaceAction::Accept)).await;

      assert_eq!(result.unwrap(), Outcome::DryRun("tidy".to_string()));
      assert!(head_message(&repo).is_none());
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_empty_reply_falls_back_to_heuristics() {
      let server = mock_reply("   ").await;
      let (dir, _repo) = init_repo(&[("README.md", "# Guide\n")]);

      let config = config_for(&server, CommitStyle::Conventional, false);
      let opts = GenerateOptions { dry_run: true, copy: false };
      let (result, _) =
         generate_in(dir.path(), config, opts, ScriptedSurface::new(SurfaceAction::Accept)).await;

      assert_eq!(
         result.unwrap(),
         Outcome::DryRun("docs: update documentation\n\n1 file(s) changed, +1, -0".to_string())
      );
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_no_staged_changes() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/api/generate"))
         .respond_with(ResponseTemplate::new(200))
         .expect(0)
         .mount(&server)
         .await;
      let (dir, _repo) = init_repo(&[]);

      let config = config_for(&server, CommitStyle::Conventional, false);
      let (result, _) = generate_in(
         dir.path(),
         config,
         GenerateOptions::default(),
         ScriptedSurface::new(SurfaceAction::Accept),
      )
      .await;

      assert!(matches!(result, Err(CommitGenError::NoStagedChanges)));
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn test_generation_error_propagates() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/api/generate"))
         .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
         .mount(&server)
         .await;
      let (dir, repo) = init_repo(&[("a.txt", "a\n")]);

      let config = config_for(&server, CommitStyle::Conventional, false);
      let (result, _) = generate_in(
         dir.path(),
         config,
         GenerateOptions::default(),
         ScriptedSurface::new(SurfaceAction::Accept),
      )
      .await;

      assert!(matches!(result, Err(CommitGenError::Generation { status: 404, .. })));
      assert!(head_message(&repo).is_none());
   }

   #[test]
   fn test_unreachable_server_reports_connection_failed() {
      // Bind then release a port so nothing is listening on it
      let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
      let host = format!("http://127.0.0.1:{port}");
      let (dir, repo) = init_repo(&[("a.txt", "a\n")]);

      let mut config = Config {
         ollama: OllamaConfig { host: host.clone(), ..Default::default() },
         ..Default::default()
      };
      config.app.language = Language::En;

      let mut source = DiffSource::open(dir.path()).unwrap();
      let client = OllamaClient::new(&config.ollama).unwrap();
      let mut surface = ScriptedSurface::new(SurfaceAction::Accept);
      let result =
         run_generate(&GenerateOptions::default(), &config, &mut source, &client, &mut surface);

      match result {
         Err(CommitGenError::ConnectionFailed { host: reported }) => assert_eq!(reported, host),
         other => panic!("expected ConnectionFailed, got {other:?}"),
      }
      assert!(surface.shown.is_empty());
      assert!(head_message(&repo).is_none());
   }
}
