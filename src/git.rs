use std::{
   path::{Path, PathBuf},
   process::{Command, Output},
};

use git2::{Delta, Diff, DiffFormat, ErrorCode, Repository, Tree};
use tracing::{debug, warn};

use crate::{
   diff,
   error::{CommitGenError, Result},
   types::{ChangeStatus, DiffStats, FileChange},
};

/// Hooks that `git commit` runs and libgit2 does not
const COMMIT_HOOKS: &[&str] = &["pre-commit", "prepare-commit-msg", "commit-msg", "post-commit"];

enum Backend {
   Libgit(Repository),
   Cli,
}

/// Staged changes of one repository.
///
/// Starts on libgit2 when the repository can be opened in-process. The first
/// libgit2 failure switches the source to the `git` executable for the rest of
/// its lifetime.
pub struct DiffSource {
   backend: Backend,
   workdir: PathBuf,
}

impl DiffSource {
   /// Open the repository containing `dir`
   pub fn open(dir: &Path) -> Result<Self> {
      match Repository::discover(dir) {
         Ok(repo) => {
            if let Some(workdir) = repo.workdir().map(Path::to_path_buf) {
               debug!(workdir = %workdir.display(), "opened repository with libgit2");
               return Ok(Self { backend: Backend::Libgit(repo), workdir });
            }
            debug!("repository has no work tree, trying git CLI");
         },
         Err(e) => debug!(error = %e, "libgit2 discovery failed, trying git CLI"),
      }

      let workdir = cli_toplevel(dir)?;
      debug!(workdir = %workdir.display(), "using git CLI");
      Ok(Self { backend: Backend::Cli, workdir })
   }

   pub fn backend_name(&self) -> &'static str {
      match self.backend {
         Backend::Libgit(_) => "libgit2",
         Backend::Cli => "git-cli",
      }
   }

   pub fn workdir(&self) -> &Path {
      &self.workdir
   }

   /// Unified diff of the index against HEAD
   pub fn staged_diff(&mut self) -> Result<String> {
      self.run("staged diff", libgit_staged_diff, cli_staged_diff)
   }

   pub fn diff_stats(&mut self) -> Result<DiffStats> {
      Ok(diff::diff_stats(&self.staged_diff()?))
   }

   pub fn changes(&mut self) -> Result<Vec<FileChange>> {
      self.run("changed files", libgit_changes, cli_changes)
   }

   pub fn has_staged_changes(&mut self) -> Result<bool> {
      self.run("staged check", libgit_has_staged, cli_has_staged)
   }

   /// Commit the index with `message`
   pub fn commit(&mut self, message: &str) -> Result<()> {
      if message.trim().is_empty() {
         return Err(CommitGenError::CommitFailed("empty commit message".to_string()));
      }

      if let Backend::Libgit(repo) = &self.backend
         && needs_cli_commit(repo)
      {
         debug!("commit hooks or signing configured, committing with git CLI");
         return cli_commit(&self.workdir, message);
      }

      self.run("commit", |repo| libgit_commit(repo, message), |dir| cli_commit(dir, message))
   }

   /// Run `lib` on the libgit2 backend, or `cli` once the source has fallen
   /// back
   fn run<T>(
      &mut self,
      op: &str,
      lib: impl FnOnce(&Repository) -> Result<T>,
      cli: impl FnOnce(&Path) -> Result<T>,
   ) -> Result<T> {
      if let Backend::Libgit(repo) = &self.backend {
         match lib(repo) {
            Ok(value) => return Ok(value),
            Err(e) => warn!("libgit2 failed during {op} ({e}), falling back to git CLI"),
         }
         self.backend = Backend::Cli;
      }
      cli(&self.workdir)
   }
}

// === libgit2 strategy ===

/// HEAD tree, or `None` on an unborn branch
fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>> {
   match repo.head() {
      Ok(head) => Ok(Some(head.peel_to_tree()?)),
      Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => Ok(None),
      Err(e) => Err(e.into()),
   }
}

fn staged(repo: &Repository) -> Result<Diff<'_>> {
   let tree = head_tree(repo)?;
   let mut diff = repo.diff_tree_to_index(tree.as_ref(), None, None)?;
   diff.find_similar(None)?;
   Ok(diff)
}

fn libgit_staged_diff(repo: &Repository) -> Result<String> {
   let diff = staged(repo)?;
   let mut buf = Vec::new();
   diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
      let origin = line.origin();
      if matches!(origin, '+' | '-' | ' ') {
         buf.push(origin as u8);
      }
      buf.extend_from_slice(line.content());
      true
   })?;
   Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn libgit_changes(repo: &Repository) -> Result<Vec<FileChange>> {
   let diff = staged(repo)?;
   let changes = diff
      .deltas()
      .filter_map(|delta| {
         let path = delta.new_file().path().or_else(|| delta.old_file().path())?;
         Some(FileChange {
            path:   path.to_string_lossy().into_owned(),
            status: delta_status(delta.status()),
         })
      })
      .collect();
   Ok(changes)
}

fn delta_status(delta: Delta) -> ChangeStatus {
   match delta {
      Delta::Added => ChangeStatus::Added,
      Delta::Modified => ChangeStatus::Modified,
      Delta::Deleted => ChangeStatus::Deleted,
      Delta::Renamed => ChangeStatus::Renamed,
      Delta::Copied => ChangeStatus::Copied,
      Delta::Typechange => ChangeStatus::TypeChanged,
      Delta::Conflicted => ChangeStatus::Unmerged,
      other => ChangeStatus::Unknown(format!("{other:?}")),
   }
}

fn libgit_has_staged(repo: &Repository) -> Result<bool> {
   Ok(staged(repo)?.deltas().len() > 0)
}

fn libgit_commit(repo: &Repository, message: &str) -> Result<()> {
   // Same cleanup `git commit -m` applies; comments are kept
   let message = git2::message_prettify(message, None)?;

   let tree_id = repo.index()?.write_tree()?;
   let tree = repo.find_tree(tree_id)?;
   let sig = repo.signature()?;

   let parent = match repo.head() {
      Ok(head) => Some(head.peel_to_commit()?),
      Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
      Err(e) => return Err(e.into()),
   };
   let parents: Vec<&git2::Commit> = parent.iter().collect();

   let oid = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?;
   debug!(%oid, "created commit with libgit2");
   Ok(())
}

/// libgit2 can neither run hooks nor sign
fn needs_cli_commit(repo: &Repository) -> bool {
   let config = repo.config().ok();

   if config
      .as_ref()
      .and_then(|c| c.get_bool("commit.gpgsign").ok())
      .unwrap_or(false)
   {
      return true;
   }

   let hooks_dir = config
      .and_then(|c| c.get_path("core.hooksPath").ok())
      .map(|path| match repo.workdir() {
         Some(workdir) if path.is_relative() => workdir.join(path),
         _ => path,
      })
      .unwrap_or_else(|| repo.path().join("hooks"));

   COMMIT_HOOKS.iter().any(|hook| hooks_dir.join(hook).is_file())
}

// === git CLI strategy ===

fn git(dir: &Path, args: &[&str]) -> Result<Output> {
   Command::new("git")
      .args(args)
      .current_dir(dir)
      .output()
      .map_err(|e| CommitGenError::GitError(format!("Failed to run git {}: {e}", args.join(" "))))
}

fn git_stdout(dir: &Path, args: &[&str]) -> Result<String> {
   let output = git(dir, args)?;
   if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CommitGenError::GitError(format!(
         "git {} failed: {}",
         args.join(" "),
         stderr.trim()
      )));
   }
   Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn cli_toplevel(dir: &Path) -> Result<PathBuf> {
   let no_repo = || CommitGenError::NoRepository { dir: dir.display().to_string() };
   let output = git(dir, &["rev-parse", "--show-toplevel"]).map_err(|_| no_repo())?;
   if !output.status.success() {
      return Err(no_repo());
   }
   let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
   if toplevel.is_empty() {
      return Err(no_repo());
   }
   Ok(PathBuf::from(toplevel))
}

// User config must not leak colour codes or external diff tools into the patch
fn cli_staged_diff(dir: &Path) -> Result<String> {
   git_stdout(dir, &["diff", "--cached", "--no-color", "--no-ext-diff"])
}

fn cli_changes(dir: &Path) -> Result<Vec<FileChange>> {
   Ok(parse_name_status(&git_stdout(dir, &[
      "diff",
      "--cached",
      "--no-color",
      "--no-ext-diff",
      "--name-status",
   ])?))
}

/// Parse `--name-status` output; renames and copies keep the new path
fn parse_name_status(output: &str) -> Vec<FileChange> {
   output
      .lines()
      .filter_map(|line| {
         let mut fields = line.split('\t');
         let code = fields.next()?.trim();
         let path = fields.last()?;
         if code.is_empty() || path.is_empty() {
            return None;
         }
         Some(FileChange { path: path.to_string(), status: ChangeStatus::from_code(code) })
      })
      .collect()
}

fn cli_has_staged(dir: &Path) -> Result<bool> {
   let output = git(dir, &["diff", "--cached", "--quiet"])?;
   match output.status.code() {
      Some(0) => Ok(false),
      Some(1) => Ok(true),
      _ => {
         let stderr = String::from_utf8_lossy(&output.stderr);
         Err(CommitGenError::GitError(format!("git diff --cached --quiet failed: {}", stderr.trim())))
      },
   }
}

fn cli_commit(dir: &Path, message: &str) -> Result<()> {
   let output = git(dir, &["commit", "-m", message])?;
   if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      return Err(CommitGenError::CommitFailed(format!(
         "git commit failed:\nstderr: {}\nstdout: {}",
         stderr.trim(),
         stdout.trim()
      )));
   }
   debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "created commit with git CLI");
   Ok(())
}
