//! Path-based heuristics used when the model returns nothing usable.

use std::collections::HashMap;

use crate::types::{ChangeStatus, CommitMessage, DiffStats, FileChange, Language};

/// Placeholder dirs skipped when picking a scope
const PLACEHOLDER_DIRS: &[&str] = &["src", "lib", "app", "pkg", "crates", "packages", "internal"];

const DOC_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];

const BUILD_FILES: &[&str] = &[
   "Cargo.toml",
   "Cargo.lock",
   "package.json",
   "package-lock.json",
   "yarn.lock",
   "pnpm-lock.yaml",
   "go.mod",
   "go.sum",
   "pyproject.toml",
   "setup.py",
   "Makefile",
   "Dockerfile",
];

fn is_test_path(path: &str) -> bool {
   path.split('/').any(|seg| seg == "tests" || seg == "test" || seg == "__tests__")
      || file_name(path).contains("_test.")
      || file_name(path).contains(".test.")
      || file_name(path).starts_with("test_")
}

fn is_doc_path(path: &str) -> bool {
   path.starts_with("docs/")
      || file_name(path)
         .rsplit_once('.')
         .is_some_and(|(_, ext)| DOC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn is_build_path(path: &str) -> bool {
   BUILD_FILES.contains(&file_name(path))
}

fn is_ci_path(path: &str) -> bool {
   path.starts_with(".github/workflows/")
      || path.starts_with(".gitlab-ci")
      || path.starts_with(".circleci/")
}

fn file_name(path: &str) -> &str {
   path.rsplit('/').next().unwrap_or(path)
}

/// Guess a conventional type from the set of changed paths
pub fn suggest_type(changes: &[FileChange], stats: &DiffStats) -> &'static str {
   let all = |pred: fn(&str) -> bool| !changes.is_empty() && changes.iter().all(|c| pred(&c.path));

   if all(is_test_path) {
      "test"
   } else if all(is_doc_path) {
      "docs"
   } else if all(is_ci_path) {
      "ci"
   } else if all(is_build_path) {
      "build"
   } else if changes.iter().any(|c| c.status == ChangeStatus::Added)
      || stats.insertions > stats.deletions * 2
   {
      "feat"
   } else {
      "chore"
   }
}

/// Most frequent meaningful directory among changed files
pub fn suggest_scope(changes: &[FileChange]) -> Option<String> {
   let mut counts: HashMap<&str, usize> = HashMap::new();
   for change in changes {
      let dirs: Vec<&str> = change.path.split('/').collect();
      let Some((_, dirs)) = dirs.split_last() else {
         continue;
      };
      if let Some(component) = dirs
         .iter()
         .copied()
         .find(|seg| !PLACEHOLDER_DIRS.contains(seg) && !seg.starts_with('.'))
      {
         *counts.entry(component).or_insert(0) += 1;
      }
   }

   // Ties resolve alphabetically so output is stable
   counts
      .into_iter()
      .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
      .map(|(scope, _)| scope.to_lowercase())
}

/// Build a commit message from heuristics alone
pub fn fallback_message(
   changes: &[FileChange],
   stats: &DiffStats,
   language: Language,
) -> CommitMessage {
   let commit_type = suggest_type(changes, stats);
   let scope = suggest_scope(changes);

   let subject = match language {
      Language::Id => {
         let target = scope.as_deref().unwrap_or("beberapa file");
         match commit_type {
            "feat" => format!("tambahkan fitur pada {target}"),
            "docs" => "update dokumentasi".to_string(),
            "test" => "update test".to_string(),
            "build" => "update konfigurasi build".to_string(),
            "ci" => "update pipeline CI".to_string(),
            _ => format!("update {}", scope.as_deref().unwrap_or("file")),
         }
      },
      Language::En => {
         let target = scope.as_deref().unwrap_or("files");
         match commit_type {
            "feat" => format!("add feature to {target}"),
            "docs" => "update documentation".to_string(),
            "test" => "update tests".to_string(),
            "build" => "update build configuration".to_string(),
            "ci" => "update CI pipeline".to_string(),
            _ => format!("update {target}"),
         }
      },
   };

   let body = match language {
      Language::Id => format!(
         "{} file berubah, +{}, -{}",
         stats.files_changed, stats.insertions, stats.deletions
      ),
      Language::En => format!(
         "{} file(s) changed, +{}, -{}",
         stats.files_changed, stats.insertions, stats.deletions
      ),
   };

   CommitMessage { commit_type: commit_type.to_string(), scope, subject, body: Some(body) }
}
