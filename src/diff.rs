use std::sync::LazyLock;

use regex_lite::Regex;

use crate::{config::AppConfig, types::DiffStats};

/// Assignments that look like credentials: `password = "..."`, `api_key: ...`
static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
   ["password", "api_key", "token", "secret"]
      .iter()
      .filter_map(|key| {
         Regex::new(&format!(r#"(?i){key}["']?\s*[:=]\s*["']?[^"'\s]+"#)).ok()
      })
      .collect()
});

const FILE_HEADER: &str = "diff --git ";

/// Count changed files, inserted and deleted lines by line prefix.
///
/// Every file contributes one `---` and one `+++` header, so the file count is
/// half the header count. Hunk markers and other metadata match no rule.
pub fn diff_stats(diff: &str) -> DiffStats {
   let mut headers = 0;
   let mut stats = DiffStats::default();

   for line in diff.split('\n') {
      if line.starts_with("+++") || line.starts_with("---") {
         headers += 1;
      } else if line.starts_with('+') {
         stats.insertions += 1;
      } else if line.starts_with('-') {
         stats.deletions += 1;
      }
   }

   stats.files_changed = headers / 2;
   stats
}

/// Shape a diff for the prompt: redact secrets, cap file count, cap length
pub fn prepare_for_prompt(diff: &str, app: &AppConfig) -> String {
   let mut prepared = if app.redact_secrets {
      redact_secrets(diff)
   } else {
      diff.to_string()
   };

   if app.max_files > 0 {
      prepared = limit_files(&prepared, app.max_files);
   }

   if prepared.len() > app.max_diff_length {
      prepared = truncate_diff(&prepared, app.max_diff_length);
   }

   prepared
}

pub fn redact_secrets(diff: &str) -> String {
   SECRET_PATTERNS
      .iter()
      .fold(diff.to_string(), |text, pattern| {
         pattern.replace_all(&text, "[REDACTED]").into_owned()
      })
}

/// Keep only the first `max_files` file sections
pub fn limit_files(diff: &str, max_files: usize) -> String {
   let starts: Vec<usize> = diff
      .match_indices(FILE_HEADER)
      .map(|(idx, _)| idx)
      .filter(|&idx| idx == 0 || diff.as_bytes()[idx - 1] == b'\n')
      .collect();

   if starts.len() <= max_files {
      return diff.to_string();
   }

   let omitted = starts.len() - max_files;
   let mut kept = diff[..starts[max_files]].trim_end_matches('\n').to_string();
   kept.push_str(&format!("\n\n... ({omitted} more files omitted for brevity)"));
   kept
}

/// Cut at the last whole line that fits in `max_length` bytes
pub fn truncate_diff(diff: &str, max_length: usize) -> String {
   let mut cut = 0;
   for line in diff.split_inclusive('\n') {
      if cut + line.len() > max_length {
         break;
      }
      cut += line.len();
   }

   // A single oversized first line still gets a char-boundary cut
   if cut == 0 {
      cut = max_length.min(diff.len());
      while !diff.is_char_boundary(cut) {
         cut -= 1;
      }
   }

   let mut truncated = diff[..cut].trim_end_matches('\n').to_string();
   truncated.push_str("\n\n... (truncated for brevity)");
   truncated
}
