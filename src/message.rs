use std::sync::LazyLock;

use regex_lite::Regex;

use crate::types::{CommitMessage, CommitStyle};

/// Types the prompt asks the model to choose from
pub const COMMIT_TYPES: &[&str] = &[
   "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

const DEFAULT_EMOJI: &str = "\u{1F4DD}";

/// `type(scope): subject`, scope optional
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
   Regex::new(r"^(\w+)(?:\(([^)]+)\))?: (.+)$").expect("commit header regex is valid")
});

pub fn emoji_for(commit_type: &str) -> &'static str {
   match commit_type {
      "feat" => "\u{2728}",
      "fix" => "\u{1F41B}",
      "docs" => "\u{1F4DD}",
      "style" => "\u{1F484}",
      "refactor" => "\u{267B}\u{FE0F}",
      "perf" => "\u{26A1}",
      "test" => "\u{2705}",
      "build" => "\u{1F4E6}",
      "ci" => "\u{1F477}",
      "chore" => "\u{1F527}",
      "revert" => "\u{23EA}",
      _ => DEFAULT_EMOJI,
   }
}

/// Drop a leading `<think>...</think>` block emitted by reasoning models
pub fn strip_reasoning(raw: &str) -> &str {
   let trimmed = raw.trim_start();
   if let Some(rest) = trimmed.strip_prefix("<think>")
      && let Some(end) = rest.find("</think>")
   {
      return rest[end + "</think>".len()..].trim();
   }
   raw.trim()
}

impl CommitMessage {
   /// Parse raw model output.
   ///
   /// The body is only captured when at least one line separates it from the
   /// subject: `"subject\nbody"` has no body, `"subject\n\nbody"` does.
   pub fn parse(raw: &str) -> Self {
      let lines: Vec<&str> = raw.split('\n').collect();
      let first_line = lines[0];

      let mut commit = Self::default();

      match HEADER_RE.captures(first_line) {
         Some(caps) => {
            commit.commit_type = caps[1].to_string();
            commit.scope = caps.get(2).map(|m| m.as_str().to_string());
            commit.subject = caps[3].to_string();
         },
         None => commit.subject = first_line.to_string(),
      }

      let rest = &lines[1..];
      if let Some(body_start) = rest.iter().position(|line| !line.trim().is_empty())
         && body_start > 0
      {
         commit.body = Some(rest[body_start..].join("\n"));
      }

      commit
   }

   pub fn format(&self, style: CommitStyle) -> String {
      match style {
         CommitStyle::Conventional => self.format_conventional(),
         CommitStyle::Emoji => self.format_emoji(),
         CommitStyle::Simple => self.format_simple(),
      }
   }

   /// `type(scope): subject\n\nbody`. An empty type still yields `: subject`.
   pub fn format_conventional(&self) -> String {
      let mut message = self.commit_type.clone();
      if let Some(scope) = &self.scope {
         message.push_str(&format!("({scope})"));
      }
      if !self.subject.is_empty() {
         message.push_str(": ");
         message.push_str(&self.subject);
      }
      self.push_body(&mut message);
      message
   }

   /// `emoji type: subject\n\nbody`; scope is not rendered
   pub fn format_emoji(&self) -> String {
      let mut message = String::new();
      if !self.commit_type.is_empty() {
         message.push_str(emoji_for(&self.commit_type));
         message.push(' ');
         message.push_str(&self.commit_type);
      }
      if !self.subject.is_empty() {
         message.push_str(": ");
         message.push_str(&self.subject);
      }
      self.push_body(&mut message);
      message
   }

   pub fn format_simple(&self) -> String {
      let mut message = self.subject.clone();
      self.push_body(&mut message);
      message
   }

   fn push_body(&self, message: &mut String) {
      if let Some(body) = self.body.as_deref().filter(|b| !b.is_empty()) {
         message.push_str("\n\n");
         message.push_str(body);
      }
   }
}
