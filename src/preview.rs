//! Commit message preview.
//!
//! A [`PreviewPanel`] lives for one generate run. Resolving it consumes the
//! panel, so exactly one user action is taken per preview.

use std::io::IsTerminal;

use dialoguer::{Editor, Select, theme::ColorfulTheme};

use crate::{
   error::Result,
   style,
   types::{CommitMessage, CommitStyle},
};

/// What the user picked on the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
   Accept,
   Edit,
   Cancel,
}

/// Outcome of a preview session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
   Commit(String),
   Cancel,
}

/// Something that can display a rendered message and collect a decision
pub trait PreviewSurface {
   fn show(&mut self, rendered: &str) -> Result<SurfaceAction>;

   /// Let the user edit `rendered`; `None` means the edit was abandoned
   fn edit(&mut self, rendered: &str) -> Result<Option<String>>;
}

#[derive(Debug)]
pub struct PreviewPanel {
   message:  CommitMessage,
   style:    CommitStyle,
   rendered: String,
}

impl PreviewPanel {
   pub fn open(message: CommitMessage, style: CommitStyle) -> Self {
      let rendered = message.format(style);
      Self { message, style, rendered }
   }

   pub fn rendered(&self) -> &str {
      &self.rendered
   }

   pub const fn message(&self) -> &CommitMessage {
      &self.message
   }

   pub const fn style(&self) -> CommitStyle {
      self.style
   }

   pub fn resolve(self, surface: &mut impl PreviewSurface) -> Result<Decision> {
      let decision = match surface.show(&self.rendered)? {
         SurfaceAction::Accept => Decision::Commit(self.rendered),
         SurfaceAction::Edit => match surface.edit(&self.rendered)? {
            Some(edited) if !edited.trim().is_empty() => Decision::Commit(edited),
            _ => Decision::Cancel,
         },
         SurfaceAction::Cancel => Decision::Cancel,
      };
      Ok(decision)
   }
}

/// Boxed preview on stdout, choices on stderr, edits in `$EDITOR`
pub struct TerminalSurface {
   interactive: bool,
}

impl TerminalSurface {
   pub fn new() -> Self {
      Self { interactive: std::io::stdin().is_terminal() && std::io::stderr().is_terminal() }
   }
}

impl Default for TerminalSurface {
   fn default() -> Self {
      Self::new()
   }
}

const CHOICES: [&str; 3] = ["Commit", "Edit", "Cancel"];

impl PreviewSurface for TerminalSurface {
   fn show(&mut self, rendered: &str) -> Result<SurfaceAction> {
      println!("\n{}", style::boxed_message("Commit Message Preview", rendered, style::term_width()));

      if !self.interactive {
         style::warn("stdin is not a terminal, commit cancelled (use --yes to commit without preview)");
         return Ok(SurfaceAction::Cancel);
      }

      let choice = Select::with_theme(&ColorfulTheme::default())
         .with_prompt("Use this message?")
         .items(&CHOICES)
         .default(0)
         .interact_opt()?;

      Ok(match choice {
         Some(0) => SurfaceAction::Accept,
         Some(1) => SurfaceAction::Edit,
         _ => SurfaceAction::Cancel,
      })
   }

   fn edit(&mut self, rendered: &str) -> Result<Option<String>> {
      Ok(Editor::new().extension(".gitcommit").edit(rendered)?)
   }
}
