//! Terminal styling for CLI output.
//!
//! Respects `NO_COLOR`. Progress (spinner, warnings, info lines) goes to
//! stderr so stdout carries only the message and listings.

use std::{
   io::{self, IsTerminal, Write},
   sync::{OnceLock, mpsc},
   thread,
   time::Duration,
};

use owo_colors::OwoColorize;

static COLOR_ENABLED: OnceLock<bool> = OnceLock::new();
static STDERR_COLOR_ENABLED: OnceLock<bool> = OnceLock::new();

fn detect(stream: supports_color::Stream) -> bool {
   // NO_COLOR takes precedence (https://no-color.org/)
   if std::env::var_os("NO_COLOR").is_some() {
      return false;
   }
   supports_color::on(stream).is_some_and(|level| level.has_basic)
}

/// Whether stdout gets colors (cached on first call)
pub fn colors_enabled() -> bool {
   *COLOR_ENABLED.get_or_init(|| detect(supports_color::Stream::Stdout))
}

fn stderr_colors_enabled() -> bool {
   *STDERR_COLOR_ENABLED.get_or_init(|| detect(supports_color::Stream::Stderr))
}

fn paint(s: &str, f: impl FnOnce(&str) -> String) -> String {
   if colors_enabled() { f(s) } else { s.to_string() }
}

// === Color Palette ===

/// Checkmarks, insertions (green + bold)
pub fn success(s: &str) -> String {
   paint(s, |s| s.green().bold().to_string())
}

/// Failures, deletions (red + bold)
pub fn error(s: &str) -> String {
   paint(s, |s| s.red().bold().to_string())
}

pub fn info(s: &str) -> String {
   paint(s, |s| s.cyan().to_string())
}

pub fn dim(s: &str) -> String {
   paint(s, |s| s.dimmed().to_string())
}

pub fn bold(s: &str) -> String {
   paint(s, |s| s.bold().to_string())
}

/// Model names (magenta)
pub fn model(s: &str) -> String {
   paint(s, |s| s.magenta().to_string())
}

/// Print a warning on its own line, even while a spinner is running
pub fn warn(msg: &str) {
   if stderr_colors_enabled() {
      eprintln!("\r\x1b[K{} {}", icons::WARNING.yellow(), msg.yellow());
   } else {
      eprintln!("{} {msg}", icons::WARNING);
   }
}

/// Print an info line on stderr
pub fn print_info(msg: &str) {
   if io::stderr().is_terminal() && stderr_colors_enabled() {
      eprintln!("\r\x1b[K{} {msg}", icons::INFO.cyan());
   } else {
      eprintln!("{} {msg}", icons::INFO);
   }
}

/// Terminal width, capped at 100 columns
pub fn term_width() -> usize {
   terminal_size::terminal_size()
      .map_or(80, |(w, _)| w.0 as usize)
      .min(100)
}

// === Unicode Box Drawing ===

pub mod box_chars {
   pub const TOP_LEFT: char = '\u{256D}';
   pub const TOP_RIGHT: char = '\u{256E}';
   pub const BOTTOM_LEFT: char = '\u{2570}';
   pub const BOTTOM_RIGHT: char = '\u{256F}';
   pub const HORIZONTAL: char = '\u{2500}';
   pub const VERTICAL: char = '\u{2502}';
}

/// Wrap text to fit within a given width, preserving words
fn wrap_line(line: &str, max_width: usize) -> Vec<String> {
   if line.trim().is_empty() {
      return vec![String::new()];
   }

   let mut lines = Vec::new();
   let mut current = String::new();

   for word in line.split_whitespace() {
      if current.is_empty() {
         // First word on line - take it even if too long
         current = word.to_string();
      } else if current.chars().count() + 1 + word.chars().count() <= max_width {
         current.push(' ');
         current.push_str(word);
      } else {
         lines.push(std::mem::take(&mut current));
         current = word.to_string();
      }
   }

   if !current.is_empty() {
      lines.push(current);
   }

   lines
}

/// Render a box-framed message with word wrapping. Blank lines inside the
/// message are kept so the subject/body split stays visible.
pub fn boxed_message(title: &str, content: &str, width: usize) -> String {
   use box_chars::*;

   let mut out = String::new();
   let inner_width = width.saturating_sub(4); // "│ " and " │"
   let border_width = width.saturating_sub(2);

   let padding = border_width.saturating_sub(title.chars().count() + 2);
   let left_pad = padding / 2;
   let right_pad = padding - left_pad;

   out.push(TOP_LEFT);
   out.push_str(&HORIZONTAL.to_string().repeat(left_pad));
   out.push(' ');
   out.push_str(&bold(title));
   out.push(' ');
   out.push_str(&HORIZONTAL.to_string().repeat(right_pad));
   out.push(TOP_RIGHT);
   out.push('\n');

   for line in content.lines() {
      for wrapped in wrap_line(line, inner_width) {
         let pad = inner_width.saturating_sub(wrapped.chars().count());
         out.push(VERTICAL);
         out.push(' ');
         out.push_str(&wrapped);
         out.push_str(&" ".repeat(pad));
         out.push(' ');
         out.push(VERTICAL);
         out.push('\n');
      }
   }

   out.push(BOTTOM_LEFT);
   out.push_str(&HORIZONTAL.to_string().repeat(border_width));
   out.push(BOTTOM_RIGHT);

   out
}

/// Section header with decorative lines
pub fn section_header(title: &str, width: usize) -> String {
   let line_len = width.saturating_sub(title.chars().count() + 2) / 2;
   let line = box_chars::HORIZONTAL.to_string().repeat(line_len);
   format!("{} {} {}", dim(&line), bold(title), dim(&line))
}

// === Status Icons ===

pub mod icons {
   pub const SUCCESS: &str = "\u{2713}";
   pub const WARNING: &str = "\u{26A0}";
   pub const ERROR: &str = "\u{2717}";
   pub const INFO: &str = "\u{2139}";
   pub const BULLET: &str = "\u{2022}";
}

// === Spinner ===

const SPINNER_FRAMES: &[char] = &[
   '\u{280B}', '\u{2819}', '\u{2839}', '\u{2838}', '\u{283C}', '\u{2834}', '\u{2826}', '\u{2827}',
   '\u{2807}', '\u{280F}',
];

/// Animate `message` on stderr while `f` runs; the final frame becomes a
/// check or a cross depending on `ok(&result)`. Without a color-capable
/// terminal the message is printed once.
fn spin<T>(message: &str, f: impl FnOnce() -> T, ok: impl Fn(&T) -> bool) -> T {
   if !io::stderr().is_terminal() || !stderr_colors_enabled() {
      eprintln!("{message}");
      return f();
   }

   let (tx, rx) = mpsc::channel::<bool>();
   let msg = message.to_string();

   let spinner = thread::spawn(move || {
      let mut idx = 0;
      loop {
         match rx.try_recv() {
            Ok(success) => {
               let icon = if success {
                  icons::SUCCESS.green().to_string()
               } else {
                  icons::ERROR.red().to_string()
               };
               eprintln!("\r\x1b[K{icon} {msg}");
               break;
            },
            Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {},
         }
         eprint!("\r{} {}", SPINNER_FRAMES[idx].cyan(), msg);
         io::stderr().flush().ok();
         idx = (idx + 1) % SPINNER_FRAMES.len();
         thread::sleep(Duration::from_millis(80));
      }
   });

   let result = f();
   tx.send(ok(&result)).ok();
   spinner.join().ok();
   result
}

/// Run a function with a spinner
pub fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
   spin(message, f, |_| true)
}

/// Run a fallible function with a spinner that shows failure
pub fn with_spinner_result<T, E>(message: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
   spin(message, f, Result::is_ok)
}
