use indicatif::{ProgressBar, ProgressStyle};
use libherder::StatusTag;
use libherder::verify::StatusLine;
use owo_colors::OwoColorize;
use std::fmt;
use std::io::IsTerminal;

/// When to use colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<&str> for ColorChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" | "true" | "yes" => ColorChoice::Always,
            "never" | "false" | "no" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorChoice::Auto => "auto",
            ColorChoice::Always => "always",
            ColorChoice::Never => "never",
        })
    }
}

impl ColorChoice {
    /// Resolves `Auto` against the terminal and `NO_COLOR`.
    pub fn enabled(self, is_terminal: bool, no_color: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => is_terminal && !no_color,
        }
    }
}

/// Trait for output formatting that can be TTY-aware or plain text
///
/// Reports go to stdout; messages and progress go to stderr.
pub trait OutputFormatter: Send + Sync {
    /// Print one verification status line
    fn status(&self, line: &StatusLine);

    /// Print a success message
    fn success(&self, message: &str);

    /// Print an error message
    fn error(&self, message: &str);

    /// Print a warning message
    fn warning(&self, message: &str);

    /// Create a progress bar for determinate progress
    fn progress_bar(&self, len: u64, message: &str) -> ProgressBar;

    /// Finish a progress operation with a message
    fn finish_progress(&self, pb: ProgressBar, message: &str);
}

/// Renders a status line, coloring the tag when `colored` is set.
pub fn format_status(line: &StatusLine, colored: bool) -> String {
    if !colored {
        return line.to_string();
    }

    let tag = line.tag.to_string();
    let tag = match line.tag {
        StatusTag::OkAuth | StatusTag::OkNoAuth => tag.green().bold().to_string(),
        StatusTag::Skip => tag.dimmed().to_string(),
        StatusTag::ErrorNoMatch => tag.yellow().bold().to_string(),
        StatusTag::ErrorAuth | StatusTag::ErrorNoAuth | StatusTag::Error => {
            tag.red().bold().to_string()
        }
    };
    match &line.detail {
        Some(detail) => format!("{} {}: {}", tag, line.image, detail),
        None => format!("{} {}", tag, line.image),
    }
}

/// TTY-aware formatter with colors and progress indicators
pub struct TtyFormatter;

impl OutputFormatter for TtyFormatter {
    fn status(&self, line: &StatusLine) {
        println!("{}", format_status(line, true));
    }

    fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message);
    }

    fn progress_bar(&self, len: u64, message: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .map(|style| style.progress_chars("█▓▒░ "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb
    }

    fn finish_progress(&self, pb: ProgressBar, message: &str) {
        pb.finish_with_message(format!("{} {}", "✓".green(), message));
    }
}

/// Plain text formatter for non-TTY output (piped, scripted)
pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn status(&self, line: &StatusLine) {
        println!("{}", format_status(line, false));
    }

    fn success(&self, message: &str) {
        println!("✓ {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("⚠ {}", message);
    }

    fn progress_bar(&self, _len: u64, _message: &str) -> ProgressBar {
        ProgressBar::hidden()
    }

    fn finish_progress(&self, pb: ProgressBar, _message: &str) {
        pb.finish_and_clear();
    }
}

/// Create the appropriate formatter for `color`, the terminal and `NO_COLOR`
pub fn create_formatter(color: ColorChoice) -> Box<dyn OutputFormatter> {
    let is_terminal = std::io::stdout().is_terminal() || std::io::stderr().is_terminal();
    let no_color = std::env::var_os("NO_COLOR").is_some();

    if color.enabled(is_terminal, no_color) {
        Box::new(TtyFormatter)
    } else {
        Box::new(PlainFormatter)
    }
}
