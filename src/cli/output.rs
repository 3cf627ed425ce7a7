//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status lines, and error diagnostics to the user.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

/// Global output preferences from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    /// Create a new output configuration
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this configuration visible to [`OutputConfig::global`]
    ///
    /// Only the first call has an effect.
    pub fn apply_global(self) {
        let _ = OUTPUT.set(self);
    }

    /// The configuration applied at startup, or the default
    pub fn global() -> Self {
        OUTPUT.get().copied().unwrap_or_default()
    }

    /// Whether human-readable progress output should be printed
    pub fn is_interactive(self) -> bool {
        !self.quiet && !self.json
    }

    /// Log level selected by the verbosity flags
    pub fn log_level(self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

/// Print a line unless quiet or JSON output was requested
pub fn print_info(message: &str) {
    if OutputConfig::global().is_interactive() {
        println!("{message}");
    }
}

/// Print a success line unless quiet or JSON output was requested
pub fn print_success(message: &str) {
    if OutputConfig::global().is_interactive() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print an error and its cause chain to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Create a progress bar for build steps
pub fn create_build_bar(total: u64) -> ProgressBar {
    if !OutputConfig::global().is_interactive() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} packages ({msg})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Skipped prefix
    pub const SKIPPED: &str = "-";
}
