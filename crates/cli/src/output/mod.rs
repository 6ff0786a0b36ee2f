//! Output formatting utilities
//!
//! This module provides the formatter for human-readable and JSON output,
//! and the spinner shown while a delegated call runs.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::Spinner;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable the progress spinner
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
