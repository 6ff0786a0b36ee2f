//! Exit code definitions for b2-upload
//!
//! Scripts and cron jobs rely on these values. Changing them is a breaking
//! change.

/// Exit codes for the b2-upload binary.
///
/// Every failure, whatever its category, exits with 1. The category is
/// reported on stderr instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Archive uploaded (verification may have produced a warning)
    Success = 0,

    /// Usage, configuration, precondition, or delegated-operation failure
    Failure = 1,

    /// Operation was interrupted (e.g., Ctrl+C); cleanup still ran
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Failure),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Upload completed successfully",
            Self::Failure => "Upload failed",
            Self::Interrupted => "Operation interrupted",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl From<&b2u_core::Error> for ExitCode {
    fn from(err: &b2u_core::Error) -> Self {
        Self::from_i32(err.exit_code()).unwrap_or(Self::Failure)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}
