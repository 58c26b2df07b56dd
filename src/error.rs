//! Structured error handling and exit codes.

use serde::Serialize;

use crate::dedup::ConfigError;

/// Exit codes for the linedupe binary.
///
/// - 0: Success (every file processed)
/// - 1: General error (unexpected failure, e.g. a stream that became unreadable)
/// - 2: Configuration error (rejected before any file was touched)
/// - 3: Partial success (some files failed, the rest were processed)
/// - 130: Interrupted by user (Ctrl+C during a batch run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Every file was processed.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Invalid option, value or pattern.
    ConfigurationError = 2,
    /// At least one file failed.
    PartialSuccess = 3,
    /// The batch was interrupted by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LD000",
            Self::GeneralError => "LD001",
            Self::ConfigurationError => "LD002",
            Self::PartialSuccess => "LD003",
            Self::Interrupted => "LD130",
        }
    }

    /// Exit code for a top-level error.
    ///
    /// Errors carrying an [`ExitCode`] or a [`ConfigError`] anywhere in their
    /// chain map to that code; everything else is a general error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            return *code;
        }
        if err.chain().any(|cause| cause.is::<ConfigError>()) {
            return Self::ConfigurationError;
        }
        if err
            .chain()
            .any(|cause| cause.downcast_ref::<clap::Error>().is_some())
        {
            return Self::ConfigurationError;
        }
        Self::GeneralError
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (exit code {})", self.code_prefix(), self.as_i32())
    }
}

impl std::error::Error for ExitCode {}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LD002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
