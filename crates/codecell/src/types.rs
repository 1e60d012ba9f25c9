use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;

/// Wall clock budget used when no limit is configured, in seconds
pub const DEFAULT_WALL_TIME: f64 = 5.0;

/// Per-stream capture cap used when no limit is configured, in kilobytes
pub const DEFAULT_MAX_OUTPUT: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall clock time limit in seconds
    #[serde(default)]
    pub wall_time_limit: Option<f64>,

    /// Maximum captured output per stream in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,
}

impl ResourceLimits {
    /// 1 kilobyte in kilobytes
    pub const KB: u64 = 1;
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;

    /// Create new resource limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create resource limits with every field unset
    pub fn unset() -> Self {
        Self {
            wall_time_limit: None,
            max_output: None,
        }
    }

    /// Set the wall clock time limit in seconds
    pub fn with_wall_time_limit(mut self, seconds: f64) -> Self {
        self.wall_time_limit = Some(seconds);
        self
    }

    /// Set the maximum captured output in kilobytes
    pub fn with_max_output(mut self, kb: u64) -> Self {
        self.max_output = Some(kb);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            wall_time_limit: overrides.wall_time_limit.or(self.wall_time_limit),
            max_output: overrides.max_output.or(self.max_output),
        }
    }

    /// Wall clock budget as a duration
    pub fn wall_time(&self) -> Duration {
        Duration::from_secs_f64(self.wall_time_limit.unwrap_or(DEFAULT_WALL_TIME))
    }

    /// Capture cap per stream in bytes
    pub fn max_output_bytes(&self) -> usize {
        let kb = self.max_output.unwrap_or(DEFAULT_MAX_OUTPUT);
        usize::try_from(kb.saturating_mul(1024)).unwrap_or(usize::MAX)
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            wall_time_limit: Some(DEFAULT_WALL_TIME),
            max_output: Some(DEFAULT_MAX_OUTPUT),
        }
    }
}

/// A single execution request as supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Program text
    pub source: String,

    /// Language identifier, matched case-insensitively
    pub language: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            language: language.into(),
        }
    }
}

/// Why an execution did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Rejected before anything ran
    Syntax,
    /// Program failed while running
    Runtime,
    /// Wall clock budget exceeded, child killed
    Timeout,
    /// Spawn, I/O or environment failure unrelated to the program
    System,
    /// Compiler rejected the program
    Compile,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Syntax => "syntax",
            ErrorCategory::Runtime => "runtime",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::System => "system",
            ErrorCategory::Compile => "compile",
        }
    }

    /// One-sentence explanation shown under a rendered diagnostic
    pub fn explanation(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::Syntax => Some(
                "This is a syntax error. You need to fix the syntax before the code can run.",
            ),
            ErrorCategory::Runtime => Some(
                "This is a runtime error. Your code syntax is valid, but there was a problem during execution.",
            ),
            ErrorCategory::Compile => Some(
                "This is a compile error. The compiler rejected the program, so it was not run.",
            ),
            ErrorCategory::Timeout | ErrorCategory::System => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of the per-request state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    SyntaxFail,
    Timeout,
    Crashed,
    Completed,
}

/// Result of an execution
///
/// `success` is false exactly when `error_category` is set. Use the
/// constructors to keep the two in step.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Standard output, preserved on failure and timeout
    pub stdout: String,

    /// Standard error, or a human-readable note for timeout and system failures
    pub stderr: String,

    pub success: bool,

    pub error_category: Option<ErrorCategory>,

    /// 1-based line in the caller's source, 0 when unknown
    pub line_number: u32,

    /// 1-based column, 0 when unknown
    pub column: u32,

    /// Unprocessed error text from the failing process
    pub raw_error: String,

    /// Structured diagnostic, when the failure could be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl ExecutionResult {
    /// A run that exited with status 0
    pub fn completed(stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            success: true,
            error_category: None,
            line_number: 0,
            column: 0,
            raw_error: String::new(),
            diagnostic: None,
        }
    }

    /// A failed run of the given category
    pub fn failure(category: ErrorCategory, stdout: String, stderr: String) -> Self {
        Self {
            raw_error: stderr.clone(),
            stdout,
            stderr,
            success: false,
            error_category: Some(category),
            line_number: 0,
            column: 0,
            diagnostic: None,
        }
    }

    /// A run killed after exceeding its budget; only a note is reported
    pub fn timeout(stdout: String, note: impl Into<String>) -> Self {
        let mut result = Self::failure(ErrorCategory::Timeout, stdout, note.into());
        result.raw_error.clear();
        result
    }

    /// A failure of the sandbox itself
    pub fn system(message: impl Into<String>) -> Self {
        Self::failure(ErrorCategory::System, String::new(), message.into())
    }

    /// Attach a diagnostic, copying its location into the result
    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.line_number = diagnostic.line;
        self.column = diagnostic.column;
        self.diagnostic = Some(diagnostic);
        self
    }

    /// Check if the execution was successful
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn terminal_state(&self) -> TerminalState {
        match self.error_category {
            None => TerminalState::Completed,
            Some(ErrorCategory::Syntax) => TerminalState::SyntaxFail,
            Some(ErrorCategory::Timeout) => TerminalState::Timeout,
            Some(_) => TerminalState::Crashed,
        }
    }
}

/// Human-readable note for an exceeded wall clock budget
pub fn timeout_note(what: &str, budget: Duration) -> String {
    format!(
        "{what} timed out ({} seconds). Your code might have an infinite loop.",
        budget.as_secs_f64()
    )
}
