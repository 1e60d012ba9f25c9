//! Diagnostic extraction
//!
//! Turns raw interpreter and compiler error output into structured records
//! located in the caller's source. Each toolchain has its own parser; they
//! all produce a [`ParsedError`] whose line number is relative to the file
//! the toolchain actually saw, which [`ParsedError::into_diagnostic`] then
//! maps back onto the caller's source.

use serde::Serialize;

pub mod java;
pub mod node;
pub mod python;

/// How the error location was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Reported by a compiler or syntax checker
    Exact,
    /// Located through delimiters or a well-known header format
    Structured,
    /// Best-effort substring search
    Heuristic,
}

/// One source line shown around an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLine {
    /// 1-based line number
    pub line_number: u32,
    pub text: String,
    pub is_offending: bool,
}

/// Structured record of one error condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub error_type: String,
    pub message: String,
    /// 1-based line in the caller's source, 0 when unknown
    pub line: u32,
    /// 1-based column, 0 when unknown
    pub column: u32,
    pub context_lines: Vec<ContextLine>,
    pub confidence: Confidence,
    /// The raw report held chained exceptions; only the last one is kept
    pub chained: bool,
}

impl Diagnostic {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            line: 0,
            column: 0,
            context_lines: Vec::new(),
            confidence: Confidence::Exact,
            chained: false,
        }
    }

    /// Set the location
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Attach the context window around `line` taken from `source`
    pub fn with_context(mut self, source: &str) -> Self {
        self.context_lines = context_window(source, self.line);
        self
    }

    /// `type: message` header
    pub fn header(&self) -> String {
        if self.message.is_empty() {
            self.error_type.clone()
        } else {
            format!("{}: {}", self.error_type, self.message)
        }
    }
}

/// Parser output before the line number is mapped onto the caller's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedError {
    pub error_type: String,
    pub message: String,
    /// Line in the file the toolchain saw, 0 when not found
    pub raw_line: u32,
    pub column: u32,
    pub confidence: Confidence,
    pub chained: bool,
}

impl ParsedError {
    pub fn new(
        error_type: impl Into<String>,
        message: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            raw_line: 0,
            column: 0,
            confidence,
            chained: false,
        }
    }

    /// Map onto the caller's source, skipping the lines `map` says were injected
    pub fn into_diagnostic(self, map: LineMap, source: &str) -> Diagnostic {
        let line = map.source_line(self.raw_line);
        let source_lines = source.split('\n').count();
        // A location past the end of the caller's source was not positively located
        let line = if line as usize > source_lines { 0 } else { line };
        let column = if line == 0 { 0 } else { self.column };

        Diagnostic {
            error_type: self.error_type,
            message: self.message,
            line,
            column,
            context_lines: Vec::new(),
            confidence: self.confidence,
            chained: self.chained,
        }
        .with_context(source)
    }
}

/// Lines inserted into the file a toolchain saw
///
/// The file holds the first `kept` lines of the caller's source, then
/// `injected` inserted lines, then the rest of the caller's source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMap {
    pub kept: usize,
    pub injected: usize,
}

impl LineMap {
    /// The file is the caller's source unchanged
    pub const IDENTITY: LineMap = LineMap {
        kept: 0,
        injected: 0,
    };

    /// `injected` lines ahead of the caller's first line
    pub fn prefixed(injected: usize) -> Self {
        Self { kept: 0, injected }
    }

    /// Caller's line for a raw line, 0 when it falls inside the injected lines
    pub fn source_line(&self, raw_line: u32) -> u32 {
        let raw = raw_line as usize;
        if raw <= self.kept {
            raw_line
        } else if raw <= self.kept + self.injected {
            0
        } else {
            u32::try_from(raw - self.injected).unwrap_or(0)
        }
    }
}

/// Two lines before `line`, the line itself and one line after
pub fn context_window(source: &str, line: u32) -> Vec<ContextLine> {
    if line == 0 {
        return Vec::new();
    }

    let lines: Vec<&str> = source.split('\n').collect();
    let index = line as usize - 1;
    if index >= lines.len() {
        return Vec::new();
    }

    let start = index.saturating_sub(2);
    let end = (index + 2).min(lines.len());

    (start..end)
        .map(|i| ContextLine {
            line_number: (i + 1) as u32,
            text: lines[i].trim_end_matches('\r').to_owned(),
            is_offending: i == index,
        })
        .collect()
}

/// Split a `Type: message` line
///
/// Lines without a colon are all type.
pub(crate) fn split_type_message(line: &str) -> (String, String) {
    match line.split_once(':') {
        Some((kind, message)) => (kind.trim().to_owned(), message.trim().to_owned()),
        None => (line.trim().to_owned(), String::new()),
    }
}

/// Whether `name` looks like a possibly dotted identifier (`a.b.CError`)
pub(crate) fn is_dotted_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
}

/// Parse the leading decimal digits of `text`
pub(crate) fn leading_number(text: &str) -> Option<u32> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

/// 1-based column of the first caret on a caret marker line
pub(crate) fn caret_column(line: &str) -> Option<u32> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c == '^' || c == '~') {
        return None;
    }
    let position = line.chars().position(|c| c == '^')?;
    u32::try_from(position + 1).ok()
}
