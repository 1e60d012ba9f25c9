//! Python instrumentation, syntax checking and traceback parsing

use std::ffi::OsStr;
use std::path::Path;

use rustpython_parser::Mode;

use crate::diagnostic::{
    Confidence, LineMap, ParsedError, is_dotted_identifier, leading_number, split_type_message,
};

/// First line the exception hook writes before a traceback
pub const TRACEBACK_BEGIN: &str = "---- ERROR TRACEBACK ----";

/// Last line the exception hook writes after a traceback
pub const TRACEBACK_END: &str = "----- END TRACEBACK -----";

/// Instrumentation prepended to every program
///
/// Installs an exception hook that brackets uncaught tracebacks with
/// [`TRACEBACK_BEGIN`] and [`TRACEBACK_END`] on stderr.
pub const PREAMBLE: &str = r#"import sys as _codecell_sys, traceback as _codecell_traceback
def _codecell_excepthook(exc_type, exc_value, exc_tb):
    _codecell_sys.stdout.flush()
    _codecell_sys.stderr.write("---- ERROR TRACEBACK ----\n")
    _codecell_sys.stderr.write("".join(_codecell_traceback.format_exception(exc_type, exc_value, exc_tb)))
    _codecell_sys.stderr.write("----- END TRACEBACK -----\n")
    _codecell_sys.stderr.flush()
_codecell_sys.excepthook = _codecell_excepthook
"#;

/// Name the parser reports syntax errors against
const SOURCE_PATH: &str = "<source>";

const CHAIN_SEPARATORS: [&str; 2] = [
    "During handling of the above exception, another exception occurred:",
    "The above exception was the direct cause of the following exception:",
];

/// Program text with instrumentation applied
#[derive(Debug, Clone)]
pub struct Instrumented {
    pub text: String,
    /// Where the preamble sits relative to the caller's lines
    pub line_map: LineMap,
}

/// Insert [`PREAMBLE`] into `source`
pub fn instrument(source: &str) -> Instrumented {
    instrument_with(PREAMBLE, source)
}

/// Insert an arbitrary preamble, counting its lines
///
/// A module docstring and `from __future__` imports must open the file, so
/// the lines up to the last future import stay ahead of the preamble.
pub fn instrument_with(preamble: &str, source: &str) -> Instrumented {
    let kept = future_prefix_len(source);
    let split = source
        .split_inclusive('\n')
        .take(kept)
        .map(str::len)
        .sum::<usize>();
    let (head, rest) = source.split_at(split);

    let mut text = String::with_capacity(preamble.len() + source.len() + 2);
    text.push_str(head);
    if !head.is_empty() && !head.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(preamble);
    if !preamble.is_empty() && !preamble.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(rest);

    Instrumented {
        text,
        line_map: LineMap {
            kept,
            injected: preamble.lines().count(),
        },
    }
}

/// Number of leading lines up to and including the last `from __future__`
/// import, 0 when there is none
fn future_prefix_len(source: &str) -> usize {
    let lines: Vec<&str> = source.lines().collect();
    let mut index = 0;
    let mut prefix = 0;
    let mut docstring_allowed = true;

    while index < lines.len() {
        let trimmed = lines[index].trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            index += 1;
            continue;
        }

        if docstring_allowed {
            docstring_allowed = false;
            if let Some(end) = docstring_end(&lines, index) {
                index = end + 1;
                continue;
            }
        }

        if !is_future_import(trimmed) {
            break;
        }
        index = statement_end(&lines, index) + 1;
        prefix = index;
    }

    prefix
}

fn is_future_import(line: &str) -> bool {
    let mut words = line.split_whitespace();
    words.next() == Some("from")
        && words.next() == Some("__future__")
        && words.next().is_some_and(|word| word == "import" || word.starts_with("import("))
}

/// Index of the last line of a string literal statement starting at `start`
fn docstring_end(lines: &[&str], start: usize) -> Option<usize> {
    let line = lines[start].trim();
    let body = line.trim_start_matches(['r', 'R', 'u', 'U']);
    if body.len() + 1 < line.len() {
        return None;
    }

    for quote in ["\"\"\"", "'''"] {
        if let Some(after) = body.strip_prefix(quote) {
            if after.contains(quote) {
                return Some(start);
            }
            return (start + 1..lines.len()).find(|&i| lines[i].contains(quote));
        }
    }

    let quote = body.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    (body.len() > 1 && body.ends_with(quote)).then_some(start)
}

/// Index of the last line of an import statement starting at `start`
fn statement_end(lines: &[&str], start: usize) -> usize {
    let mut index = start;
    if lines[start].contains('(') && !lines[start].contains(')') {
        while index + 1 < lines.len() && !lines[index].contains(')') {
            index += 1;
        }
        return index;
    }
    while index + 1 < lines.len() && lines[index].trim_end().ends_with('\\') {
        index += 1;
    }
    index
}

/// Parse `source` without running it
///
/// Returns the first syntax error, located in the caller's source. Errors
/// reported on a line holding an f-string are left to the interpreter,
/// which accepts f-string forms the parser predates.
pub fn check_syntax(source: &str) -> Option<ParsedError> {
    let error = rustpython_parser::parse(source, Mode::Module, SOURCE_PATH).err()?;

    let (line, column) = line_and_column(source, u32::from(error.offset) as usize);
    let text = source.split('\n').nth(line as usize - 1).unwrap_or("");
    if has_fstring(text) {
        return None;
    }

    let message = error.error.to_string();
    let lowered = message.to_lowercase();
    let error_type = if lowered.contains("indent") {
        "IndentationError"
    } else if lowered.contains("tab") {
        "TabError"
    } else {
        "SyntaxError"
    };

    let mut parsed = ParsedError::new(error_type, message, Confidence::Exact);
    parsed.raw_line = line;
    parsed.column = column;
    Some(parsed)
}

/// Whether a diagnostic type is one of Python's compile-time errors
pub fn is_syntax_error(error_type: &str) -> bool {
    matches!(error_type, "SyntaxError" | "IndentationError" | "TabError")
}

/// 1-based line and column of a byte offset
fn line_and_column(source: &str, offset: usize) -> (u32, u32) {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let before = &source[..offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line = before.matches('\n').count() + 1;
    let column = before[line_start..].chars().count() + 1;
    (
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}

/// Whether `line` opens an f-string literal (`f"`, `rf'`, `F"""` and so on)
fn has_fstring(line: &str) -> bool {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let quote = bytes[i];
        if quote == b'#' {
            return false;
        }
        if quote != b'"' && quote != b'\'' {
            i += 1;
            continue;
        }

        let start = bytes[..i]
            .iter()
            .rposition(|c| !c.is_ascii_alphanumeric() && *c != b'_')
            .map_or(0, |p| p + 1);
        let prefix = &bytes[start..i];
        if prefix.len() <= 2
            && prefix.iter().any(|c| c.eq_ignore_ascii_case(&b'f'))
            && prefix.iter().all(|c| b"rRfF".contains(c))
        {
            return true;
        }

        // Skip the rest of the literal
        let delimiter = [quote; 3];
        let width = if bytes[i..].starts_with(&delimiter) { 3 } else { 1 };
        i += width;
        while i < bytes.len() {
            if bytes[i] == b'\\' {
                i += 2;
            } else if bytes[i..].starts_with(&delimiter[..width]) {
                i += width;
                break;
            } else {
                i += 1;
            }
        }
    }
    false
}

/// Parse interpreter stderr after a failed run
///
/// Uses the delimited block written by the exception hook when present,
/// otherwise falls back to a best-effort scan of the whole stream.
/// `file_name` is the name of the instrumented file, used to pick frames
/// belonging to the caller's code.
pub fn parse_traceback(stderr: &str, file_name: &str) -> ParsedError {
    match delimited_block(stderr) {
        Some(block) => parse_structured(block, file_name),
        None => parse_unstructured(stderr),
    }
}

/// Text between the last begin delimiter and the end delimiter after it
fn delimited_block(stderr: &str) -> Option<&str> {
    let start = stderr.rfind(TRACEBACK_BEGIN)? + TRACEBACK_BEGIN.len();
    let rest = &stderr[start..];
    let end = rest.rfind(TRACEBACK_END).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_structured(block: &str, file_name: &str) -> ParsedError {
    let (chained, section) = last_chain_link(block);

    let exception_line = section
        .lines()
        .rev()
        .map(|line| line.trim_start_matches(|c: char| c.is_whitespace() || c == '|').trim())
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let (error_type, message) = split_type_message(exception_line);

    let mut parsed = ParsedError::new(error_type, message, Confidence::Structured);
    parsed.chained = chained;
    parsed.raw_line = innermost_frame_in(section, file_name).unwrap_or(0);
    parsed
}

fn parse_unstructured(stderr: &str) -> ParsedError {
    let text = stderr.trim();
    let last = text.lines().rev().find(|line| !line.trim().is_empty());

    let (error_type, message) = match last.map(split_type_message) {
        Some((kind, message)) if is_dotted_identifier(&kind) => (kind, message),
        _ => first_line_guess(text),
    };

    let mut parsed = ParsedError::new(error_type, message, Confidence::Heuristic);
    parsed.raw_line = find_line_token(stderr).unwrap_or(0);
    parsed
}

/// Type from the last word before the first colon of the first line
fn first_line_guess(text: &str) -> (String, String) {
    let first = text.lines().next().unwrap_or("");
    match first.split_once(':') {
        Some((head, message)) => (
            head.split_whitespace().last().unwrap_or("Error").to_owned(),
            message.trim().to_owned(),
        ),
        None => ("Error".to_owned(), text.to_owned()),
    }
}

fn find_line_token(text: &str) -> Option<u32> {
    text.match_indices("line ")
        .find_map(|(index, token)| leading_number(&text[index + token.len()..]))
}

/// Section of the block describing the last exception in a chain
fn last_chain_link(block: &str) -> (bool, &str) {
    let cut = CHAIN_SEPARATORS
        .iter()
        .filter_map(|separator| block.rfind(separator).map(|i| i + separator.len()))
        .max();

    match cut {
        Some(index) => (true, &block[index..]),
        None => (false, block),
    }
}

/// Line of the innermost frame that belongs to `file_name`
fn innermost_frame_in(section: &str, file_name: &str) -> Option<u32> {
    section
        .lines()
        .filter_map(parse_frame)
        .filter(|(path, _)| Path::new(path).file_name() == Some(OsStr::new(file_name)))
        .map(|(_, line)| line)
        .last()
}

/// `File "<path>", line <n>, in <scope>`
fn parse_frame(line: &str) -> Option<(&str, u32)> {
    let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == '|' || c == '+');
    let rest = line.strip_prefix("File \"")?;
    let (path, tail) = rest.split_once("\", line ")?;
    Some((path, leading_number(tail)?))
}
