//! Node.js uncaught-error reports
//!
//! Node prints `<path>:<line>`, the offending source line, a caret line and
//! then `XxxError: message` followed by a stack. None of it is instrumented,
//! so everything here is best effort.

use crate::diagnostic::{
    Confidence, ParsedError, caret_column, is_dotted_identifier, leading_number,
    split_type_message,
};

pub fn parse_node_error(stderr: &str, file_name: &str) -> ParsedError {
    let lines: Vec<&str> = stderr.lines().collect();

    let header = lines
        .iter()
        .enumerate()
        .find_map(|(index, line)| header_line(line, file_name).map(|number| (index, number)));
    let error_line = lines
        .iter()
        .map(|line| line.trim())
        .find(|line| is_error_line(line));

    let mut parsed = match error_line {
        Some(line) => {
            let (error_type, message) = split_type_message(line);
            let confidence = if header.is_some() {
                Confidence::Structured
            } else {
                Confidence::Heuristic
            };
            ParsedError::new(error_type, message, confidence)
        }
        None => {
            // Skip the header, source echo and caret when looking for a message
            let skip = header.map_or(0, |(index, _)| index + 3);
            let message = lines
                .iter()
                .skip(skip)
                .map(|line| line.trim())
                .find(|line| !line.is_empty())
                .or_else(|| lines.iter().map(|l| l.trim()).find(|l| !l.is_empty()))
                .unwrap_or("");
            ParsedError::new("Error", message, Confidence::Heuristic)
        }
    };

    match header {
        Some((index, number)) => {
            parsed.raw_line = number;
            parsed.column = lines
                .iter()
                .skip(index + 1)
                .take(2)
                .find_map(|line| caret_column(line))
                .unwrap_or(0);
        }
        None => {
            if let Some((number, column)) = stack_location(stderr, file_name) {
                parsed.raw_line = number;
                parsed.column = column;
            }
        }
    }

    parsed
}

/// Whether a stack frame of the report points into `file_name`
///
/// Errors thrown while the program runs carry an `at ...` frame in the
/// caller's file. A file the engine failed to parse has only internal frames.
pub fn raised_in_file(stderr: &str, file_name: &str) -> bool {
    stderr
        .lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with("at "))
        .any(|frame| stack_location(frame, file_name).is_some())
}

/// `<path ending in file_name>:<line>`
fn header_line(line: &str, file_name: &str) -> Option<u32> {
    let (path, number) = line.trim_end().rsplit_once(':')?;
    if !ends_with_file(path, file_name) {
        return None;
    }
    number.parse().ok()
}

fn ends_with_file(path: &str, file_name: &str) -> bool {
    match path.strip_suffix(file_name) {
        Some(prefix) => prefix.is_empty() || prefix.ends_with('/') || prefix.ends_with('\\'),
        None => false,
    }
}

fn is_error_line(line: &str) -> bool {
    let head = line.split_once(':').map_or(line, |(head, _)| head);
    is_dotted_identifier(head) && (head.ends_with("Error") || head.ends_with("Exception"))
}

/// First `<file_name>:<line>[:<column>]` mention, as found in stack frames
fn stack_location(stderr: &str, file_name: &str) -> Option<(u32, u32)> {
    let needle = format!("{file_name}:");
    stderr.match_indices(&needle).find_map(|(index, _)| {
        let boundary = stderr[..index]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '.'));
        if !boundary {
            return None;
        }

        let rest = &stderr[index + needle.len()..];
        let line = leading_number(rest)?;
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let column = rest[digits..]
            .strip_prefix(':')
            .and_then(leading_number)
            .unwrap_or(0);
        Some((line, column))
    })
}
