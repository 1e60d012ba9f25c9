//! javac diagnostics and uncaught JVM exceptions

use crate::diagnostic::{Confidence, ParsedError, caret_column, leading_number, split_type_message};

const THREAD_PREFIX: &str = "Exception in thread \"";
const CAUSED_BY: &str = "Caused by:";

/// Parse compiler output for the first error reported against `file_name`
///
/// javac reports `<path>/<file_name>:<line>: error: <message>`, echoes the
/// source line and marks the column with a caret.
pub fn parse_compiler_output(output: &str, file_name: &str) -> ParsedError {
    let lines: Vec<&str> = output.lines().collect();
    let needle = format!("{file_name}:");

    let located = lines.iter().enumerate().find_map(|(index, line)| {
        let start = line.find(&needle)? + needle.len();
        let rest = &line[start..];
        let number = leading_number(rest)?;
        let message = rest.split_once(": error:")?.1.trim();
        Some((index, number, message))
    });

    match located {
        Some((index, number, message)) => {
            let mut parsed = ParsedError::new("CompileError", message, Confidence::Exact);
            parsed.raw_line = number;
            parsed.column = lines
                .iter()
                .skip(index + 1)
                .take(3)
                .find_map(|line| caret_column(line))
                .unwrap_or(0);
            parsed
        }
        None => {
            let message = lines
                .iter()
                .map(|line| line.trim())
                .find(|line| !line.is_empty())
                .unwrap_or("");
            ParsedError::new("CompileError", message, Confidence::Heuristic)
        }
    }
}

/// Parse an uncaught exception report from the JVM
///
/// With a `Caused by:` chain the last cause is reported and `chained` is set.
pub fn parse_exception(stderr: &str, file_name: &str) -> ParsedError {
    let header = stderr.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(THREAD_PREFIX)?;
        rest.split_once("\" ").map(|(_, exception)| exception)
    });

    let Some(header) = header else {
        let first = stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");
        let (error_type, message) = match split_type_message(first) {
            (kind, message) if !message.is_empty() => (kind, message),
            _ => ("Error".to_owned(), first.to_owned()),
        };
        let mut parsed = ParsedError::new(error_type, message, Confidence::Heuristic);
        parsed.raw_line = first_frame_in(stderr, file_name).unwrap_or(0);
        return parsed;
    };

    let (chained, section, exception) = match stderr.rfind(CAUSED_BY) {
        Some(index) => {
            let section = &stderr[index + CAUSED_BY.len()..];
            let exception = section.lines().next().unwrap_or("").trim();
            (true, section, exception)
        }
        None => (false, stderr, header),
    };

    let (error_type, message) = split_type_message(exception);
    let mut parsed = ParsedError::new(error_type, message, Confidence::Structured);
    parsed.chained = chained;
    parsed.raw_line = first_frame_in(section, file_name).unwrap_or(0);
    parsed
}

/// Line of the topmost `(<file_name>:<line>)` stack frame
fn first_frame_in(section: &str, file_name: &str) -> Option<u32> {
    let needle = format!("({file_name}:");
    section
        .match_indices(&needle)
        .find_map(|(index, found)| leading_number(&section[index + found.len()..]))
}
