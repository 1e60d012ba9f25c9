//! HTML rendering of execution results
//!
//! The caller embeds these fragments in its own markup, so every piece of
//! user-controlled text passes through [`escape_html`] first.

use std::fmt::Write as _;

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::types::{ErrorCategory, ExecutionResult};

/// Rendered fragments for one result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    /// Program output, always present
    pub output: String,
    /// Error panel, absent on success
    pub error: Option<String>,
}

/// Render a result into its output and error fragments
pub fn present(result: &ExecutionResult) -> Rendered {
    let output = render_output(&result.stdout);
    let error = result.error_category.map(|category| match category {
        ErrorCategory::Timeout => format!(
            "<div class='error-timeout'>{}</div>",
            escape_html(&result.stderr)
        ),
        ErrorCategory::System => format!(
            "<div class='execution-error'>Execution error: {}</div>",
            escape_html(&result.stderr)
        ),
        _ => match result.diagnostic {
            Some(ref diagnostic) => render_diagnostic(diagnostic, category),
            None => render_unparsed(&result.stderr, category),
        },
    });

    Rendered { output, error }
}

/// Escape the five HTML metacharacters
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Wrap each output line; empty output gets an explicit marker
pub fn render_output(stdout: &str) -> String {
    let body = stdout.strip_suffix('\n').unwrap_or(stdout);
    if body.is_empty() {
        return "<div class='output-empty'>No output</div>".to_owned();
    }

    let mut html = String::from("<div class='output-stdout'>");
    for line in body.split('\n') {
        let _ = write!(
            html,
            "<div class='output-line'>{}</div>",
            escape_html(line.trim_end_matches('\r'))
        );
    }
    html.push_str("</div>");
    html
}

/// Header, source context and explanation for a located error
pub fn render_diagnostic(diagnostic: &Diagnostic, category: ErrorCategory) -> String {
    let mut html = header(&diagnostic.error_type, &diagnostic.message);

    if !diagnostic.context_lines.is_empty() {
        html.push_str("<div class='code-context'>");
        for line in &diagnostic.context_lines {
            let text = escape_html(&line.text);
            if line.is_offending {
                let _ = write!(
                    html,
                    "<pre class='error-line'><span class='line-number'>{:>3}</span> {text}</pre>",
                    line.line_number
                );
            } else {
                let _ = write!(
                    html,
                    "<pre><span class='line-number'>{:>3}</span> {text}</pre>",
                    line.line_number
                );
            }

            if line.is_offending && category == ErrorCategory::Syntax && diagnostic.column > 0 {
                let position = (diagnostic.column as usize - 1).min(line.text.chars().count());
                let _ = write!(
                    html,
                    "<pre class='error-indicator'><span class='line-number'>   </span> {}^</pre>",
                    " ".repeat(position)
                );
            }
        }
        html.push_str("</div>");
    }

    push_explanation(&mut html, category);
    html
}

/// Error panel for a failure whose output could not be parsed
fn render_unparsed(stderr: &str, category: ErrorCategory) -> String {
    let mut html = header("Error", stderr.trim());
    push_explanation(&mut html, category);
    html
}

fn header(error_type: &str, message: &str) -> String {
    if message.is_empty() {
        format!(
            "<div class='error-header'><span class='error-type'>{}</span></div>",
            escape_html(error_type)
        )
    } else {
        format!(
            "<div class='error-header'><span class='error-type'>{}</span>: {}</div>",
            escape_html(error_type),
            escape_html(message)
        )
    }
}

fn push_explanation(html: &mut String, category: ErrorCategory) {
    if let Some(explanation) = category.explanation() {
        let _ = write!(html, "<div class='error-explanation'>{explanation}</div>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Confidence, LineMap, ParsedError};

    #[test]
    fn escapes_all_five_metacharacters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn single_line_has_no_phantom_trailing_line() {
        let html = render_output("hello\n");
        assert_eq!(
            html,
            "<div class='output-stdout'><div class='output-line'>hello</div></div>"
        );
        assert_eq!(html.matches("output-line").count(), 1);
    }

    #[test]
    fn inner_blank_lines_are_kept() {
        let html = render_output("a\n\nb\n");
        assert_eq!(html.matches("output-line").count(), 3);
    }

    #[test]
    fn empty_output_marker() {
        assert_eq!(render_output(""), "<div class='output-empty'>No output</div>");
        assert_eq!(render_output("\n"), "<div class='output-empty'>No output</div>");
    }

    #[test]
    fn output_is_escaped() {
        let html = render_output("<script>alert(1)</script>\n");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    fn syntax_diagnostic(column: u32) -> Diagnostic {
        let mut parsed = ParsedError::new("SyntaxError", "invalid syntax", Confidence::Exact);
        parsed.raw_line = 3;
        parsed.column = column;
        parsed.into_diagnostic(LineMap::IDENTITY, "a = 1\nb = 2\nif x <\nc = 3\nd = 4")
    }

    #[test]
    fn diagnostic_context_and_caret() {
        let html = render_diagnostic(&syntax_diagnostic(5), ErrorCategory::Syntax);

        assert!(html.starts_with(
            "<div class='error-header'><span class='error-type'>SyntaxError</span>: invalid syntax</div>"
        ));
        assert!(html.contains("<pre><span class='line-number'>  1</span> a = 1</pre>"));
        assert!(html.contains(
            "<pre class='error-line'><span class='line-number'>  3</span> if x &lt;</pre>"
        ));
        assert!(html.contains(
            "<pre class='error-indicator'><span class='line-number'>   </span>     ^</pre>"
        ));
        assert!(html.contains("<span class='line-number'>  4</span>"));
        assert!(!html.contains("<span class='line-number'>  5</span>"));
        assert!(html.ends_with(
            "<div class='error-explanation'>This is a syntax error. You need to fix the syntax before the code can run.</div>"
        ));
    }

    #[test]
    fn caret_is_clamped_to_line_length() {
        let html = render_diagnostic(&syntax_diagnostic(80), ErrorCategory::Syntax);
        // "if x <" is 6 characters long
        assert!(html.contains("</span>       ^</pre>"));
    }

    #[test]
    fn runtime_errors_have_no_caret() {
        let html = render_diagnostic(&syntax_diagnostic(5), ErrorCategory::Runtime);
        assert!(!html.contains("error-indicator"));
        assert!(html.contains("This is a runtime error."));
    }

    #[test]
    fn present_success() {
        let rendered = present(&ExecutionResult::completed("hi\n".into(), String::new()));
        assert_eq!(rendered.error, None);
        assert!(rendered.output.contains("<div class='output-line'>hi</div>"));
    }

    #[test]
    fn present_timeout_keeps_partial_output() {
        let result = ExecutionResult::timeout(
            "tick\n".into(),
            "Execution timed out (5 seconds). Your code might have an infinite loop.",
        );
        let rendered = present(&result);
        assert!(rendered.output.contains("tick"));
        assert_eq!(
            rendered.error.as_deref(),
            Some(
                "<div class='error-timeout'>Execution timed out (5 seconds). Your code might have an infinite loop.</div>"
            )
        );
    }

    #[test]
    fn present_system_error() {
        let rendered = present(&ExecutionResult::system("Unsupported language: <b>"));
        assert_eq!(
            rendered.error.as_deref(),
            Some("<div class='execution-error'>Execution error: Unsupported language: &lt;b&gt;</div>")
        );
        assert_eq!(rendered.output, "<div class='output-empty'>No output</div>");
    }

    #[test]
    fn present_unparsed_runtime_error() {
        let result = ExecutionResult::failure(
            ErrorCategory::Runtime,
            String::new(),
            "process exited with status 3".into(),
        );
        let error = present(&result).error.unwrap();
        assert!(
            error.contains("<span class='error-type'>Error</span>: process exited with status 3")
        );
    }
}
