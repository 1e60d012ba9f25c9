use std::time::{Duration, Instant};

use codecell::{Confidence, ErrorCategory, TerminalState, present};

use super::{fixture_source, test_dispatcher};

#[tokio::test]
async fn test_hello() {
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("hello.py"))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.error_category, None);

    let rendered = present(&result);
    assert_eq!(rendered.output.matches("output-line").count(), 1);
    assert!(rendered.error.is_none());
}

#[tokio::test]
async fn test_syntax_error_reports_source_line() {
    let source = fixture_source("syntax_error.py");
    let result = test_dispatcher().dispatch("python", &source).await;

    assert_eq!(result.error_category, Some(ErrorCategory::Syntax));
    assert_eq!(result.terminal_state(), TerminalState::SyntaxFail);
    assert_eq!(result.line_number, 4);
    assert!(result.stdout.is_empty());

    let diagnostic = result.diagnostic.as_ref().unwrap();
    assert_eq!(diagnostic.error_type, "SyntaxError");
    assert_eq!(diagnostic.confidence, Confidence::Exact);
    assert!(diagnostic.context_lines.iter().any(|l| l.is_offending && l.text == "if True"));
}

#[tokio::test]
async fn test_runtime_error_line_excludes_preamble() {
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("zero_division.py"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Runtime));
    assert_eq!(result.line_number, 3);

    let diagnostic = result.diagnostic.as_ref().unwrap();
    assert_eq!(diagnostic.error_type, "ZeroDivisionError");
    assert_eq!(diagnostic.message, "division by zero");
    assert_eq!(diagnostic.confidence, Confidence::Structured);
    assert!(result.raw_error.contains("ZeroDivisionError"));
}

#[tokio::test]
async fn test_innermost_user_frame() {
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("nested_call.py"))
        .await;

    assert_eq!(result.line_number, 2);
    assert_eq!(result.diagnostic.unwrap().error_type, "KeyError");
}

// Only the last exception of a chain is surfaced
#[tokio::test]
async fn test_chained_exception_keeps_last() {
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("chained.py"))
        .await;

    let diagnostic = result.diagnostic.unwrap();
    assert_eq!(diagnostic.error_type, "ValueError");
    assert_eq!(diagnostic.message, "wrapped");
    assert!(diagnostic.chained);
    assert_eq!(diagnostic.line, 4);
}

#[tokio::test]
async fn test_user_stderr_does_not_confuse_parser() {
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("noisy_stderr.py"))
        .await;

    assert_eq!(result.stdout, "before\n");
    assert_eq!(result.line_number, 5);
    assert_eq!(result.diagnostic.unwrap().error_type, "RuntimeError");
}

#[tokio::test]
async fn test_timeout_kills_and_returns_promptly() {
    let started = Instant::now();
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("infinite.py"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Timeout));
    assert_eq!(
        result.stderr,
        "Execution timed out (2 seconds). Your code might have an infinite loop."
    );
    assert!(result.diagnostic.is_none());
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn test_partial_stdout_kept_on_crash() {
    let result = test_dispatcher()
        .dispatch("python", "print('one')\nprint('two')\nraise SystemError('x')\n")
        .await;

    assert_eq!(result.stdout, "one\ntwo\n");
    assert_eq!(result.line_number, 3);
}

#[tokio::test]
async fn test_stderr_on_success_is_passed_through() {
    let result = test_dispatcher()
        .dispatch("python", "import sys\nsys.stderr.write('careful\\n')\n")
        .await;

    assert!(result.is_success());
    assert_eq!(result.stderr, "careful\n");
}

#[tokio::test]
async fn test_silent_exit_status() {
    let result = test_dispatcher()
        .dispatch("python", "import sys\nsys.exit(2)\n")
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Runtime));
    assert_eq!(result.stderr, "process exited with status 2");
}

#[tokio::test]
async fn test_language_is_case_insensitive() {
    let result = test_dispatcher().dispatch("Python", "print(1)").await;
    assert_eq!(result.stdout, "1\n");
}

#[tokio::test]
async fn test_future_import_runs() {
    let result = test_dispatcher()
        .dispatch("python", &fixture_source("future_import.py"))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.stdout, "hi\n");
}

#[tokio::test]
async fn test_error_after_future_import_keeps_line() {
    let source = "from __future__ import annotations\n\nx: int = 1\nraise ValueError('late')\n";
    let result = test_dispatcher().dispatch("python", source).await;

    assert_eq!(result.error_category, Some(ErrorCategory::Runtime));
    assert_eq!(result.line_number, 4);
    assert_eq!(result.diagnostic.unwrap().error_type, "ValueError");
}

#[tokio::test]
async fn test_modern_syntax_is_not_rejected() {
    let source = "command = ['go', 'north']\n\
                  match command:\n    \
                  case ['go', direction]:\n        \
                  print(direction)\n    \
                  case _:\n        \
                  print('?')\n";
    let result = test_dispatcher().dispatch("python", source).await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.stdout, "north\n");
}
