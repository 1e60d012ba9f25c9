use std::time::{Duration, Instant};

use codecell::{ErrorCategory, TerminalState};

use super::{fixture_source, test_dispatcher};

#[tokio::test]
async fn test_hello() {
    let result = test_dispatcher()
        .dispatch("javascript", &fixture_source("hello.js"))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.stdout, "hello\n");
}

#[tokio::test]
async fn test_reference_error() {
    let result = test_dispatcher()
        .dispatch("javascript", &fixture_source("reference_error.js"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Runtime));
    assert_eq!(result.stdout, "before\n");
    assert_eq!(result.line_number, 3);
    assert!(result.stderr.contains("ReferenceError"));

    let diagnostic = result.diagnostic.unwrap();
    assert_eq!(diagnostic.error_type, "ReferenceError");
    assert_eq!(diagnostic.message, "undefinedFunction is not defined");
}

#[tokio::test]
async fn test_syntax_error() {
    let result = test_dispatcher()
        .dispatch("javascript", &fixture_source("syntax_error.js"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Syntax));
    assert_eq!(result.line_number, 2);
    assert!(result.stdout.is_empty());
}

#[tokio::test]
async fn test_timeout() {
    let started = Instant::now();
    let result = test_dispatcher()
        .dispatch("javascript", &fixture_source("infinite.js"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Timeout));
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn test_syntax_error_thrown_while_running_is_runtime() {
    let result = test_dispatcher()
        .dispatch("javascript", "console.log('started');\nJSON.parse('{');\n")
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Runtime));
    assert_eq!(result.terminal_state(), TerminalState::Crashed);
    assert_eq!(result.stdout, "started\n");
    assert_eq!(result.diagnostic.unwrap().error_type, "SyntaxError");
}
