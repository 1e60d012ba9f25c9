use codecell::{Config, Dispatcher, ErrorCategory, TerminalState};

use super::{fixture_source, test_dispatcher};

#[tokio::test]
async fn test_single_line_class() {
    let result = test_dispatcher()
        .dispatch("java", &fixture_source("Foo.java"))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.stdout, "hi\n");
}

#[tokio::test]
async fn test_annotated_generic_public_class() {
    let result = test_dispatcher()
        .dispatch("java", &fixture_source("Annotated.java"))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.stdout, "3\n");
}

#[tokio::test]
async fn test_compile_error_skips_run() {
    let result = test_dispatcher()
        .dispatch("java", &fixture_source("Broken.java"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Compile));
    assert_eq!(result.terminal_state(), TerminalState::Crashed);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.contains("';' expected"));
    assert_eq!(result.line_number, 3);
    assert!(result.column > 0);
}

#[tokio::test]
async fn test_runtime_exception() {
    let result = test_dispatcher()
        .dispatch("java", &fixture_source("Divide.java"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Runtime));
    assert_eq!(result.stdout, "start\n");
    assert_eq!(result.line_number, 5);

    let diagnostic = result.diagnostic.unwrap();
    assert_eq!(diagnostic.error_type, "java.lang.ArithmeticException");
    assert_eq!(diagnostic.message, "/ by zero");
}

#[tokio::test]
async fn test_fallback_name_reaches_compiler() {
    let result = test_dispatcher()
        .dispatch("java", &fixture_source("NoType.java"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Compile));
    assert!(result.stderr.contains("Main.java"));
}

#[tokio::test]
async fn test_run_timeout() {
    let mut config = Config::default();
    config.default_limits.wall_time_limit = Some(1.0);
    let result = Dispatcher::new(config)
        .dispatch("java", &fixture_source("Loop.java"))
        .await;

    assert_eq!(result.error_category, Some(ErrorCategory::Timeout));
    assert_eq!(
        result.stderr,
        "Execution timed out (1 seconds). Your code might have an infinite loop."
    );
}
