//! Interpreted strategies
//!
//! `preamble` parses the source up front, inserts the exception hook and
//! maps traceback lines back onto the caller's source. `plain` runs the
//! source verbatim and parses whatever the interpreter prints.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::diagnostic::{Confidence, LineMap, node, python};
use crate::process::Workspace;
use crate::runner::{ExecuteError, Step, classify_run, finish, run_step};
use crate::types::{ErrorCategory, ExecutionResult};

/// Run an instrumented interpreted program
#[instrument(skip_all, fields(language = %language.name))]
pub(crate) async fn run_instrumented(
    config: &Config,
    language: &Language,
    source: &str,
) -> Result<ExecutionResult, ExecuteError> {
    if let Some(parsed) = python::check_syntax(source) {
        let diagnostic = parsed.into_diagnostic(LineMap::IDENTITY, source);
        debug!(line = diagnostic.line, "syntax check failed");
        let message = diagnostic.header();
        return Ok(
            ExecutionResult::failure(ErrorCategory::Syntax, String::new(), message)
                .with_diagnostic(diagnostic),
        );
    }

    let step = Step {
        command: &language.run.command,
        env: &language.run.env,
        limits: config.effective_limits(language.run.limits.as_ref()),
    };
    let instrumented = python::instrument(source);
    let source_name = language.source_name();

    let workspace = Workspace::create(config.workspace_root())?;
    let path = workspace
        .write_file(&source_name, instrumented.text.as_bytes())
        .await?;
    debug!(source_name, line_map = ?instrumented.line_map, "wrote instrumented source");

    let output = run_step(&step, &workspace, &path, "").await;
    finish(workspace);
    let output = output?;

    let mut result = classify_run(
        output,
        step.limits.wall_time(),
        source,
        instrumented.line_map,
        |stderr| python::parse_traceback(stderr, &source_name),
    );

    // The interpreter refused to compile the file, so the hook never ran
    if result.diagnostic.as_ref().is_some_and(|d| {
        d.confidence == Confidence::Heuristic && python::is_syntax_error(&d.error_type)
    }) {
        result.error_category = Some(ErrorCategory::Syntax);
    }

    Ok(result)
}

/// Run an interpreted program verbatim
#[instrument(skip_all, fields(language = %language.name))]
pub(crate) async fn run_plain(
    config: &Config,
    language: &Language,
    source: &str,
) -> Result<ExecutionResult, ExecuteError> {
    let step = Step {
        command: &language.run.command,
        env: &language.run.env,
        limits: config.effective_limits(language.run.limits.as_ref()),
    };
    let source_name = language.source_name();

    let workspace = Workspace::create(config.workspace_root())?;
    let path = workspace.write_file(&source_name, source.as_bytes()).await?;
    debug!(source_name, "wrote source file");

    let output = run_step(&step, &workspace, &path, "").await;
    finish(workspace);
    let output = output?;

    let mut result = classify_run(
        output,
        step.limits.wall_time(),
        source,
        LineMap::IDENTITY,
        |stderr| node::parse_node_error(stderr, &source_name),
    );

    // Rejected before any of the program ran; a SyntaxError thrown by
    // JSON.parse or eval has a stack frame in the caller's file
    if result
        .diagnostic
        .as_ref()
        .is_some_and(|d| d.error_type == "SyntaxError")
        && !node::raised_in_file(&result.raw_error, &source_name)
    {
        result.error_category = Some(ErrorCategory::Syntax);
    }

    Ok(result)
}
