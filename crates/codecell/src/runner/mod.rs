//! Request dispatch for codecell
//!
//! Maps a language identifier onto one of the execution strategies and runs
//! it inside the spawn pool. Whatever goes wrong inside a strategy comes back
//! as an [`ExecutionResult`]; nothing is propagated to the caller.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, instrument, warn};

pub use crate::runner::type_name::detect_type_name;

mod compiled;
mod interpreted;
mod type_name;

use crate::config::{Config, Language, StrategyKind};
use crate::diagnostic::{LineMap, ParsedError};
use crate::process::{
    ProcessCommand, ProcessError, ProcessOutput, SpawnPool, Workspace, run_with_deadline,
};
use crate::types::{
    ErrorCategory, ExecutionRequest, ExecutionResult, ResourceLimits, timeout_note,
};

/// Errors that occur inside an execution strategy
///
/// These never reach the caller of [`Dispatcher::dispatch`]; they are turned
/// into `system` results.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("{0}")]
    Process(#[from] ProcessError),

    #[error("language '{0}' has no compile step")]
    NotCompiled(String),
}

/// Entry point for running code
///
/// Cheap to clone; clones share the configuration and the spawn pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Arc<Config>,
    pool: SpawnPool,
}

impl Dispatcher {
    /// Create a dispatcher with the given configuration
    pub fn new(config: Config) -> Self {
        let pool = SpawnPool::new(config.max_concurrent);
        Self {
            config: Arc::new(config),
            pool,
        }
    }

    /// Create a dispatcher with the embedded default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &SpawnPool {
        &self.pool
    }

    /// Run `source` as `language`
    ///
    /// Unknown languages are rejected before anything touches the
    /// filesystem. Each accepted request holds a pool permit for its whole
    /// lifetime and runs on its own task, so a panic inside a strategy
    /// becomes a `system` result.
    #[instrument(skip(self, source), fields(source_len = source.len()))]
    pub async fn dispatch(&self, language: &str, source: &str) -> ExecutionResult {
        let Ok(lang) = self.config.get_language(language) else {
            warn!(language, "unsupported language");
            return ExecutionResult::system(format!("Unsupported language: {language}"));
        };
        let lang = lang.clone();

        let permit = match self.pool.acquire().await {
            Ok(permit) => permit,
            Err(e) => return ExecutionResult::system(e.to_string()),
        };

        let config = Arc::clone(&self.config);
        let source = source.to_owned();
        let task = tokio::spawn(async move {
            let _permit = permit;
            run_strategy(&config, &lang, &source).await
        });

        match task.await {
            Ok(Ok(result)) => {
                debug!(
                    category = ?result.error_category,
                    line = result.line_number,
                    "request finished"
                );
                result
            }
            Ok(Err(e)) => {
                error!(error = %e, "execution failed");
                ExecutionResult::system(e.to_string())
            }
            Err(e) => {
                error!(error = %e, "execution task failed");
                ExecutionResult::system(format!("execution task failed: {e}"))
            }
        }
    }

    /// Run an [`ExecutionRequest`]
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.dispatch(&request.language, &request.source).await
    }
}

async fn run_strategy(
    config: &Config,
    language: &Language,
    source: &str,
) -> Result<ExecutionResult, ExecuteError> {
    match language.strategy {
        StrategyKind::Preamble => interpreted::run_instrumented(config, language, source).await,
        StrategyKind::Plain => interpreted::run_plain(config, language, source).await,
        StrategyKind::Compiled => compiled::compile_and_run(config, language, source).await,
    }
}

/// One compile or run step
struct Step<'a> {
    command: &'a [String],
    env: &'a HashMap<String, String>,
    limits: ResourceLimits,
}

/// Expand a step's placeholders and run it inside the workspace
async fn run_step(
    step: &Step<'_>,
    workspace: &Workspace,
    source: &Path,
    class: &str,
) -> Result<ProcessOutput, ExecuteError> {
    let dir = workspace.path().to_string_lossy();
    let argv = Language::expand_command(step.command, &source.to_string_lossy(), &dir, class);
    debug!(?argv, "running step");

    let command = ProcessCommand::from_argv(argv)?
        .envs(step.env)
        .working_dir(workspace.path())
        .limits(&step.limits);
    let output = run_with_deadline(&command).await?;

    if output.truncated {
        warn!(
            limit = step.limits.max_output_bytes(),
            "output truncated at capture limit"
        );
    }

    Ok(output)
}

/// Turn a finished run step into a result
///
/// `parse` is only consulted for a nonzero exit with something on stderr.
fn classify_run(
    output: ProcessOutput,
    budget: Duration,
    source: &str,
    line_map: LineMap,
    parse: impl FnOnce(&str) -> ParsedError,
) -> ExecutionResult {
    let stdout = output.stdout_text();
    if output.timed_out {
        return ExecutionResult::timeout(stdout, timeout_note("Execution", budget));
    }

    let stderr = output.stderr_text();
    if output.is_success() {
        return ExecutionResult::completed(stdout, stderr);
    }
    if stderr.trim().is_empty() {
        return ExecutionResult::failure(ErrorCategory::Runtime, stdout, exit_description(&output));
    }

    let diagnostic = parse(&stderr).into_diagnostic(line_map, source);
    ExecutionResult::failure(ErrorCategory::Runtime, stdout, stderr).with_diagnostic(diagnostic)
}

fn exit_description(output: &ProcessOutput) -> String {
    match (output.exit_code, output.signal) {
        (Some(code), _) => format!("process exited with status {code}"),
        (None, Some(signal)) => format!("process terminated by signal {signal}"),
        (None, None) => "process exited abnormally".to_owned(),
    }
}

/// Remove a workspace, logging instead of failing the request
fn finish(workspace: Workspace) {
    if let Err(e) = workspace.cleanup() {
        warn!(error = %e, "failed to remove workspace");
    }
}
