//! Compile-then-run strategy
//!
//! The source is written to a file named after the type it declares, the
//! compiler runs under its own deadline and only a clean compile is run.

use tracing::{debug, instrument};

use crate::config::{CompileConfig, Config, Language};
use crate::diagnostic::{LineMap, java};
use crate::process::Workspace;
use crate::runner::{ExecuteError, Step, classify_run, detect_type_name, finish, run_step};
use crate::types::{ErrorCategory, ExecutionResult, ResourceLimits, timeout_note};

/// Wall clock budget of the compile step when the language sets none, in seconds
pub const DEFAULT_COMPILE_WALL_TIME: f64 = 15.0;

/// Compile limits: config defaults, then the compile default budget, then
/// the language's compile limits
fn compile_limits(config: &Config, compile: &CompileConfig) -> ResourceLimits {
    let base = config
        .default_limits
        .with_overrides(&ResourceLimits::unset().with_wall_time_limit(DEFAULT_COMPILE_WALL_TIME));
    match compile.limits {
        Some(ref limits) => base.with_overrides(limits),
        None => base,
    }
}

/// Compile and run a program
#[instrument(skip_all, fields(language = %language.name))]
pub(crate) async fn compile_and_run(
    config: &Config,
    language: &Language,
    source: &str,
) -> Result<ExecutionResult, ExecuteError> {
    let compile = language
        .compile
        .as_ref()
        .ok_or_else(|| ExecuteError::NotCompiled(language.name.clone()))?;

    let class = detect_type_name(source).unwrap_or_else(|| compile.fallback_name.clone());
    let source_name = language.source_name_for(&class);

    let workspace = Workspace::create(config.workspace_root())?;
    let result = compile_then_run(
        config,
        language,
        compile,
        &workspace,
        source,
        &class,
        &source_name,
    )
    .await;
    finish(workspace);
    result
}

async fn compile_then_run(
    config: &Config,
    language: &Language,
    compile: &CompileConfig,
    workspace: &Workspace,
    source: &str,
    class: &str,
    source_name: &str,
) -> Result<ExecutionResult, ExecuteError> {
    let path = workspace.write_file(source_name, source.as_bytes()).await?;
    debug!(class, source_name, "wrote source file");

    let compile_step = Step {
        command: &compile.command,
        env: &compile.env,
        limits: compile_limits(config, compile),
    };
    let output = run_step(&compile_step, workspace, &path, class).await?;

    if output.timed_out {
        return Ok(ExecutionResult::timeout(
            output.stdout_text(),
            timeout_note("Compilation", compile_step.limits.wall_time()),
        ));
    }

    if !output.is_success() {
        let mut text = output.combined_text();
        if text.trim().is_empty() {
            text = match output.exit_code {
                Some(code) => format!("compiler exited with status {code}"),
                None => "compiler terminated abnormally".to_owned(),
            };
        }
        debug!(exit_code = ?output.exit_code, "compilation failed");

        let diagnostic = java::parse_compiler_output(&text, source_name)
            .into_diagnostic(LineMap::IDENTITY, source);
        return Ok(
            ExecutionResult::failure(ErrorCategory::Compile, String::new(), text)
                .with_diagnostic(diagnostic),
        );
    }

    debug!(elapsed = ?output.elapsed, "compilation complete");

    let run = Step {
        command: &language.run.command,
        env: &language.run.env,
        limits: config.effective_limits(language.run.limits.as_ref()),
    };
    let output = run_step(&run, workspace, &path, class).await?;

    Ok(classify_run(
        output,
        run.limits.wall_time(),
        source,
        LineMap::IDENTITY,
        |stderr| java::parse_exception(stderr, source_name),
    ))
}
