//! Command builder for interpreter and compiler processes

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::process::ProcessError;
use crate::types::ResourceLimits;

/// Builder for a child process run under a deadline
///
/// The child inherits the parent's environment; `env` entries are added on
/// top of it.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    /// Program, looked up on PATH
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) env: HashMap<String, String>,
    pub(crate) working_dir: Option<PathBuf>,
    /// Bytes written to stdin; stdin is /dev/null when unset
    pub(crate) stdin: Option<Vec<u8>>,
    /// Wall clock deadline
    pub(crate) timeout: Duration,
    /// Bytes kept per output stream
    pub(crate) max_output: usize,
}

impl ProcessCommand {
    /// Create a command for `program` with default limits
    pub fn new(program: impl Into<String>) -> Self {
        let limits = ResourceLimits::default();
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
            stdin: None,
            timeout: limits.wall_time(),
            max_output: limits.max_output_bytes(),
        }
    }

    /// Create a command from a program followed by its arguments
    pub fn from_argv(
        argv: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ProcessError> {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().ok_or(ProcessError::EmptyCommand)?;
        if program.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self::new(program).args(argv))
    }

    /// Append arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set several environment variables
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Feed `data` to the child's stdin
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Set the wall clock deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply wall time and output limits
    pub fn limits(mut self, limits: &ResourceLimits) -> Self {
        self.timeout = limits.wall_time();
        self.max_output = limits.max_output_bytes();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the tokio command
    ///
    /// The child gets its own process group so the whole tree can be killed,
    /// and is killed if the handle is dropped before it exits.
    pub fn build(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        command
    }
}
