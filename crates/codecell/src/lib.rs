//! A library for running short programs and explaining their failures.
//!
//! codecell takes a source string and a language name, runs the program as
//! a child process under a wall clock deadline and returns a structured
//! result: captured output, an error category and, when the failure can be
//! located, a diagnostic pointing at the offending line of the caller's
//! source.
//!
//! # Features
//!
//! - **Three strategies**: instrumented interpreters (Python), plain
//!   interpreters (JavaScript) and compile-then-run toolchains (Java).
//! - **Diagnostics**: traceback, Node and javac/JVM parsers mapped back onto the original source.
//! - **Bounded concurrency**: a spawn pool caps how many requests run children at once.
//! - **Process-group kills**: timed out programs are killed together with their descendants.
//! - **TOML configuration**: per-language commands, environment and limits.
//! - **HTML presenter**: escaped output and error fragments ready for embedding.
//!
//! ```rust,ignore
//! let dispatcher = codecell::Dispatcher::with_defaults();
//! let result = dispatcher.dispatch("python", "print('hello')").await;
//! assert_eq!(result.stdout, "hello\n");
//! ```

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language, StrategyKind};
pub use diagnostic::{Confidence, ContextLine, Diagnostic, LineMap};
pub use present::{Rendered, present};
pub use process::{ProcessError, SpawnPool};
pub use runner::{Dispatcher, ExecuteError};
pub use types::{
    ErrorCategory, ExecutionRequest, ExecutionResult, ResourceLimits, TerminalState,
};

pub mod config;
pub mod diagnostic;
pub mod present;
pub mod process;
pub mod runner;
pub mod types;
