use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::ResourceLimits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Type name used when none can be detected in the source
pub const DEFAULT_FALLBACK_NAME: &str = "Main";

/// How a language's source is turned into a running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Syntax-checked, instrumented with an exception hook, then interpreted
    Preamble,
    /// Interpreted verbatim
    Plain,
    /// Compiled, then run
    Compiled,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::Preamble => "preamble",
            StrategyKind::Plain => "plain",
            StrategyKind::Compiled => "compiled",
        })
    }
}

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "Python 3")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    pub strategy: StrategyKind,

    /// Compilation configuration, required by the `compiled` strategy
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.strategy == StrategyKind::Compiled
    }

    /// Source file name for interpreted languages
    pub fn source_name(&self) -> String {
        self.source_name_for("main")
    }

    /// Source file name for a file whose stem must match a type name
    pub fn source_name_for(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension)
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], source: &str, dir: &str, class: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{dir}", dir)
                    .replace("{class}", class)
            })
            .collect()
    }
}

/// File extension without dot (e.g., "py")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl fmt::Display for FileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {dir}, {class}
    pub command: Vec<String>,

    /// Type name used when the source declares none
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for compilation (overrides the compile defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {dir}, {class}
    pub command: Vec<String>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

fn default_fallback_name() -> String {
    DEFAULT_FALLBACK_NAME.to_owned()
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn file_extension_rejects_all_strings_with_slash(s in ".*/.*") {
            prop_assert!(FileExtension::new(&s).is_err());
        }

        #[test]
        fn file_extension_accepts_alphanumeric(s in "[a-zA-Z0-9_-]+") {
            prop_assert!(FileExtension::new(&s).is_ok());
        }

        #[test]
        fn expand_command_preserves_args_without_placeholders(
            args in proptest::collection::vec("[a-z]+", 0..8)
        ) {
            let result = Language::expand_command(&args, "/w/main.py", "/w", "Main");
            prop_assert_eq!(result, args);
        }
    }
}
