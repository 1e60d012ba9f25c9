use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::language::{
    CompileConfig, DEFAULT_FALLBACK_NAME, FileExtension, Language, RunConfig, StrategyKind,
};
use crate::types::ResourceLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../codecell.example.toml");

/// Number of requests allowed to run children at once when unset
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for codecell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which per-request workspaces are created.
    ///
    /// The system temp dir is used when unset.
    #[serde(default)]
    pub temp_root: Option<PathBuf>,

    /// Maximum number of requests running child processes at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Default resource limits applied to every child process.
    /// Per-language step limits override individual fields.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            temp_root: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            default_limits: ResourceLimits::default(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID, ignoring ASCII case
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(id)
            .or_else(|| {
                self.languages
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(id))
                    .map(|(_, language)| language)
            })
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Sorted language IDs
    pub fn language_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Directory for per-request workspaces, `None` for the system temp dir
    pub fn workspace_root(&self) -> Option<&Path> {
        self.temp_root.as_deref()
    }

    /// Merge resource limits with defaults
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}
