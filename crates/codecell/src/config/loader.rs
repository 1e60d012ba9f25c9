//! Configuration file loading for codecell
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, EXAMPLE_CONFIG, StrategyKind};
use crate::types::ResourceLimits;

/// Prefix of environment variables overriding file values
pub const ENV_PREFIX: &str = "CODECELL";

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file, or the embedded defaults, then apply `CODECELL_*` overrides
    ///
    /// Nested keys use a double underscore, e.g.
    /// `CODECELL_DEFAULT_LIMITS__WALL_TIME_LIMIT=2`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = match path {
            Some(path) => ConfigBuilder::builder().add_source(File::from(path)),
            None => ConfigBuilder::builder()
                .add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent must be at least 1".to_owned(),
            ));
        }
        validate_limits("default_limits", &self.default_limits)?;

        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref limits) = lang.run.limits {
                validate_limits(&format!("languages.{id}.run.limits"), limits)?;
            }

            match (lang.strategy, &lang.compile) {
                (StrategyKind::Compiled, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' uses the compiled strategy without a compile section"
                    )));
                }
                (_, Some(compile)) => {
                    if compile.command.is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "language '{id}' has empty compile command"
                        )));
                    }
                    if compile.fallback_name.is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "language '{id}' has empty fallback_name"
                        )));
                    }
                    if let Some(ref limits) = compile.limits {
                        validate_limits(&format!("languages.{id}.compile.limits"), limits)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn validate_limits(section: &str, limits: &ResourceLimits) -> Result<(), ConfigError> {
    if let Some(seconds) = limits.wall_time_limit
        && !(seconds.is_finite() && seconds > 0.0)
    {
        return Err(ConfigError::Invalid(format!(
            "{section}: wall_time_limit must be a positive number of seconds"
        )));
    }
    Ok(())
}
