use codecell::config::{Config, ConfigError, StrategyKind};

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_full.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.max_concurrent, 2);
    assert_eq!(config.default_limits.wall_time_limit, Some(2.0));
    assert_eq!(config.default_limits.max_output, Some(256));
    assert_eq!(config.languages["python"].strategy, StrategyKind::Preamble);

    let compile = config.languages["java"].compile.as_ref().unwrap();
    assert_eq!(compile.fallback_name, "Main");
    assert_eq!(compile.limits.as_ref().unwrap().wall_time_limit, Some(30.0));
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_minimal.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key("test"));
    assert!(config.temp_root.is_none());
}

#[test]
fn test_load_with_file_path() {
    let path = format!("{FIXTURES_PATH}/configs/valid_minimal.toml");
    let config = Config::load(Some(std::path::Path::new(&path))).expect("Failed to load config");
    assert!(config.languages.contains_key("test"));
}

#[test]
fn test_load_invalid_empty_name() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_name.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_run_command.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_compiled_without_compile() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_compiled_without_compile.toml");
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_load_invalid_extension() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_extension.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_missing_file() {
    let path = format!("{FIXTURES_PATH}/configs/does_not_exist.toml");
    assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
}
