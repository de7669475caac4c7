// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file
//! 2. Environment variables
//! 3. CLI arguments

use crate::{ConfigError, ConfigResult, NeurostoreConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the neurostore configuration file
///
/// Search order:
/// 1. `NEUROSTORE_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to five parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("NEUROSTORE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by NEUROSTORE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            let Some(parent) = current.parent() else {
                break;
            };
            search_paths.push(parent.join(CONFIG_FILE_NAME));
            current = parent;
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet NEUROSTORE_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML and apply environment then CLI overrides.
///
/// With no `config_path` the file is discovered with [`find_config_file`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeurostoreConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: NeurostoreConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Apply environment variable overrides
///
/// Supported variables:
/// - `NEUROSTORE_LOG_LEVEL` -> `system.log_level`
/// - `NEUROSTORE_DEBUG_MODE` -> `system.debug`
/// - `NEUROSTORE_ROOT_DIR` -> `storage.root_dir`
/// - `NEUROSTORE_COMPRESSION` -> `storage.compression`
/// - `NEUROSTORE_DATABASE` -> `index.database_path`
/// - `NEUROSTORE_ON_ERROR` -> `migration.on_error`
/// - `NEUROSTORE_LOG_DIR` -> `logging.log_dir`
pub fn apply_environment_overrides(config: &mut NeurostoreConfig) {
    if let Ok(value) = env::var("NEUROSTORE_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("NEUROSTORE_DEBUG_MODE") {
        config.system.debug = parse_flag(&value);
    }
    if let Ok(value) = env::var("NEUROSTORE_ROOT_DIR") {
        config.storage.root_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("NEUROSTORE_COMPRESSION") {
        config.storage.compression = parse_flag(&value);
    }
    if let Ok(value) = env::var("NEUROSTORE_DATABASE") {
        config.index.database_path = PathBuf::from(value);
    }
    if let Ok(value) = env::var("NEUROSTORE_ON_ERROR") {
        config.migration.on_error = value;
    }
    if let Ok(value) = env::var("NEUROSTORE_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
}

/// Apply CLI argument overrides, e.g. `{"database_path": "/tmp/x.db", "on_error": "halt"}`.
pub fn apply_cli_overrides(config: &mut NeurostoreConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("debug") {
        config.system.debug = parse_flag(value);
    }
    if let Some(value) = cli_args.get("root_dir") {
        config.storage.root_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("database_path") {
        config.index.database_path = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("on_error") {
        config.migration.on_error = value.clone();
    }
    if let Some(value) = cli_args.get("target_version") {
        if let Ok(version) = value.parse::<u32>() {
            config.migration.target_version = version;
        }
    }
    if let Some(value) = cli_args.get("rename_legacy_files") {
        config.migration.rename_legacy_files = parse_flag(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("NEUROSTORE_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("NEUROSTORE_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_missing_env_path_is_reported() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("NEUROSTORE_CONFIG_PATH", "/nonexistent/neurostore.toml");
        let result = find_config_file();
        env::remove_var("NEUROSTORE_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("NEUROSTORE_DATABASE");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[index]").unwrap();
        writeln!(file, "database_path = \"/var/lib/neurostore.db\"").unwrap();
        writeln!(file, "busy_timeout_ms = 250").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.index.database_path, PathBuf::from("/var/lib/neurostore.db"));
        assert_eq!(config.index.busy_timeout_ms, 250);
        assert_eq!(config.migration.on_error, "continue");
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[migration\non_error = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[migration]").unwrap();
        writeln!(file, "on_error = \"continue\"").unwrap();
        writeln!(file, "[index]").unwrap();
        writeln!(file, "database_path = \"file.db\"").unwrap();

        env::set_var("NEUROSTORE_ON_ERROR", "halt");
        env::set_var("NEUROSTORE_DATABASE", "env.db");

        let mut cli_args = HashMap::new();
        cli_args.insert("database_path".to_string(), "cli.db".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("NEUROSTORE_ON_ERROR");
        env::remove_var("NEUROSTORE_DATABASE");

        // CLI wins for the database, env wins for the policy
        assert_eq!(config.index.database_path, PathBuf::from("cli.db"));
        assert_eq!(config.migration.on_error, "halt");
    }
}
