// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation: value ranges, enumerated settings and required paths.

use crate::{ConfigError, ConfigResult, NeurostoreConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const ERROR_POLICIES: &[&str] = &["continue", "halt"];

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &NeurostoreConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &NeurostoreConfig, errors: &mut Vec<ConfigValidationError>) {
    let required = [
        ("storage.root_dir", config.storage.root_dir.as_os_str().is_empty()),
        ("index.database_path", config.index.database_path.as_os_str().is_empty()),
        ("logging.log_dir", config.logging.log_dir.as_os_str().is_empty()),
    ];
    for (field, missing) in required {
        if missing {
            errors.push(ConfigValidationError::MissingRequired {
                field: field.to_string(),
            });
        }
    }
}

fn validate_value_ranges(config: &NeurostoreConfig, errors: &mut Vec<ConfigValidationError>) {
    if !LOG_LEVELS.contains(&config.system.log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!("must be one of {:?}", LOG_LEVELS),
        });
    }

    let extension = &config.storage.container_extension;
    if extension.is_empty() || extension.starts_with('.') {
        errors.push(ConfigValidationError::InvalidValue {
            field: "storage.container_extension".to_string(),
            reason: "must be a non-empty extension without the leading dot".to_string(),
        });
    }

    if config.index.busy_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "index.busy_timeout_ms".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.migration.target_version < 5 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "migration.target_version".to_string(),
            reason: "must be at least 5".to_string(),
        });
    }

    if !ERROR_POLICIES.contains(&config.migration.on_error.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "migration.on_error".to_string(),
            reason: format!("must be one of {:?}", ERROR_POLICIES),
        });
    }

    if config.logging.retention_days == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_days".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let config = NeurostoreConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unknown_error_policy() {
        let mut config = NeurostoreConfig::default();
        config.migration.on_error = "retry".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("migration.on_error"));
    }

    #[test]
    fn test_missing_required_field() {
        let mut config = NeurostoreConfig::default();
        config.index.database_path = PathBuf::new();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("index.database_path"));
    }

    #[test]
    fn test_all_problems_are_reported() {
        let mut config = NeurostoreConfig::default();
        config.system.log_level = "WARNING".to_string();
        config.storage.container_extension = ".h5".to_string();
        config.migration.target_version = 4;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("system.log_level"));
        assert!(message.contains("storage.container_extension"));
        assert!(message.contains("migration.target_version"));
    }
}
