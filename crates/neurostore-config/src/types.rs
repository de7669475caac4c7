// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration structs, one per section of `neurostore_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeurostoreConfig {
    pub system: SystemConfig,
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub migration: MigrationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
    pub debug: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug: false,
        }
    }
}

/// Container storage tree
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Folder holding `PROJECTS/<project>/<operation id>/` trees
    pub root_dir: PathBuf,
    /// Extension of container files, without the dot
    pub container_extension: String,
    /// LZ4-compress containers written during migration
    pub compression: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("neurostore_data"),
            container_extension: "h5".to_string(),
            compression: false,
        }
    }
}

/// Relational index database
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub database_path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("neurostore_data/neurostore.db"),
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub target_version: u32,
    /// `continue` or `halt`
    pub on_error: String,
    pub rename_legacy_files: bool,
    pub remove_operation_xml: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target_version: 5,
            on_error: "continue".to_string(),
            rename_legacy_files: true,
            remove_operation_xml: true,
        }
    }
}

/// File logging, used when the observability crate is built with `file-logging`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub retention_days: u32,
    /// Keep at least this many run folders regardless of age
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            retention_days: 7,
            retention_runs: 10,
        }
    }
}
