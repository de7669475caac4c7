// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use neurostore_container::ContainerError;
use neurostore_index::IndexError;
use neurostore_structures::{RegistryError, StructureError};
use std::path::PathBuf;
use thiserror::Error;

/// Migration errors
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Not a regular file, or missing or unknown record-kind attribute
    #[error("Incompatible container {path}: {reason}")]
    IncompatibleFormat { path: PathBuf, reason: String },

    /// An expected dataset or dataset attribute is absent
    #[error("Missing dataset '{0}'")]
    MissingDataset(String),

    /// A referenced record has no index row yet
    #[error("Dependency '{field}' ({gid}) is not indexed")]
    DependencyNotFound { field: String, gid: String },

    /// A legacy kind whose successor is missing from the registry
    #[error("Legacy kind {kind} has no usable successor: {reason}")]
    UnregisteredSuccessor { kind: String, reason: String },

    #[error("Cannot decode legacy literal: {0}")]
    LegacyLiteral(String),

    #[error("Cannot read Operation.xml: {0}")]
    OperationXml(String),

    #[error("Composite field '{field}': {reason}")]
    CompositeField { field: String, reason: String },

    /// No registered step starts at this version
    #[error("No migration step from data version {0}")]
    UnsupportedVersion(u32),

    #[error(transparent)]
    Container(ContainerError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrationError {
    pub fn incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MigrationError::IncompatibleFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by a row that is not in the index (yet).
    pub fn is_lookup_failure(&self) -> bool {
        match self {
            MigrationError::DependencyNotFound { .. } => true,
            MigrationError::Index(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<ContainerError> for MigrationError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::MissingDataset(name) => MigrationError::MissingDataset(name),
            ContainerError::Structure(e) => MigrationError::Structure(e),
            ContainerError::Registry(e) => MigrationError::Registry(e),
            other => MigrationError::Container(other),
        }
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;
