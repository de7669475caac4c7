// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised while building or decoding core structures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    /// Identifier text could not be parsed as a UUID
    #[error("Invalid gid '{0}'")]
    InvalidGid(String),

    /// Timestamp text did not match any known layout
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// A value could not be coerced to the requested type
    #[error("Cannot coerce '{key}' to {expected}: {found}")]
    Coercion {
        key: String,
        expected: &'static str,
        found: String,
    },

    /// A required metadata key is absent
    #[error("Missing metadata attribute '{0}'")]
    MissingAttribute(String),

    /// Unknown record kind name
    #[error("Unknown record kind '{0}'")]
    UnknownKind(String),
}

/// Errors raised by datatype registry lookups and registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Lookup of a kind that was never registered
    #[error("{lookup}: '{key}' is not registered")]
    NotRegistered { lookup: &'static str, key: String },

    /// The same datatype, adapter or index kind registered twice
    #[error("Duplicate registration for {0}")]
    Duplicate(String),
}

/// Result type for structure operations
pub type StructureResult<T> = Result<T, StructureError>;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
