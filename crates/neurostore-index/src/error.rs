// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Relational index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// Lookup found no row
    #[error("No {entity} found for {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded back into its type
    #[error("Integrity error: {0}")]
    Integrity(String),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound { .. })
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
