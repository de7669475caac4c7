// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use neurostore_structures::{RegistryError, StructureError};
use thiserror::Error;

/// Container I/O errors
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: u32,
        expected_version: u32,
    },

    #[error("Invalid magic number: expected NSTOR, got {0:?}")]
    InvalidMagic([u8; 5]),

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Compression error: {0}")]
    Compression(String),

    /// Named dataset does not exist in the container
    #[error("Missing dataset '{0}'")]
    MissingDataset(String),

    #[error("Dataset '{dataset}' has unexpected content: {reason}")]
    InvalidDataset { dataset: String, reason: String },

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;
