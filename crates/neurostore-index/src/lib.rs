// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurostore Index
//!
//! Relational index of records, operations, projects, algorithms, bursts and persisted
//! configuration objects. The migration engine only sees the [`IndexDao`] facade;
//! [`SqliteIndex`] is the shipped implementation.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod dao;
pub mod entities;
mod error;
mod sqlite;

pub use dao::IndexDao;
pub use entities::{
    metadata_to_json, Algorithm, BurstConfiguration, ConfigurationRow, DatasetColumns,
    DatatypeIndexRow, Entity, LegacyBurst, Operation, Project,
};
pub use error::{IndexError, IndexResult};
pub use sqlite::SqliteIndex;
