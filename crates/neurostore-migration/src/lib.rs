// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurostore Migration
//!
//! One-way, versioned migration of containers from data version 4 to 5, with the
//! relational index kept in step:
//!
//! - [`metadata`]: identity normalization of the root block
//! - [`rules`]: kind-specific rewrites, one per [`LegacyKind`]
//! - [`configuration`]: configuration objects rebuilt from legacy operation parameters
//! - [`step`]: the [`MigrationStep`] trait and [`V4ToV5Step`]
//! - [`orchestrator`]: sequential directory walk with a continue/halt error policy
//!
//! ```no_run
//! use neurostore_index::SqliteIndex;
//! use neurostore_migration::{ErrorPolicy, Orchestrator, V4ToV5Step, CURRENT_DATA_VERSION};
//! use neurostore_structures::DatatypeRegistry;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = DatatypeRegistry::standard()?;
//! let index = SqliteIndex::open_in_memory()?;
//! let step = V4ToV5Step::new(&registry, &index)?;
//! let summary = Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Continue, "h5")
//!     .with_step(step)
//!     .run(Path::new("/data/PROJECTS"))?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data version written by this release
pub const CURRENT_DATA_VERSION: u32 = 5;
/// Data version the shipped step migrates from
pub const LEGACY_DATA_VERSION: u32 = 4;

pub mod configuration;
mod error;
pub mod legacy_kind;
pub mod legacy_literal;
pub mod metadata;
pub mod normalize;
pub mod operation_xml;
pub mod orchestrator;
pub mod rules;
pub mod step;

pub use configuration::{reconstruct, ConfigurationObject, DroppedField, FieldType};
pub use error::{MigrationError, MigrationResult};
pub use legacy_kind::{validate_against_registry, LegacyKind};
pub use orchestrator::{
    collect_containers, ContainerOutcome, ContainerStatus, ErrorPolicy, MigrationSummary,
    Orchestrator,
};
pub use step::{MigrationStep, StepOptions, StepOutcome, StepReport, V4ToV5Step};
