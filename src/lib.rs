// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurostore
//!
//! Self-describing scientific data containers, a relational provenance index, and the
//! versioned migration engine that keeps both in step.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! neurostore = "0.1"
//! ```
//!
//! ```rust,no_run
//! use neurostore::prelude::*;
//! use std::path::Path;
//!
//! let registry = DatatypeRegistry::standard()?;
//! let index = SqliteIndex::open_in_memory()?;
//! let step = V4ToV5Step::new(&registry, &index)?;
//!
//! let summary = Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Continue, "h5")
//!     .with_step(step)
//!     .run(Path::new("/data/neurostore/PROJECTS"))?;
//! println!("{}", summary);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: neurostore-structures                      │
//! │  (Gid, typed metadata, record kinds, registry)          │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │  neurostore-container    │  │  neurostore-index        │
//! │  (container files)       │  │  (SQLite provenance)     │
//! └──────────────────────────┘  └──────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  neurostore-migration                                   │
//! │  (v4 → v5 step, configuration objects, orchestrator)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - **`compression`** (default): LZ4 compression of container payloads
//! - **`file-logging`**: per-run log folders in the tools

pub use neurostore_config as config;
pub use neurostore_container as container;
pub use neurostore_index as index;
pub use neurostore_migration as migration;
pub use neurostore_observability as observability;
pub use neurostore_structures as structures;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::container::{ContainerError, DatasetData, StorageManager};
    pub use crate::index::{IndexDao, IndexError, SqliteIndex};
    pub use crate::migration::{
        ErrorPolicy, MigrationError, MigrationStep, MigrationSummary, Orchestrator,
        V4ToV5Step, CURRENT_DATA_VERSION,
    };
    pub use crate::structures::{DatatypeRegistry, Gid, MetadataValue, RootMetadata};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_facade_imports() {
        let registry = DatatypeRegistry::standard().unwrap();
        let index = SqliteIndex::open_in_memory().unwrap();
        let step = V4ToV5Step::new(&registry, &index).unwrap();
        assert_eq!(step.source_version() + 1, CURRENT_DATA_VERSION);
    }
}
