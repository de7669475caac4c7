// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurostore Container
//!
//! Self-describing binary containers. One container holds one scientific record:
//! named datasets (multi-dimensional arrays) plus two tiers of attributes, one per
//! dataset and one at the root.
//!
//! ## Usage
//! ```ignore
//! use neurostore_container::{DatasetData, StorageManager};
//!
//! let mut manager = StorageManager::open("Connectivity_abc.h5")?;
//! manager.store_data("weights", DatasetData::from_vec_f64(vec![0.0, 1.0]));
//! manager.commit()?; // temp file + atomic rename
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapters;
mod dataset;
mod error;
mod format;
mod storage;

pub use adapters::{
    adapter_schema, load_generic_attributes, load_record, written_by, AdapterSchema,
};
pub use dataset::{
    statistics_attributes, AttributeMap, Dataset, DatasetData, STAT_MAXIMUM, STAT_MEAN,
    STAT_MINIMUM,
};
pub use error::{ContainerError, ContainerResult};
pub use format::{
    load_container, read_container, save_container, write_container, ContainerPayload,
    FORMAT_VERSION,
};
pub use storage::{StorageManager, LEGACY_KEY_DATA_VERSION};
