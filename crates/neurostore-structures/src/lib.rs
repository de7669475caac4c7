// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core data structures shared by the neurostore crates: identifiers, typed metadata
//! values, record kinds and the datatype registry.

mod error;
pub mod gid;
pub mod kind;
pub mod record;
pub mod registry;
pub mod value;

pub use error::{RegistryError, RegistryResult, StructureError, StructureResult};
pub use gid::{is_canonical_urn, Gid, GID_PREFIX};
pub use kind::{AdapterKind, DatatypeKind, IndexKind};
pub use record::{DatasetStatistics, DatasetSummary, GenericAttributes, ScientificRecord};
pub use registry::{DatatypeRegistry, Registration, RegistryBuilder};
pub use value::{parse_legacy_bool, parse_legacy_timestamp, AttrValue, MetadataValue, RootMetadata};

/// Root metadata key holding the schema version
pub const KEY_DATA_VERSION: &str = "data_version";
/// Root metadata key naming the adapter class path
pub const KEY_WRITTEN_BY: &str = "written_by";
/// Root metadata key holding the identifier
pub const KEY_GID: &str = "gid";
