// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurostore-observability
//!
//! Logging setup shared by the neurostore tools, with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: per-run log folders with one JSON log file per crate

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known neurostore crate names for debug flags; also the `tracing` targets they log under
pub const KNOWN_CRATES: &[&str] = &[
    "neurostore-config",
    "neurostore-structures",
    "neurostore-container",
    "neurostore-index",
    "neurostore-migration",
    "migrate_container",
];
