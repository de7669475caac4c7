// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory scientific records, as loaded from a container by its adapter.

use crate::gid::Gid;
use crate::kind::DatatypeKind;
use crate::value::MetadataValue;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics of a numeric dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetSummary {
    pub shape: Vec<usize>,
    pub statistics: Option<DatasetStatistics>,
}

/// A scientific record: scalar attributes, dataset summaries and resolved references.
///
/// Array contents stay in the container; the index only needs shapes and statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ScientificRecord {
    /// `None` for adapter-only kinds
    pub kind: Option<DatatypeKind>,
    pub gid: Gid,
    pub scalars: BTreeMap<String, MetadataValue>,
    pub datasets: BTreeMap<String, DatasetSummary>,
    pub references: BTreeMap<String, Gid>,
}

impl ScientificRecord {
    pub fn new(kind: Option<DatatypeKind>, gid: Gid) -> Self {
        Self {
            kind,
            gid,
            scalars: BTreeMap::new(),
            datasets: BTreeMap::new(),
            references: BTreeMap::new(),
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&MetadataValue> {
        self.scalars.get(name)
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetSummary> {
        self.datasets.get(name)
    }
}

/// Provenance and bookkeeping attributes common to every container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericAttributes {
    pub subject: String,
    pub title: Option<String>,
    pub state: Option<String>,
    pub user_tag_1: String,
    pub user_tag_2: Option<String>,
    pub user_tag_3: Option<String>,
    pub user_tag_4: Option<String>,
    pub user_tag_5: Option<String>,
    pub visible: bool,
    pub create_date: Option<NaiveDateTime>,
    pub operation_tag: Option<String>,
    pub parent_burst: Option<Gid>,
}
