// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rows of the relational index.

use chrono::NaiveDateTime;
use neurostore_structures::{
    GenericAttributes, Gid, IndexKind, MetadataValue, ScientificRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
        }
    }
}

/// An algorithm able to produce records, addressed by module and class name
#[derive(Debug, Clone, PartialEq)]
pub struct Algorithm {
    pub id: Option<i64>,
    pub module: String,
    pub classname: String,
    pub display_name: String,
}

impl Algorithm {
    pub fn new(module: impl Into<String>, classname: impl Into<String>) -> Self {
        let classname = classname.into();
        Self {
            id: None,
            module: module.into(),
            display_name: classname.clone(),
            classname,
        }
    }
}

/// Provenance of a set of records
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: Option<i64>,
    pub gid: Gid,
    pub fk_project: i64,
    pub fk_from_algo: Option<i64>,
    pub status: String,
    pub create_date: Option<NaiveDateTime>,
    /// JSON-encoded input parameters
    pub parameters: String,
    /// Configuration object persisted for this operation
    pub view_model_gid: Option<Gid>,
    /// Burst this operation belonged to before schema 5
    pub legacy_burst_id: Option<i64>,
}

impl Operation {
    pub fn new(gid: Gid, fk_project: i64) -> Self {
        Self {
            id: None,
            gid,
            fk_project,
            fk_from_algo: None,
            status: "5-FINISHED".to_string(),
            create_date: None,
            parameters: "{}".to_string(),
            view_model_gid: None,
            legacy_burst_id: None,
        }
    }
}

/// Shape and statistics of one dataset, denormalised into the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetColumns {
    pub shape: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mean: Option<f64>,
}

/// Index row mirroring one container
#[derive(Debug, Clone, PartialEq)]
pub struct DatatypeIndexRow {
    pub id: Option<i64>,
    pub gid: Gid,
    pub kind: IndexKind,
    pub fk_from_operation: Option<i64>,
    pub create_date: Option<NaiveDateTime>,
    pub subject: String,
    pub title: Option<String>,
    pub state: Option<String>,
    pub user_tag_1: String,
    pub user_tag_2: Option<String>,
    pub user_tag_3: Option<String>,
    pub user_tag_4: Option<String>,
    pub user_tag_5: Option<String>,
    pub visible: bool,
    pub operation_tag: Option<String>,
    pub fk_parent_burst: Option<Gid>,
    /// Denormalised scientific scalars
    pub scalars: BTreeMap<String, Value>,
    pub datasets: BTreeMap<String, DatasetColumns>,
    /// Reference field name -> row id of the referenced record
    pub dependencies: BTreeMap<String, i64>,
}

impl DatatypeIndexRow {
    pub fn new(gid: Gid, kind: IndexKind) -> Self {
        Self {
            id: None,
            gid,
            kind,
            fk_from_operation: None,
            create_date: None,
            subject: String::new(),
            title: None,
            state: None,
            user_tag_1: String::new(),
            user_tag_2: None,
            user_tag_3: None,
            user_tag_4: None,
            user_tag_5: None,
            visible: true,
            operation_tag: None,
            fk_parent_burst: None,
            scalars: BTreeMap::new(),
            datasets: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Copy scientific content: scalars, dataset summaries and resolved dependency rows.
    pub fn fill_from_record(&mut self, record: &ScientificRecord, dependencies: &BTreeMap<String, i64>) {
        self.gid = record.gid;
        self.scalars = record
            .scalars
            .iter()
            .map(|(k, v)| (k.clone(), metadata_to_json(v)))
            .collect();
        self.datasets = record
            .datasets
            .iter()
            .map(|(name, summary)| {
                (
                    name.clone(),
                    DatasetColumns {
                        shape: summary.shape.clone(),
                        min: summary.statistics.map(|s| s.min),
                        max: summary.statistics.map(|s| s.max),
                        mean: summary.statistics.map(|s| s.mean),
                    },
                )
            })
            .collect();
        self.dependencies = dependencies.clone();
    }

    pub fn fill_from_generic_attributes(&mut self, attributes: &GenericAttributes) {
        self.subject = attributes.subject.clone();
        self.title = attributes.title.clone();
        self.state = attributes.state.clone();
        self.user_tag_1 = attributes.user_tag_1.clone();
        self.user_tag_2 = attributes.user_tag_2.clone();
        self.user_tag_3 = attributes.user_tag_3.clone();
        self.user_tag_4 = attributes.user_tag_4.clone();
        self.user_tag_5 = attributes.user_tag_5.clone();
        self.visible = attributes.visible;
        self.operation_tag = attributes.operation_tag.clone();
        self.fk_parent_burst = attributes.parent_burst;
        if attributes.create_date.is_some() {
            self.create_date = attributes.create_date;
        }
    }
}

/// A persisted configuration object: the typed parameters an operation ran with
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationRow {
    pub id: Option<i64>,
    pub gid: Gid,
    pub fk_operation: i64,
    pub algorithm: String,
    pub version: u32,
    pub fields: Value,
}

/// Simulation burst, schema 5 layout
#[derive(Debug, Clone, PartialEq)]
pub struct BurstConfiguration {
    pub id: Option<i64>,
    pub gid: Gid,
    pub name: String,
    pub fk_project: i64,
    pub fk_simulation: Option<i64>,
    pub status: String,
    pub start_time: Option<NaiveDateTime>,
    pub finish_time: Option<NaiveDateTime>,
    pub error_message: Option<String>,
    pub datatypes_number: i64,
    pub dynamic_ids: String,
    pub range_1: Option<String>,
    pub range_2: Option<String>,
    pub fk_operation_group: Option<i64>,
    pub fk_metric_operation_group: Option<i64>,
    pub simulator_gid: Option<Gid>,
}

impl BurstConfiguration {
    pub fn new(gid: Gid, fk_project: i64) -> Self {
        Self {
            id: None,
            gid,
            name: String::new(),
            fk_project,
            fk_simulation: None,
            status: "running".to_string(),
            start_time: None,
            finish_time: None,
            error_message: None,
            datatypes_number: 0,
            dynamic_ids: "[]".to_string(),
            range_1: None,
            range_2: None,
            fk_operation_group: None,
            fk_metric_operation_group: None,
            simulator_gid: None,
        }
    }
}

/// Burst parameters exactly as the schema 4 database held them. Read-only input.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyBurst {
    pub id: i64,
    pub name: String,
    pub fk_project: i64,
    pub fk_simulation: Option<i64>,
    pub status: String,
    /// `%Y-%m-%d %H:%M:%S.%f`
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub error_message: Option<String>,
    pub datatypes_number: i64,
    pub dynamic_ids: String,
    pub range_1: Option<String>,
    pub range_2: Option<String>,
    pub fk_operation_group: Option<i64>,
    pub fk_metric_operation_group: Option<i64>,
}

/// Anything [`crate::IndexDao::store_entity`] accepts
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Project(Project),
    Algorithm(Algorithm),
    Operation(Operation),
    Datatype(DatatypeIndexRow),
    Configuration(ConfigurationRow),
    Burst(BurstConfiguration),
}

impl Entity {
    pub fn id(&self) -> Option<i64> {
        match self {
            Entity::Project(e) => e.id,
            Entity::Algorithm(e) => e.id,
            Entity::Operation(e) => e.id,
            Entity::Datatype(e) => e.id,
            Entity::Configuration(e) => e.id,
            Entity::Burst(e) => e.id,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        match self {
            Entity::Project(_) => "project",
            Entity::Algorithm(_) => "algorithm",
            Entity::Operation(_) => "operation",
            Entity::Datatype(_) => "datatype",
            Entity::Configuration(_) => "configuration",
            Entity::Burst(_) => "burst",
        }
    }
}

macro_rules! impl_entity_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(value)
                }
            }
        )*
    };
}

impl_entity_from!(
    Project(Project),
    Algorithm(Algorithm),
    Operation(Operation),
    Datatype(DatatypeIndexRow),
    Configuration(ConfigurationRow),
    Burst(BurstConfiguration),
);

/// JSON view of a typed metadata value, as denormalised into index rows.
pub fn metadata_to_json(value: &MetadataValue) -> Value {
    match value {
        MetadataValue::Int(i) => Value::from(*i),
        MetadataValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        MetadataValue::Bool(b) => Value::Bool(*b),
        MetadataValue::String(s) => Value::String(s.clone()),
        MetadataValue::Timestamp(_) | MetadataValue::Reference(_) => {
            Value::String(value.to_stored().to_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurostore_structures::{DatasetStatistics, DatasetSummary, DatatypeKind};

    #[test]
    fn test_fill_from_record_denormalises() {
        let gid = Gid::new_random();
        let mut record = ScientificRecord::new(Some(DatatypeKind::Connectivity), gid);
        record.scalars.insert("number_of_regions".into(), MetadataValue::Int(76));
        record.scalars.insert("undirected".into(), MetadataValue::Bool(true));
        record.datasets.insert(
            "weights".into(),
            DatasetSummary {
                shape: vec![76, 76],
                statistics: Some(DatasetStatistics { min: 0.0, max: 3.0, mean: 0.5 }),
            },
        );

        let mut row = DatatypeIndexRow::new(Gid::new_random(), IndexKind::Connectivity);
        row.fill_from_record(&record, &BTreeMap::from([("surface".to_string(), 4)]));

        assert_eq!(row.gid, gid);
        assert_eq!(row.scalars["number_of_regions"], Value::from(76));
        assert_eq!(row.scalars["undirected"], Value::Bool(true));
        assert_eq!(row.datasets["weights"].max, Some(3.0));
        assert_eq!(row.dependencies["surface"], 4);
    }

    #[test]
    fn test_fill_from_generic_attributes_keeps_existing_date() {
        let mut row = DatatypeIndexRow::new(Gid::new_random(), IndexKind::Surface);
        let date = NaiveDateTime::parse_from_str("2020-01-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        row.create_date = Some(date);

        let attributes = GenericAttributes {
            subject: "John Doe".into(),
            visible: false,
            ..GenericAttributes::default()
        };
        row.fill_from_generic_attributes(&attributes);

        assert_eq!(row.subject, "John Doe");
        assert!(!row.visible);
        assert_eq!(row.create_date, Some(date));
    }

    #[test]
    fn test_reference_json_is_canonical() {
        let gid = Gid::new_random();
        assert_eq!(
            metadata_to_json(&MetadataValue::Reference(gid)),
            Value::String(gid.urn())
        );
    }
}
