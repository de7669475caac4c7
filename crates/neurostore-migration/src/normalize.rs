// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transformation utilities shared by the migration rules.

use crate::legacy_literal;
use crate::{MigrationError, MigrationResult};
use neurostore_container::{
    statistics_attributes, ContainerError, DatasetData, StorageManager, STAT_MAXIMUM, STAT_MEAN,
    STAT_MINIMUM,
};
use neurostore_structures::AttrValue;
use serde_json::{json, Value};

/// Dataset attributes that only schema 4 wrote
pub const LEGACY_DATASET_ATTRIBUTES: &[&str] = &["Variance", "Size"];

const MAPPED_CLASS: &str = "__mapped_class";
const MAPPED_MODULE: &str = "__mapped_module";

/// Fixed substitutions merging legacy kinds into their successor's file name
const FILE_NAME_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("BrainSkull", "Surface"),
    ("CorticalSurface", "Surface"),
    ("SkinAir", "Surface"),
    ("SkullSkin", "Surface"),
    ("EEGCap", "Surface"),
    ("FaceSurface", "Surface"),
    ("SensorsEEG", "Sensors"),
    ("SensorsMEG", "Sensors"),
    ("SensorsInternal", "Sensors"),
    ("ProjectionSurfaceEEG", "ProjectionMatrix"),
    ("ProjectionSurfaceMEG", "ProjectionMatrix"),
    ("ProjectionSurfaceSEEG", "ProjectionMatrix"),
];

pub fn lowercase_first_character(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// File name a legacy container takes in schema 5: hyphens stripped, merged kinds renamed.
pub fn rename_legacy_file_name(file_name: &str) -> String {
    FILE_NAME_SUBSTITUTIONS
        .iter()
        .fold(file_name.replace('-', ""), |name, (from, to)| {
            name.replace(from, to)
        })
}

/// Recompute the statistics block of each dataset from its current content and drop
/// the schema 4 only attributes.
///
/// Every listed dataset must exist.
pub fn rebuild_dataset_metadata(
    manager: &mut StorageManager,
    datasets: &[&str],
) -> MigrationResult<()> {
    for dataset in datasets {
        let fresh = statistics_attributes(manager.get_data(dataset)?);
        for stale in [STAT_MINIMUM, STAT_MAXIMUM, STAT_MEAN]
            .iter()
            .chain(LEGACY_DATASET_ATTRIBUTES)
        {
            manager.remove_dataset_metadata(dataset, stale)?;
        }
        manager.set_dataset_metadata(dataset, fresh)?;
    }
    Ok(())
}

/// Decode a dataset of UTF-8 byte strings into text, preserving order and count.
/// The dataset's attribute block is reset.
pub fn bytes_to_text_dataset(manager: &mut StorageManager, dataset: &str) -> MigrationResult<()> {
    let labels = match manager.get_data(dataset)? {
        DatasetData::Bytes(values) => values
            .iter()
            .map(|bytes| String::from_utf8(bytes.clone()))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| {
                MigrationError::from(ContainerError::InvalidDataset {
                    dataset: dataset.to_string(),
                    reason: e.to_string(),
                })
            })?,
        DatasetData::Text(values) => values.clone(),
        _ => {
            return Err(ContainerError::InvalidDataset {
                dataset: dataset.to_string(),
                reason: "expected byte strings".to_string(),
            }
            .into())
        }
    };
    manager.store_data(dataset, DatasetData::Text(labels));
    Ok(())
}

/// Decode byte-string attributes of one dataset into text. Absent attributes are skipped.
pub fn decode_dataset_attributes(
    manager: &mut StorageManager,
    dataset: &str,
    keys: &[&str],
) -> MigrationResult<()> {
    let mut decoded = manager.get_dataset_metadata(dataset)?.clone();
    for key in keys {
        if let Some(value @ AttrValue::Bytes(_)) = decoded.get(*key) {
            let text = value.to_text();
            decoded.insert((*key).to_string(), AttrValue::Text(text));
        }
    }
    manager.set_dataset_metadata(dataset, decoded)?;
    Ok(())
}

/// Rewrite a legacy `{"__mapped_class": .., "parameters": ..}` JSON descriptor as
/// `{"type": .., "parameters": ..}`.
pub fn split_composite_field(field: &str, raw: &str) -> MigrationResult<String> {
    let descriptor: Value = serde_json::from_str(raw)?;
    let class = descriptor
        .get(MAPPED_CLASS)
        .cloned()
        .ok_or_else(|| composite_error(field, "missing __mapped_class"))?;
    let parameters = descriptor
        .get("parameters")
        .cloned()
        .ok_or_else(|| composite_error(field, "missing parameters"))?;
    Ok(serde_json::to_string(&json!({
        "type": class,
        "parameters": parameters,
    }))?)
}

/// Rewrite a legacy equation literal: the class tag becomes `type`, the module tag goes.
pub fn split_equation(field: &str, raw: &str) -> MigrationResult<String> {
    let mut equation = legacy_literal::parse_mapping(raw)?;
    let class = equation
        .remove(MAPPED_CLASS)
        .ok_or_else(|| composite_error(field, "missing __mapped_class"))?;
    equation
        .remove(MAPPED_MODULE)
        .ok_or_else(|| composite_error(field, "missing __mapped_module"))?;
    equation.insert("type".to_string(), class);
    Ok(serde_json::to_string(&Value::Object(equation))?)
}

fn composite_error(field: &str, reason: &str) -> MigrationError {
    MigrationError::CompositeField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
