// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Named datasets and their statistics.

use crate::{ContainerError, ContainerResult};
use ndarray::{Array1, ArrayD, IxDyn};
use neurostore_structures::{AttrValue, DatasetStatistics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute block of a dataset or of the container root
pub type AttributeMap = BTreeMap<String, AttrValue>;

/// Attribute keys written for dataset statistics
pub const STAT_MINIMUM: &str = "Minimum";
pub const STAT_MAXIMUM: &str = "Maximum";
pub const STAT_MEAN: &str = "Mean";

/// Content of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetData {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
    /// Encoded byte strings, one per element (legacy label arrays)
    Bytes(Vec<Vec<u8>>),
    Text(Vec<String>),
}

impl DatasetData {
    pub fn from_vec_f64(values: Vec<f64>) -> Self {
        DatasetData::Float(Array1::from_vec(values).into_dyn())
    }

    pub fn from_vec_i64(values: Vec<i64>) -> Self {
        DatasetData::Int(Array1::from_vec(values).into_dyn())
    }

    /// Float array with an explicit shape.
    pub fn float_with_shape(shape: &[usize], values: Vec<f64>) -> ContainerResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(DatasetData::Float)
            .map_err(|e| ContainerError::InvalidDataset {
                dataset: String::new(),
                reason: e.to_string(),
            })
    }

    /// Int array with an explicit shape.
    pub fn int_with_shape(shape: &[usize], values: Vec<i64>) -> ContainerResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(DatasetData::Int)
            .map_err(|e| ContainerError::InvalidDataset {
                dataset: String::new(),
                reason: e.to_string(),
            })
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            DatasetData::Float(a) => a.shape().to_vec(),
            DatasetData::Int(a) => a.shape().to_vec(),
            DatasetData::Bytes(v) => vec![v.len()],
            DatasetData::Text(v) => vec![v.len()],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DatasetData::Float(a) => a.len(),
            DatasetData::Int(a) => a.len(),
            DatasetData::Bytes(v) => v.len(),
            DatasetData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DatasetData::Float(_) | DatasetData::Int(_))
    }

    /// Min, max and mean of numeric content. `None` for text, bytes and empty arrays.
    pub fn statistics(&self) -> Option<DatasetStatistics> {
        match self {
            DatasetData::Float(a) => summarize(a.iter().copied()),
            DatasetData::Int(a) => summarize(a.iter().map(|v| *v as f64)),
            DatasetData::Bytes(_) | DatasetData::Text(_) => None,
        }
    }

    /// Convert to a float array; integers widen, text is parsed.
    pub fn to_float(&self) -> ContainerResult<ArrayD<f64>> {
        match self {
            DatasetData::Float(a) => Ok(a.clone()),
            DatasetData::Int(a) => Ok(a.mapv(|v| v as f64)),
            DatasetData::Text(values) => {
                let parsed = values
                    .iter()
                    .map(|v| v.trim().parse::<f64>())
                    .collect::<Result<Vec<f64>, _>>()
                    .map_err(|e| ContainerError::InvalidDataset {
                        dataset: String::new(),
                        reason: e.to_string(),
                    })?;
                Ok(Array1::from_vec(parsed).into_dyn())
            }
            DatasetData::Bytes(_) => Err(ContainerError::InvalidDataset {
                dataset: String::new(),
                reason: "byte strings are not numeric".to_string(),
            }),
        }
    }
}

fn summarize<I: Iterator<Item = f64>>(values: I) -> Option<DatasetStatistics> {
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for value in values {
        count += 1;
        min = min.min(value);
        max = max.max(value);
        sum += value;
    }
    if count == 0 {
        return None;
    }
    Some(DatasetStatistics {
        min,
        max,
        mean: sum / count as f64,
    })
}

/// A named array with its attribute block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub data: DatasetData,
    pub attributes: AttributeMap,
}

impl Dataset {
    pub fn new(data: DatasetData) -> Self {
        Self {
            data,
            attributes: AttributeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Statistics as an attribute block: `Minimum`, `Maximum`, `Mean`.
pub fn statistics_attributes(data: &DatasetData) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    if let Some(stats) = data.statistics() {
        attributes.insert(STAT_MINIMUM.to_string(), AttrValue::Float(stats.min));
        attributes.insert(STAT_MAXIMUM.to_string(), AttrValue::Float(stats.max));
        attributes.insert(STAT_MEAN.to_string(), AttrValue::Float(stats.mean));
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_statistics() {
        let data = DatasetData::float_with_shape(&[2, 2], vec![1.0, -2.0, 4.0, 5.0]).unwrap();
        let stats = data.statistics().unwrap();
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(data.shape(), vec![2, 2]);
    }

    #[test]
    fn test_non_numeric_and_empty_have_no_statistics() {
        assert!(DatasetData::Text(vec!["a".into()]).statistics().is_none());
        assert!(DatasetData::from_vec_f64(vec![]).statistics().is_none());
        assert!(statistics_attributes(&DatasetData::Bytes(vec![b"x".to_vec()])).is_empty());
    }

    #[test]
    fn test_int_statistics_attributes() {
        let attrs = statistics_attributes(&DatasetData::from_vec_i64(vec![3, 1, 2]));
        assert_eq!(attrs.get(STAT_MINIMUM), Some(&AttrValue::Float(1.0)));
        assert_eq!(attrs.get(STAT_MAXIMUM), Some(&AttrValue::Float(3.0)));
        assert_eq!(attrs.get(STAT_MEAN), Some(&AttrValue::Float(2.0)));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(DatasetData::float_with_shape(&[2, 3], vec![1.0]).is_err());
    }
}
