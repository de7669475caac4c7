// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Best-effort reconstruction of typed configuration objects from legacy operation
//! parameters.
//!
//! Each known algorithm declares the fields its configuration object carries. A legacy
//! parameter that names no field, or whose value does not coerce to the field type, is
//! left out of the object and reported as a [`DroppedField`].

use crate::legacy_literal;
use neurostore_structures::{parse_legacy_bool, Gid, MetadataValue, RootMetadata, GID_PREFIX};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Value type of one configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    /// Reference to another record, stored as a URN
    Gid,
    FloatArray,
    IntArray,
    /// Free-form structure (equations, monitors, ...)
    Json,
}

impl FieldType {
    /// Coerce a legacy parameter value. `null` is accepted for every type.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            FieldType::Text => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(format!("expected text, found {}", other)),
            },
            FieldType::Integer => coerce_int(value)
                .map(Value::from)
                .ok_or_else(|| format!("expected an integer, found {}", value)),
            FieldType::Float => coerce_float(value)
                .map(Value::Number)
                .ok_or_else(|| format!("expected a number, found {}", value)),
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => Ok(Value::Bool(parse_legacy_bool(s))),
                Value::Number(n) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
                other => Err(format!("expected a boolean, found {}", other)),
            },
            FieldType::Gid => match value {
                Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
                Value::String(s) => Gid::parse(s)
                    .map(|gid| Value::String(gid.urn()))
                    .map_err(|e| e.to_string()),
                other => Err(format!("expected an identifier, found {}", other)),
            },
            FieldType::FloatArray => numeric_array(value, &|v| coerce_float(v).map(Value::Number)),
            FieldType::IntArray => numeric_array(value, &|v| coerce_int(v).map(Value::from)),
            FieldType::Json => match value {
                Value::String(s) => serde_json::from_str::<Value>(s)
                    .or_else(|_| legacy_literal::parse(s))
                    .map_err(|e| e.to_string()),
                other => Ok(other.clone()),
            },
        }
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<Number> {
    let float = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    Number::from_f64(float)
}

fn numeric_array(value: &Value, element: &dyn Fn(&Value) -> Option<Value>) -> Result<Value, String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) => numeric_array(item, element),
                scalar => element(scalar).ok_or_else(|| format!("non-numeric element {}", scalar)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::String(s) => {
            let parsed = legacy_literal::parse(s).map_err(|e| e.to_string())?;
            if parsed.is_string() {
                return Err(format!("expected an array, found {}", s));
            }
            numeric_array(&parsed, element)
        }
        other => Err(format!("expected an array, found {}", other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

/// Fields of one algorithm's configuration object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationSchema {
    pub algorithm: &'static str,
    pub fields: &'static [FieldSpec],
}

impl ConfigurationSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

macro_rules! fields {
    ( $( $name:literal : $ty:ident ),* $(,)? ) => {
        &[ $( FieldSpec { name: $name, ty: FieldType::$ty }, )* ]
    };
}

const SCHEMAS: &[ConfigurationSchema] = &[
    ConfigurationSchema {
        algorithm: "ZIPConnectivityImporter",
        fields: fields!("uploaded": Text, "normalization": Text, "data_subject": Text),
    },
    ConfigurationSchema {
        algorithm: "ZIPSurfaceImporter",
        fields: fields!(
            "uploaded": Text,
            "surface_type": Text,
            "zero_based_triangles": Boolean,
            "should_center": Boolean,
            "data_subject": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "RegionMappingImporter",
        fields: fields!(
            "mapping_file": Text,
            "surface": Gid,
            "connectivity": Gid,
            "data_subject": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "SensorsImporter",
        fields: fields!("sensors_file": Text, "sensors_type": Text, "data_subject": Text),
    },
    ConfigurationSchema {
        algorithm: "ProjectionMatrixSurfaceEEGImporter",
        fields: fields!(
            "projection_file": Text,
            "dataset_name": Text,
            "sensors": Gid,
            "surface": Gid,
            "data_subject": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "ConnectivityMeasureImporter",
        fields: fields!(
            "data_file": Text,
            "dataset_name": Text,
            "connectivity": Gid,
            "data_subject": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "NIFTIImporter",
        fields: fields!(
            "data_file": Text,
            "apply_corrections": Boolean,
            "mappings_file": Text,
            "connectivity": Gid,
            "data_subject": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "LocalConnectivityCreator",
        fields: fields!(
            "surface": Gid,
            "cutoff": Float,
            "equation": Json,
            "display_name": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "RegionStimulusCreator",
        fields: fields!(
            "connectivity": Gid,
            "weight": FloatArray,
            "temporal": Json,
            "display_name": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "SurfaceStimulusCreator",
        fields: fields!(
            "surface": Gid,
            "focal_points_triangles": IntArray,
            "spatial": Json,
            "temporal": Json,
            "display_name": Text,
        ),
    },
    ConfigurationSchema {
        algorithm: "SimulatorAdapter",
        fields: fields!(
            "connectivity": Gid,
            "surface": Gid,
            "stimulus": Gid,
            "simulation_length": Float,
            "conduction_speed": Float,
            "coupling": Json,
            "model": Json,
            "integrator": Json,
            "monitors": Json,
            "initial_conditions": Json,
        ),
    },
    ConfigurationSchema {
        algorithm: "TimeseriesMetricsAdapter",
        fields: fields!(
            "time_series": Gid,
            "start_point": Float,
            "segment": Integer,
            "algorithms": Json,
        ),
    },
    ConfigurationSchema {
        algorithm: "FourierAdapter",
        fields: fields!(
            "time_series": Gid,
            "input_data": Gid,
            "segment_length": Float,
            "window_function": Text,
            "detrend": Boolean,
        ),
    },
    ConfigurationSchema {
        algorithm: "WaveletAdapter",
        fields: fields!(
            "time_series": Gid,
            "input_data": Gid,
            "mother": Text,
            "sample_period": Float,
            "normalisation": Text,
            "q_ratio": Float,
            "frequencies": Json,
        ),
    },
    ConfigurationSchema {
        algorithm: "CrossCorrelateAdapter",
        fields: fields!("time_series": Gid, "datatype": Gid),
    },
    ConfigurationSchema {
        algorithm: "PearsonCorrelationCoefficientAdapter",
        fields: fields!("time_series": Gid, "datatype": Gid, "t_start": Float, "t_end": Float),
    },
    ConfigurationSchema {
        algorithm: "NodeCovarianceAdapter",
        fields: fields!("time_series": Gid),
    },
    ConfigurationSchema {
        algorithm: "FCDAdapter",
        fields: fields!("time_series": Gid, "sw": Float, "sp": Float),
    },
    ConfigurationSchema {
        algorithm: "ICAAdapter",
        fields: fields!("time_series": Gid, "n_components": Integer),
    },
    ConfigurationSchema {
        algorithm: "PCAAdapter",
        fields: fields!("time_series": Gid),
    },
    ConfigurationSchema {
        algorithm: "NodeCoherenceAdapter",
        fields: fields!("time_series": Gid, "nfft": Integer),
    },
    ConfigurationSchema {
        algorithm: "NodeComplexCoherenceAdapter",
        fields: fields!("time_series": Gid),
    },
];

/// Schema of an algorithm's configuration object, `None` for algorithms without one.
pub fn schema_for(algorithm: &str) -> Option<&'static ConfigurationSchema> {
    SCHEMAS.iter().find(|schema| schema.algorithm == algorithm)
}

/// A reconstructed configuration object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationObject {
    pub gid: Gid,
    pub algorithm: String,
    pub version: u32,
    pub fields: Map<String, Value>,
}

impl ConfigurationObject {
    /// Root metadata for the object's own container. Nulls are left out; structured
    /// values are stored as JSON text.
    pub fn to_metadata(&self) -> RootMetadata {
        let mut metadata = RootMetadata::new();
        for (name, value) in &self.fields {
            let entry = match value {
                Value::Null => continue,
                Value::Bool(b) => MetadataValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => MetadataValue::Int(i),
                    None => MetadataValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => match Gid::parse(s) {
                    Ok(gid) if s.starts_with(GID_PREFIX) => {
                        MetadataValue::Reference(gid)
                    }
                    _ => MetadataValue::String(s.clone()),
                },
                other => MetadataValue::String(other.to_string()),
            };
            metadata.insert(name.clone(), entry);
        }
        metadata.insert("algorithm", self.algorithm.as_str());
        metadata
    }
}

/// A legacy parameter that did not make it into the configuration object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedField {
    pub field: String,
    pub reason: String,
}

/// Build the configuration object `gid` for `algorithm` from legacy parameters.
///
/// Never fails: parameters that do not fit the algorithm's schema are dropped and
/// reported. Algorithms without a schema keep every parameter verbatim.
pub fn reconstruct(
    gid: Gid,
    algorithm: &str,
    version: u32,
    params: &Map<String, Value>,
) -> (ConfigurationObject, Vec<DroppedField>) {
    let mut dropped = Vec::new();
    let fields = match schema_for(algorithm) {
        None => params.clone(),
        Some(schema) => {
            let mut fields = Map::new();
            for (name, value) in params {
                let Some(spec) = schema.field(name) else {
                    dropped.push(DroppedField {
                        field: name.clone(),
                        reason: format!("{} has no such field", algorithm),
                    });
                    continue;
                };
                match spec.ty.coerce(value) {
                    Ok(coerced) => {
                        fields.insert(name.clone(), coerced);
                    }
                    Err(reason) => dropped.push(DroppedField {
                        field: name.clone(),
                        reason,
                    }),
                }
            }
            fields
        }
    };

    for field in &dropped {
        warn!(
            target: "neurostore-migration",
            "Configuration field '{}' of {} dropped: {}", field.field, algorithm, field.reason
        );
    }

    (
        ConfigurationObject {
            gid,
            algorithm: algorithm.to_string(),
            version,
            fields,
        },
        dropped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_known_algorithm_coerces_fields() {
        let (object, dropped) = reconstruct(
            Gid::new_random(),
            "FCDAdapter",
            5,
            &params(json!({
                "time_series": "7a3c9e40-c09d-11e9-a6d7-0242ac130002",
                "sw": "120000",
                "sp": 2000
            })),
        );
        assert!(dropped.is_empty());
        assert_eq!(
            object.fields["time_series"],
            json!("urn:uuid:7a3c9e40c09d11e9a6d70242ac130002")
        );
        assert_eq!(object.fields["sw"], json!(120000.0));
        assert_eq!(object.fields["sp"], json!(2000.0));
        assert_eq!(object.version, 5);
    }

    #[test]
    fn test_mismatches_are_reported_not_raised() {
        let (object, dropped) = reconstruct(
            Gid::new_random(),
            "ICAAdapter",
            5,
            &params(json!({"n_components": "many", "legacy_flag": true})),
        );
        assert!(object.fields.is_empty());
        let mut names: Vec<&str> = dropped.iter().map(|d| d.field.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["legacy_flag", "n_components"]);
    }

    #[test]
    fn test_unknown_algorithm_keeps_parameters() {
        let input = params(json!({"anything": [1, 2], "other": "x"}));
        let (object, dropped) = reconstruct(Gid::new_random(), "CustomUploader", 5, &input);
        assert!(dropped.is_empty());
        assert_eq!(object.fields, input);
    }

    #[test]
    fn test_array_and_json_fields() {
        assert_eq!(
            FieldType::IntArray.coerce(&json!("[1, 2, 3]")).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            FieldType::FloatArray.coerce(&json!([[1, 2], [3, 4]])).unwrap(),
            json!([[1.0, 2.0], [3.0, 4.0]])
        );
        assert_eq!(
            FieldType::Json.coerce(&json!("{'type': 'Linear'}")).unwrap(),
            json!({"type": "Linear"})
        );
        assert!(FieldType::FloatArray.coerce(&json!("abc")).is_err());
        assert_eq!(FieldType::Gid.coerce(&json!("")).unwrap(), Value::Null);
    }

    #[test]
    fn test_object_metadata() {
        let (object, _) = reconstruct(
            Gid::new_random(),
            "NodeCoherenceAdapter",
            5,
            &params(json!({
                "time_series": "7a3c9e40c09d11e9a6d70242ac130002",
                "nfft": 256
            })),
        );
        let metadata = object.to_metadata();
        assert_eq!(metadata.get("nfft"), Some(&MetadataValue::Int(256)));
        assert!(metadata.get("time_series").unwrap().as_reference().is_some());
        assert_eq!(metadata.get_str("algorithm"), Some("NodeCoherenceAdapter"));
    }
}
