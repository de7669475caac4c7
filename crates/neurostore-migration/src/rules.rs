// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Kind-specific structural rewrites for the schema 4 to 5 step.
//!
//! [`rewrite`] is pure: it takes the identity-normalized root block and returns a
//! [`KindRewrite`] describing the new root block, the dependency fields, the edits to
//! apply to datasets and operation parameters, and whether the container survives.
//! The step applies the edits afterwards.

use crate::legacy_kind::LegacyKind;
use crate::legacy_literal;
use crate::metadata::NormalizedRoot;
use crate::normalize::{
    bytes_to_text_dataset, decode_dataset_attributes, rebuild_dataset_metadata,
    split_composite_field, split_equation, LEGACY_DATASET_ATTRIBUTES,
};
use crate::MigrationResult;
use neurostore_container::{DatasetData, StorageManager};
use neurostore_structures::{Gid, RootMetadata};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const KEY_TITLE: &str = "title";
const KEY_OPERATION_TAG: &str = "operation_tag";

const LENGTH_KEYS: &[&str] = &["length_1d", "length_2d", "length_3d", "length_4d"];
const COMMON_ARRAY_KEYS: &[&str] = &[
    "label_x",
    "label_y",
    "aggregation_functions",
    "dimensions_labels",
    "nr_dimensions",
];
const NON_ZERO_STATISTICS: &[&str] = &["Mean non zero", "Min. non zero", "Var. non zero"];

const CONNECTIVITY_DATASETS: &[&str] = &["centres", "region_labels", "tract_lengths", "weights"];
const CONNECTIVITY_OPTIONAL_DATASETS: &[&str] = &["orientations", "areas", "cortical", "hemispheres"];
const SURFACE_DATASETS: &[&str] = &[
    "split_triangles",
    "triangle_normals",
    "triangles",
    "vertex_normals",
    "vertices",
];
const SENSOR_DATASETS: &[&str] = &["labels", "locations"];
const MEG_SENSOR_DATASETS: &[&str] = &["labels", "locations", "orientations"];
const TIME_SERIES_DATASETS: &[&str] = &["data", "time"];
const VOLUME_TIME_SERIES_DATASETS: &[&str] = &["data"];
const ARRAY_DATA: &[&str] = &["array_data"];

/// Edit of the operation's input parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ParamEdit {
    Remove(&'static str),
    /// Remove when the parameter holds exactly this text
    RemoveIfEquals(&'static str, &'static str),
    /// Replace an empty-string value with null
    NullIfEmpty(&'static str),
    Set(&'static str, Value),
    /// Set to the container's migrated file path
    SetFilePath(&'static str),
}

impl ParamEdit {
    pub fn apply(&self, params: &mut Map<String, Value>, file_path: &Path) {
        match self {
            ParamEdit::Remove(key) => {
                params.remove(*key);
            }
            ParamEdit::RemoveIfEquals(key, text) => {
                if params.get(*key).and_then(Value::as_str) == Some(*text) {
                    params.remove(*key);
                }
            }
            ParamEdit::NullIfEmpty(key) => {
                if let Some(value) = params.get_mut(*key) {
                    if value.as_str() == Some("") {
                        *value = Value::Null;
                    }
                }
            }
            ParamEdit::Set(key, value) => {
                params.insert((*key).to_string(), value.clone());
            }
            ParamEdit::SetFilePath(key) => {
                params.insert(
                    (*key).to_string(),
                    Value::String(file_path.display().to_string()),
                );
            }
        }
    }
}

/// Edit of the container's datasets, applied in order
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetEdit {
    /// Remove attributes from a dataset; absent attributes are ignored
    RemoveAttributes {
        dataset: &'static str,
        keys: &'static [&'static str],
    },
    /// Decode a byte-string dataset into text
    DecodeBytes(&'static str),
    /// Decode byte-string attributes of a dataset into text
    DecodeAttributes {
        dataset: &'static str,
        keys: &'static [&'static str],
    },
    /// Store an empty integer dataset
    StoreEmpty(&'static str),
    /// Widen a numeric dataset to floats, keeping its attributes
    ConvertToFloat(&'static str),
    Store {
        dataset: &'static str,
        data: DatasetData,
    },
    /// Recompute statistics; every dataset must exist
    Rebuild(&'static [&'static str]),
    /// Recompute statistics of the datasets that exist
    RebuildIfPresent(&'static [&'static str]),
}

impl DatasetEdit {
    pub fn apply(&self, manager: &mut StorageManager) -> MigrationResult<()> {
        match self {
            DatasetEdit::RemoveAttributes { dataset, keys } => {
                for key in *keys {
                    manager.remove_dataset_metadata(dataset, key)?;
                }
            }
            DatasetEdit::DecodeBytes(dataset) => bytes_to_text_dataset(manager, dataset)?,
            DatasetEdit::DecodeAttributes { dataset, keys } => {
                decode_dataset_attributes(manager, dataset, keys)?
            }
            DatasetEdit::StoreEmpty(dataset) => {
                manager.store_data(dataset, DatasetData::from_vec_i64(Vec::new()))
            }
            DatasetEdit::ConvertToFloat(dataset) => {
                let widened = manager.get_data(dataset)?.to_float()?;
                manager.replace_data(dataset, DatasetData::Float(widened))?;
            }
            DatasetEdit::Store { dataset, data } => manager.store_data(dataset, data.clone()),
            DatasetEdit::Rebuild(datasets) => rebuild_dataset_metadata(manager, datasets)?,
            DatasetEdit::RebuildIfPresent(datasets) => {
                let present: Vec<&str> = datasets
                    .iter()
                    .copied()
                    .filter(|name| {
                        let exists = manager.has_dataset(name);
                        if !exists {
                            debug!(
                                target: "neurostore-migration",
                                "Optional dataset '{}' absent, skipped", name
                            );
                        }
                        exists
                    })
                    .collect();
                rebuild_dataset_metadata(manager, &present)?;
            }
        }
        Ok(())
    }
}

/// What happens to the container after its rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Migrate and index
    Continue,
    /// The kind has no successor: delete the container
    Delete,
    /// Known incomplete migration: write the normalized root block, create no index row
    Unsupported,
}

/// Result of a kind-specific rewrite
#[derive(Debug, Clone, PartialEq)]
pub struct KindRewrite {
    pub kind: LegacyKind,
    pub metadata: RootMetadata,
    /// Reference field -> referenced record, each of which must already be indexed
    pub dependencies: BTreeMap<String, Gid>,
    pub param_edits: Vec<ParamEdit>,
    /// `(from, to)` substitution applied to the producing algorithm's class name
    pub algorithm_rename: Option<(&'static str, &'static str)>,
    pub dataset_edits: Vec<DatasetEdit>,
    pub outcome: RuleOutcome,
}

impl KindRewrite {
    fn new(root: NormalizedRoot) -> Self {
        Self {
            kind: root.kind,
            metadata: root.metadata,
            dependencies: BTreeMap::new(),
            param_edits: Vec::new(),
            algorithm_rename: None,
            dataset_edits: Vec::new(),
            outcome: RuleOutcome::Continue,
        }
    }

    /// Canonicalize a reference field and record it as a dependency.
    fn depend_on(&mut self, key: &str) -> MigrationResult<Gid> {
        let gid = self.metadata.canonicalize_reference(key)?;
        self.dependencies.insert(key.to_string(), gid);
        Ok(gid)
    }

    fn param(&mut self, edit: ParamEdit) {
        self.param_edits.push(edit);
    }

    fn dataset(&mut self, edit: DatasetEdit) {
        self.dataset_edits.push(edit);
    }

    fn drop_array_metadata(&mut self) {
        self.metadata.discard(LENGTH_KEYS);
        self.metadata.discard(COMMON_ARRAY_KEYS);
    }

    fn drop_array_metadata_and_title(&mut self) {
        self.drop_array_metadata();
        self.metadata.discard(&[KEY_TITLE]);
    }
}

/// Apply the rewrite rule of the container's legacy kind.
pub fn rewrite(root: NormalizedRoot) -> MigrationResult<KindRewrite> {
    use LegacyKind as K;

    let mut rw = KindRewrite::new(root);
    match rw.kind {
        K::Connectivity => connectivity(&mut rw)?,
        K::BrainSkull
        | K::CorticalSurface
        | K::SkinAir
        | K::SkullSkin
        | K::EEGCap
        | K::FaceSurface => surface(&mut rw)?,
        K::RegionMapping => {
            rw.drop_array_metadata();
            rw.depend_on("surface")?;
            rw.depend_on("connectivity")?;
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
            rw.algorithm_rename = Some(("RegionMapping_Importer", "RegionMappingImporter"));
        }
        K::RegionVolumeMapping => {
            rw.drop_array_metadata();
            rw.depend_on("connectivity")?;
            rw.depend_on("volume")?;
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
        }
        K::SensorsEEG | K::SensorsMEG | K::SensorsInternal => sensors(&mut rw)?,
        K::ProjectionSurfaceEEG | K::ProjectionSurfaceMEG | K::ProjectionSurfaceSEEG => {
            projection(&mut rw)?
        }
        K::LocalConnectivity => local_connectivity(&mut rw)?,
        K::ConnectivityAnnotations => {
            rw.depend_on("connectivity")?;
            rw.dataset(DatasetEdit::Rebuild(&["region_annotations"]));
        }
        K::TimeSeries
        | K::TimeSeriesRegion
        | K::TimeSeriesSurface
        | K::TimeSeriesVolume
        | K::TimeSeriesEEG
        | K::TimeSeriesMEG
        | K::TimeSeriesSEEG => time_series(&mut rw)?,
        K::Volume => {
            rw.metadata.strip_quotes("voxel_unit")?;
            rw.param(ParamEdit::NullIfEmpty("connectivity"));
            rw.dataset(DatasetEdit::Rebuild(&["origin", "voxel_size"]));
        }
        K::StructuralMRI => {
            rw.drop_array_metadata();
            rw.depend_on("volume")?;
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
        }
        K::ComplexCoherenceSpectrum => {
            rw.drop_array_metadata_and_title();
            rw.metadata.coerce_float("epoch_length")?;
            rw.metadata.coerce_float("segment_length")?;
            rw.depend_on("source")?;
            rw.metadata.strip_quotes("windowing_function")?;
            rw.dataset(DatasetEdit::Rebuild(&["array_data", "cross_spectrum"]));
        }
        K::WaveletCoefficients => {
            rw.drop_array_metadata_and_title();
            rw.metadata.coerce_float("q_ratio")?;
            rw.metadata.coerce_float("sample_period")?;
            let source = rw.depend_on("source")?;
            rw.metadata.strip_quotes("mother")?;
            rw.metadata.strip_quotes("normalisation")?;
            rw.param(ParamEdit::Set("input_data", Value::String(source.urn())));
            rw.dataset(DatasetEdit::Rebuild(&[
                "amplitude",
                "array_data",
                "frequencies",
                "phase",
                "power",
            ]));
        }
        K::CoherenceSpectrum => {
            rw.drop_array_metadata_and_title();
            rw.metadata.coerce_int("nfft")?;
            rw.depend_on("source")?;
            rw.dataset(DatasetEdit::ConvertToFloat("array_data"));
            rw.dataset(DatasetEdit::Rebuild(&["array_data", "frequency"]));
        }
        K::CrossCorrelation => {
            // The analyzer recorded the bare source identifier
            let raw_source = rw.metadata.required_text("source")?;
            rw.param(ParamEdit::Set("datatype", Value::String(raw_source)));
            rw.depend_on("source")?;
            rw.dataset(DatasetEdit::Rebuild(&["array_data", "time"]));
        }
        K::Fcd => {
            rw.drop_array_metadata_and_title();
            rw.metadata.coerce_float("sp")?;
            rw.metadata.coerce_float("sw")?;
            rw.depend_on("source")?;
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
        }
        K::FourierSpectrum => {
            rw.drop_array_metadata_and_title();
            rw.metadata.coerce_float("segment_length")?;
            let source = rw.depend_on("source")?;
            rw.param(ParamEdit::Set("input_data", Value::String(source.urn())));
            rw.dataset(DatasetEdit::Rebuild(&[
                "amplitude",
                "array_data",
                "average_power",
                "normalised_average_power",
                "phase",
                "power",
            ]));
        }
        K::IndependentComponents => {
            rw.metadata.coerce_int("n_components")?;
            rw.depend_on("source")?;
            rw.dataset(DatasetEdit::Rebuild(&[
                "component_time_series",
                "mixing_matrix",
                "norm_source",
                "normalised_component_time_series",
                "prewhitening_matrix",
                "unmixing_matrix",
            ]));
        }
        K::CorrelationCoefficients => {
            rw.drop_array_metadata_and_title();
            let source = rw.depend_on("source")?;
            rw.param(ParamEdit::Set("datatype", Value::String(source.urn())));
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
        }
        K::PrincipalComponents => {
            rw.depend_on("source")?;
            rw.dataset(DatasetEdit::Rebuild(&[
                "component_time_series",
                "fractions",
                "norm_source",
                "normalised_component_time_series",
                "weights",
            ]));
        }
        K::Covariance => {
            rw.drop_array_metadata_and_title();
            rw.depend_on("source")?;
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
        }
        K::ConnectivityMeasure => {
            rw.drop_array_metadata();
            let connectivity = rw.depend_on("connectivity")?;
            rw.param(ParamEdit::SetFilePath("data_file"));
            rw.param(ParamEdit::Set(
                "connectivity",
                Value::String(connectivity.urn()),
            ));
            rw.dataset(DatasetEdit::Rebuild(ARRAY_DATA));
        }
        // TODO: index DatatypeMeasure containers once a scientific record type exists for them
        K::DatatypeMeasure => rw.outcome = RuleOutcome::Unsupported,
        K::StimuliRegion => stimuli_region(&mut rw)?,
        K::StimuliSurface => stimuli_surface(&mut rw)?,
        K::ValueWrapper => rw.metadata.strip_quotes("data_type")?,
        K::SimulationState => rw.outcome = RuleOutcome::Delete,
    }

    if rw.outcome == RuleOutcome::Continue {
        rw.metadata.insert(KEY_OPERATION_TAG, "");
    }
    Ok(rw)
}

fn connectivity(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.metadata.coerce_int("number_of_connections")?;
    rw.metadata.coerce_int("number_of_regions")?;
    rw.metadata.coerce_bool("undirected")?;
    if rw.metadata.get_str("saved_selection") == Some("null") {
        rw.metadata.insert("saved_selection", "[]");
    }

    rw.param(ParamEdit::RemoveIfEquals("normalization", "none"));
    for dataset in ["tract_lengths", "weights"] {
        rw.dataset(DatasetEdit::RemoveAttributes {
            dataset,
            keys: NON_ZERO_STATISTICS,
        });
    }
    rw.dataset(DatasetEdit::Rebuild(CONNECTIVITY_DATASETS));
    rw.dataset(DatasetEdit::RebuildIfPresent(CONNECTIVITY_OPTIONAL_DATASETS));
    Ok(())
}

fn surface(rw: &mut KindRewrite) -> MigrationResult<()> {
    for key in ["edge_max_length", "edge_mean_length", "edge_min_length"] {
        rw.metadata.coerce_float(key)?;
    }
    for key in ["number_of_split_slices", "number_of_triangles", "number_of_vertices"] {
        rw.metadata.coerce_int(key)?;
    }
    let zero_based = rw.metadata.coerce_bool("zero_based_triangles")?;
    rw.metadata.coerce_bool("bi_hemispheric")?;
    rw.metadata.coerce_bool("valid_for_simulations")?;
    rw.metadata.strip_quotes("surface_type")?;

    rw.param(ParamEdit::Set("zero_based_triangles", Value::Bool(zero_based)));
    rw.dataset(DatasetEdit::StoreEmpty("split_triangles"));
    rw.dataset(DatasetEdit::Rebuild(SURFACE_DATASETS));
    Ok(())
}

fn sensors(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.metadata.coerce_int("number_of_sensors")?;
    rw.metadata.strip_quotes("sensors_type")?;
    rw.metadata.coerce_bool("has_orientation")?;

    rw.dataset(DatasetEdit::RemoveAttributes {
        dataset: "labels",
        keys: &["Size"],
    });
    rw.dataset(DatasetEdit::RemoveAttributes {
        dataset: "locations",
        keys: LEGACY_DATASET_ATTRIBUTES,
    });
    rw.dataset(DatasetEdit::DecodeBytes("labels"));

    let (sensors_type, datasets) = match rw.kind {
        LegacyKind::SensorsMEG => {
            rw.dataset(DatasetEdit::RemoveAttributes {
                dataset: "orientations",
                keys: LEGACY_DATASET_ATTRIBUTES,
            });
            ("MEG", MEG_SENSOR_DATASETS)
        }
        LegacyKind::SensorsEEG => ("EEG", SENSOR_DATASETS),
        _ => ("Internal", SENSOR_DATASETS),
    };
    rw.param(ParamEdit::Set("sensors_type", Value::from(sensors_type)));
    rw.dataset(DatasetEdit::Rebuild(datasets));
    rw.algorithm_rename = Some(("Sensors_Importer", "SensorsImporter"));
    Ok(())
}

fn projection(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.depend_on("sensors")?;
    rw.depend_on("sources")?;
    rw.metadata.strip_quotes("projection_type")?;

    rw.dataset(DatasetEdit::RemoveAttributes {
        dataset: "projection_data",
        keys: LEGACY_DATASET_ATTRIBUTES,
    });
    rw.param(ParamEdit::SetFilePath("projection_file"));
    rw.dataset(DatasetEdit::Rebuild(&["projection_data"]));
    rw.algorithm_rename = Some((
        "BrainstormGainMatrixImporter",
        "ProjectionMatrixSurfaceEEGImporter",
    ));
    Ok(())
}

fn local_connectivity(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.metadata.coerce_float("cutoff")?;
    let surface = rw.depend_on("surface")?;

    rw.dataset(DatasetEdit::DecodeAttributes {
        dataset: "matrix",
        keys: &["Shape", "dtype", "format"],
    });

    let equation = split_equation("equation", &rw.metadata.required_text("equation")?)?;
    rw.metadata.insert("equation", equation);

    rw.param(ParamEdit::Set("surface", Value::String(surface.urn())));
    Ok(())
}

fn time_series(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.param(ParamEdit::Remove(""));
    rw.param(ParamEdit::NullIfEmpty("surface"));
    rw.param(ParamEdit::NullIfEmpty("stimulus"));

    rw.metadata
        .discard(&["has_surface_mapping", "has_volume_mapping"]);
    rw.metadata.discard(LENGTH_KEYS);

    let is_volume = rw.kind == LegacyKind::TimeSeriesVolume;
    if !is_volume {
        rw.metadata.coerce_int("nr_dimensions")?;
        rw.metadata.coerce_float("sample_rate")?;
    }
    rw.metadata.coerce_float("sample_period")?;
    rw.metadata.coerce_float("start_time")?;
    rw.metadata.strip_quotes("sample_period_unit")?;
    rw.metadata.strip_quotes(KEY_TITLE)?;

    rw.dataset(DatasetEdit::Rebuild(if is_volume {
        VOLUME_TIME_SERIES_DATASETS
    } else {
        TIME_SERIES_DATASETS
    }));

    match rw.kind {
        LegacyKind::TimeSeriesRegion => {
            rw.depend_on("region_mapping")?;
            rw.depend_on("connectivity")?;
        }
        LegacyKind::TimeSeriesSurface => {
            rw.depend_on("surface")?;
        }
        LegacyKind::TimeSeriesEEG | LegacyKind::TimeSeriesMEG | LegacyKind::TimeSeriesSEEG => {
            rw.depend_on("sensors")?;
        }
        LegacyKind::TimeSeriesVolume => {
            rw.depend_on("volume")?;
            rw.metadata.discard(&["nr_dimensions", "sample_rate"]);
        }
        _ => {}
    }
    Ok(())
}

fn migrate_stimulus_equations(rw: &mut KindRewrite) -> MigrationResult<()> {
    for field in ["spatial", "temporal"] {
        let migrated = split_composite_field(field, &rw.metadata.required_text(field)?)?;
        rw.metadata.insert(field, migrated);
    }
    Ok(())
}

/// Move a literal array out of the root block into a dataset of the same name.
fn literal_to_dataset(rw: &mut KindRewrite, field: &'static str) -> MigrationResult<Value> {
    let literal = legacy_literal::parse(&rw.metadata.required_text(field)?)?;
    let data = legacy_literal::to_int_dataset(&literal)
        .or_else(|_| legacy_literal::to_float_dataset(&literal))?;
    rw.metadata.remove(field);
    rw.dataset(DatasetEdit::Store {
        dataset: field,
        data,
    });
    Ok(literal)
}

fn stimuli_region(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.depend_on("connectivity")?;

    let literal = legacy_literal::parse(&rw.metadata.required_text("weight")?)?;
    let weight = legacy_literal::to_float_dataset(&literal)?;
    rw.param(ParamEdit::Set("weight", float_array(&literal)));

    migrate_stimulus_equations(rw)?;
    rw.metadata.remove("weight");
    rw.dataset(DatasetEdit::Store {
        dataset: "weight",
        data: weight,
    });
    rw.dataset(DatasetEdit::Rebuild(&["weight"]));
    Ok(())
}

fn stimuli_surface(rw: &mut KindRewrite) -> MigrationResult<()> {
    rw.depend_on("surface")?;
    migrate_stimulus_equations(rw)?;

    literal_to_dataset(rw, "focal_points_surface")?;
    let triangles = literal_to_dataset(rw, "focal_points_triangles")?;
    rw.param(ParamEdit::Set("focal_points_triangles", triangles));
    rw.dataset(DatasetEdit::Rebuild(&[
        "focal_points_surface",
        "focal_points_triangles",
    ]));
    Ok(())
}

/// Same nesting, every number as a float
fn float_array(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(float_array).collect()),
        Value::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::normalize_identity;
    use neurostore_container::AttributeMap;
    use neurostore_structures::{AttrValue, MetadataValue};
    use serde_json::json;

    const GID: &str = "0d6bd1b0c09d11e9a6d70242ac130002";
    const SOURCE: &str = "7a3c9e40-c09d-11e9-a6d7-0242ac130002";

    fn root(kind: &str, extra: &[(&str, &str)]) -> NormalizedRoot {
        let mut stored: AttributeMap = extra
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::Bytes(v.as_bytes().to_vec())))
            .collect();
        stored.insert("Type".into(), AttrValue::from(kind));
        stored.insert("Gid".into(), AttrValue::from(GID));
        normalize_identity(Path::new("t.h5"), &stored, 5).unwrap()
    }

    #[test]
    fn test_connectivity_rewrite() {
        let rw = rewrite(root(
            "Connectivity",
            &[
                ("Number_of_regions", "5"),
                ("Number_of_connections", "10"),
                ("Undirected", "1"),
                ("Saved_selection", "null"),
            ],
        ))
        .unwrap();

        assert_eq!(rw.metadata.get("number_of_regions"), Some(&MetadataValue::Int(5)));
        assert_eq!(rw.metadata.get("undirected"), Some(&MetadataValue::Bool(true)));
        assert_eq!(rw.metadata.get_str("saved_selection"), Some("[]"));
        assert_eq!(rw.metadata.get_str("operation_tag"), Some(""));
        assert!(rw.dependencies.is_empty());
        assert!(rw
            .param_edits
            .contains(&ParamEdit::RemoveIfEquals("normalization", "none")));
        assert_eq!(rw.outcome, RuleOutcome::Continue);
    }

    #[test]
    fn test_undirected_zero_is_false() {
        let rw = rewrite(root(
            "Connectivity",
            &[
                ("Number_of_regions", "5"),
                ("Number_of_connections", "10"),
                ("Undirected", "0"),
                ("Saved_selection", "[1, 2]"),
            ],
        ))
        .unwrap();
        assert_eq!(
            rw.metadata.get("undirected").unwrap().to_string(),
            "bool:False"
        );
        assert_eq!(rw.metadata.get_str("saved_selection"), Some("[1, 2]"));
    }

    #[test]
    fn test_time_series_region_references() {
        let rw = rewrite(root(
            "TimeSeriesRegion",
            &[
                ("Connectivity", SOURCE),
                ("Region_mapping", "8b4d0f50c09d11e9a6d70242ac130002"),
                ("Nr_dimensions", "4"),
                ("Sample_rate", "1024.0"),
                ("Sample_period", "0.9765625"),
                ("Start_time", "0"),
                ("Sample_period_unit", "\"ms\""),
                ("Title", "\"Regions\""),
                ("Has_surface_mapping", "bool:True"),
                ("Length_1d", "10"),
            ],
        ))
        .unwrap();

        let connectivity = rw.dependencies["connectivity"];
        assert_eq!(connectivity, Gid::parse(SOURCE).unwrap());
        assert!(rw.dependencies.contains_key("region_mapping"));
        assert_eq!(
            rw.metadata.get("connectivity").unwrap().to_string(),
            format!("urn:uuid:{}", SOURCE.replace('-', ""))
        );
        assert_eq!(rw.metadata.get_str("sample_period_unit"), Some("ms"));
        assert_eq!(rw.metadata.get_str("title"), Some("Regions"));
        assert!(!rw.metadata.contains("has_surface_mapping"));
        assert!(!rw.metadata.contains("length_1d"));
        assert_eq!(rw.metadata.get("nr_dimensions"), Some(&MetadataValue::Int(4)));
        assert!(rw
            .dataset_edits
            .contains(&DatasetEdit::Rebuild(TIME_SERIES_DATASETS)));
    }

    #[test]
    fn test_cross_correlation_keeps_raw_source_parameter() {
        let rw = rewrite(root("CrossCorrelation", &[("Source", SOURCE)])).unwrap();
        assert!(rw
            .param_edits
            .contains(&ParamEdit::Set("datatype", Value::String(SOURCE.to_string()))));
        assert!(rw.dependencies.contains_key("source"));
    }

    #[test]
    fn test_local_connectivity_equation() {
        let rw = rewrite(root(
            "LocalConnectivity",
            &[
                ("Cutoff", "40"),
                ("Surface", SOURCE),
                (
                    "Equation",
                    "{'__mapped_class': 'Gaussian', '__mapped_module': 'tvb.datatypes.equations', \
                     'parameters': {'sigma': 1.0}}",
                ),
            ],
        ))
        .unwrap();
        let equation: Value =
            serde_json::from_str(rw.metadata.get_str("equation").unwrap()).unwrap();
        assert_eq!(equation, json!({"type": "Gaussian", "parameters": {"sigma": 1.0}}));
        assert_eq!(rw.metadata.get("cutoff"), Some(&MetadataValue::Float(40.0)));
    }

    #[test]
    fn test_stimuli_region_weight_becomes_dataset() {
        let rw = rewrite(root(
            "StimuliRegion",
            &[
                ("Connectivity", SOURCE),
                ("Weight", "[0, 0.5, 1]"),
                (
                    "Spatial",
                    r#"{"__mapped_class": "DiscreteEquation", "parameters": {}}"#,
                ),
                (
                    "Temporal",
                    r#"{"__mapped_class": "PulseTrain", "parameters": {"onset": 30.0}}"#,
                ),
            ],
        ))
        .unwrap();

        assert!(!rw.metadata.contains("weight"));
        assert!(rw.dataset_edits.contains(&DatasetEdit::Store {
            dataset: "weight",
            data: DatasetData::from_vec_f64(vec![0.0, 0.5, 1.0]),
        }));
        assert!(rw
            .param_edits
            .contains(&ParamEdit::Set("weight", json!([0.0, 0.5, 1.0]))));
        let temporal: Value =
            serde_json::from_str(rw.metadata.get_str("temporal").unwrap()).unwrap();
        assert_eq!(temporal["type"], "PulseTrain");
    }

    #[test]
    fn test_terminal_and_unsupported_kinds() {
        let deleted = rewrite(root("SimulationState", &[])).unwrap();
        assert_eq!(deleted.outcome, RuleOutcome::Delete);

        let partial = rewrite(root("DatatypeMeasure", &[("Analyzed_datatype", SOURCE)])).unwrap();
        assert_eq!(partial.outcome, RuleOutcome::Unsupported);
        assert!(partial.dependencies.is_empty());
        assert!(!partial.metadata.contains("operation_tag"));
    }

    #[test]
    fn test_param_edits() {
        let mut params = json!({"normalization": "none", "surface": "", "": 1, "stimulus": "x"})
            .as_object()
            .cloned()
            .unwrap();
        let path = Path::new("/store/p/7/Connectivity_a.h5");
        for edit in [
            ParamEdit::RemoveIfEquals("normalization", "none"),
            ParamEdit::NullIfEmpty("surface"),
            ParamEdit::NullIfEmpty("stimulus"),
            ParamEdit::Remove(""),
            ParamEdit::SetFilePath("data_file"),
        ] {
            edit.apply(&mut params, path);
        }
        assert_eq!(
            Value::Object(params),
            json!({
                "surface": null,
                "stimulus": "x",
                "data_file": "/store/p/7/Connectivity_a.h5"
            })
        );
    }
}
