// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Container adapters: what each record kind keeps in its container, and how a staged
//! container is read back into a [`ScientificRecord`].

use crate::storage::StorageManager;
use crate::{ContainerError, ContainerResult};
use neurostore_structures::{
    AdapterKind, DatasetSummary, DatatypeRegistry, GenericAttributes, MetadataValue,
    RootMetadata, ScientificRecord, StructureError, KEY_DATA_VERSION, KEY_GID, KEY_WRITTEN_BY,
};

/// Root keys holding generic attributes rather than scientific scalars
pub const GENERIC_KEYS: &[&str] = &[
    KEY_GID,
    KEY_WRITTEN_BY,
    KEY_DATA_VERSION,
    "subject",
    "title",
    "state",
    "user_tag_1",
    "user_tag_2",
    "user_tag_3",
    "user_tag_4",
    "user_tag_5",
    "visible",
    "create_date",
    "operation_tag",
    "parent_burst",
    "invalid",
    "is_nan",
];

/// Dataset and reference layout of one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSchema {
    pub required_datasets: &'static [&'static str],
    pub optional_datasets: &'static [&'static str],
    /// Root keys that hold identifiers of other records
    pub references: &'static [&'static str],
}

const fn schema(
    required_datasets: &'static [&'static str],
    optional_datasets: &'static [&'static str],
    references: &'static [&'static str],
) -> AdapterSchema {
    AdapterSchema {
        required_datasets,
        optional_datasets,
        references,
    }
}

const TIME_SERIES_DATA: &[&str] = &["data"];
const TIME_SERIES_OPTIONAL: &[&str] = &["time"];
const DECOMPOSITION_OPTIONAL: &[&str] = &[
    "norm_source",
    "component_time_series",
    "normalised_component_time_series",
];

/// Layout of every adapter kind
pub fn adapter_schema(adapter: AdapterKind) -> AdapterSchema {
    use AdapterKind as A;
    match adapter {
        A::Connectivity => schema(
            &["weights", "tract_lengths", "centres", "region_labels"],
            &["orientations", "areas", "cortical", "hemispheres"],
            &[],
        ),
        A::LocalConnectivity => schema(&["matrix"], &[], &["surface"]),
        A::ProjectionMatrix => schema(&["projection_data"], &[], &["sources", "sensors"]),
        A::RegionVolumeMapping => schema(&["array_data"], &[], &["connectivity", "volume"]),
        A::RegionMapping => schema(&["array_data"], &[], &["connectivity", "surface"]),
        A::Sensors => schema(&["labels", "locations"], &["orientations", "usable"], &[]),
        A::SimulationState => schema(&[], &["history", "current_state"], &[]),
        A::CoherenceSpectrum => schema(&["array_data", "frequency"], &[], &["source"]),
        A::ComplexCoherenceSpectrum => {
            schema(&["array_data", "cross_spectrum"], &[], &["source"])
        }
        A::FourierSpectrum => schema(
            &["array_data"],
            &[
                "amplitude",
                "phase",
                "power",
                "average_power",
                "normalised_average_power",
            ],
            &["source"],
        ),
        A::WaveletCoefficients => schema(
            &["array_data"],
            &["amplitude", "frequencies", "phase", "power"],
            &["source"],
        ),
        A::StructuralMRI => schema(&["array_data"], &[], &["volume"]),
        A::Surface => schema(
            &["vertices", "triangles"],
            &["vertex_normals", "triangle_normals", "split_triangles"],
            &[],
        ),
        A::CrossCorrelation => schema(&["array_data"], &["time"], &["source"]),
        A::TimeSeries => schema(TIME_SERIES_DATA, TIME_SERIES_OPTIONAL, &[]),
        A::TimeSeriesRegion => schema(
            TIME_SERIES_DATA,
            TIME_SERIES_OPTIONAL,
            &["connectivity", "region_mapping"],
        ),
        A::TimeSeriesSurface => schema(TIME_SERIES_DATA, TIME_SERIES_OPTIONAL, &["surface"]),
        A::TimeSeriesVolume => schema(TIME_SERIES_DATA, &[], &["volume"]),
        A::TimeSeriesEEG | A::TimeSeriesMEG | A::TimeSeriesSEEG => {
            schema(TIME_SERIES_DATA, TIME_SERIES_OPTIONAL, &["sensors"])
        }
        A::Tracts => schema(
            &["vertices", "tract_start_idx", "tract_region"],
            &[],
            &["region_volume_map"],
        ),
        A::Volume => schema(&["origin", "voxel_size"], &[], &[]),
        A::PrincipalComponents => {
            schema(&["weights", "fractions"], DECOMPOSITION_OPTIONAL, &["source"])
        }
        A::IndependentComponents => schema(
            &["unmixing_matrix", "prewhitening_matrix", "mixing_matrix"],
            DECOMPOSITION_OPTIONAL,
            &["source"],
        ),
        A::ConnectivityMeasure => schema(&["array_data"], &[], &["connectivity"]),
        A::CorrelationCoefficients | A::Covariance | A::Fcd => {
            schema(&["array_data"], &[], &["source"])
        }
        A::StimuliRegion => schema(&["weight"], &[], &["connectivity"]),
        A::StimuliSurface => schema(
            &["focal_points_triangles"],
            &["focal_points_surface"],
            &["surface"],
        ),
        A::DatatypeMeasure => schema(&[], &[], &["analyzed_datatype"]),
        A::ConnectivityAnnotations => schema(&["region_annotations"], &[], &["connectivity"]),
        A::ValueWrapper => schema(&[], &[], &[]),
        A::Cortex => schema(&[], &[], &["surface", "local_connectivity", "region_mapping_data"]),
        A::BurstConfiguration => schema(&[], &[], &[]),
        A::ViewModel => schema(&[], &[], &[]),
    }
}

/// Resolve the adapter recorded in a container's `written_by` attribute.
pub fn written_by(manager: &StorageManager) -> ContainerResult<AdapterKind> {
    let value = manager
        .get_metadata()
        .get(KEY_WRITTEN_BY)
        .ok_or_else(|| StructureError::MissingAttribute(KEY_WRITTEN_BY.to_string()))?
        .to_text();
    AdapterKind::from_class_path(&value)
        .ok_or_else(|| StructureError::UnknownKind(value).into())
}

/// Read a staged container into an in-memory record.
///
/// Required datasets must be present. References are collected from the adapter's
/// reference fields when they hold a typed identifier; empty or absent optional references
/// are skipped.
pub fn load_record(
    manager: &StorageManager,
    adapter: AdapterKind,
    registry: &DatatypeRegistry,
) -> ContainerResult<ScientificRecord> {
    let layout = adapter_schema(adapter);
    let metadata = RootMetadata::from_stored(manager.get_metadata());

    let gid = metadata
        .get(KEY_GID)
        .and_then(MetadataValue::as_reference)
        .ok_or_else(|| StructureError::MissingAttribute(KEY_GID.to_string()))?;

    for required in layout.required_datasets {
        if !manager.has_dataset(required) {
            return Err(ContainerError::MissingDataset((*required).to_string()));
        }
    }

    let mut record = ScientificRecord::new(registry.datatype_for_adapter(adapter).ok(), gid);

    for (key, value) in metadata.iter() {
        if GENERIC_KEYS.contains(&key.as_str()) {
            continue;
        }
        if layout.references.contains(&key.as_str()) {
            if let Some(reference) = value.as_reference() {
                record.references.insert(key.clone(), reference);
            }
            continue;
        }
        record.scalars.insert(key.clone(), value.clone());
    }

    for (name, dataset) in manager.datasets() {
        record.datasets.insert(
            name.to_string(),
            DatasetSummary {
                shape: dataset.data.shape(),
                statistics: dataset.data.statistics(),
            },
        );
    }

    Ok(record)
}

/// Extract the generic attributes shared by every container.
pub fn load_generic_attributes(manager: &StorageManager) -> ContainerResult<GenericAttributes> {
    let metadata = RootMetadata::from_stored(manager.get_metadata());
    let text = |key: &str| metadata.get(key).map(|v| v.to_stored().to_text());
    let non_empty = |key: &str| text(key).filter(|v| !v.is_empty());

    Ok(GenericAttributes {
        subject: text("subject").unwrap_or_default(),
        title: non_empty("title"),
        state: non_empty("state"),
        user_tag_1: text("user_tag_1").unwrap_or_default(),
        user_tag_2: non_empty("user_tag_2"),
        user_tag_3: non_empty("user_tag_3"),
        user_tag_4: non_empty("user_tag_4"),
        user_tag_5: non_empty("user_tag_5"),
        visible: metadata
            .get("visible")
            .and_then(MetadataValue::as_bool)
            .unwrap_or(true),
        create_date: metadata
            .get("create_date")
            .and_then(MetadataValue::as_timestamp),
        operation_tag: non_empty("operation_tag"),
        parent_burst: metadata
            .get("parent_burst")
            .and_then(MetadataValue::as_reference),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeMap, DatasetData};
    use neurostore_structures::{AttrValue, DatatypeKind, Gid};

    fn connectivity_container(gid: Gid) -> StorageManager {
        let mut manager = StorageManager::create("unused.h5");
        manager.set_metadata(AttributeMap::from([
            (KEY_GID.to_string(), AttrValue::from(gid.urn())),
            (
                KEY_WRITTEN_BY.to_string(),
                AttrValue::from(AdapterKind::Connectivity.class_path()),
            ),
            ("number_of_regions".to_string(), AttrValue::Int(2)),
            ("undirected".to_string(), AttrValue::from("bool:True")),
            ("subject".to_string(), AttrValue::from("John Doe")),
            ("visible".to_string(), AttrValue::from("bool:False")),
            ("create_date".to_string(), AttrValue::from("datetime:2020-01-02,03-04-05.000006")),
        ]));
        for name in ["weights", "tract_lengths", "centres"] {
            manager.store_data(name, DatasetData::from_vec_f64(vec![0.0, 2.0]));
        }
        manager.store_data("region_labels", DatasetData::Text(vec!["a".into(), "b".into()]));
        manager
    }

    #[test]
    fn test_load_record_collects_scalars_and_datasets() {
        let gid = Gid::new_random();
        let manager = connectivity_container(gid);
        let registry = DatatypeRegistry::standard().unwrap();

        assert_eq!(written_by(&manager).unwrap(), AdapterKind::Connectivity);
        let record = load_record(&manager, AdapterKind::Connectivity, &registry).unwrap();

        assert_eq!(record.kind, Some(DatatypeKind::Connectivity));
        assert_eq!(record.gid, gid);
        assert_eq!(record.scalar("number_of_regions"), Some(&MetadataValue::Int(2)));
        assert_eq!(record.scalar("undirected"), Some(&MetadataValue::Bool(true)));
        assert!(record.scalar("subject").is_none());
        assert_eq!(record.dataset("weights").unwrap().statistics.unwrap().max, 2.0);
        assert!(record.dataset("region_labels").unwrap().statistics.is_none());
    }

    #[test]
    fn test_load_record_requires_datasets() {
        let mut manager = connectivity_container(Gid::new_random());
        manager.remove_data("centres").unwrap();
        let registry = DatatypeRegistry::standard().unwrap();
        let result = load_record(&manager, AdapterKind::Connectivity, &registry);
        assert!(matches!(result, Err(ContainerError::MissingDataset(name)) if name == "centres"));
    }

    #[test]
    fn test_generic_attributes() {
        let manager = connectivity_container(Gid::new_random());
        let generic = load_generic_attributes(&manager).unwrap();
        assert_eq!(generic.subject, "John Doe");
        assert!(!generic.visible);
        assert!(generic.create_date.is_some());
        assert!(generic.parent_burst.is_none());
    }

    #[test]
    fn test_every_adapter_has_a_schema() {
        for adapter in AdapterKind::list_all() {
            let layout = adapter_schema(*adapter);
            for name in layout.required_datasets {
                assert!(!layout.optional_datasets.contains(name));
            }
        }
    }
}
