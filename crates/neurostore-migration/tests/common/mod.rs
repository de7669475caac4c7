// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Legacy container and storage-tree fixtures shared by the integration tests

#![allow(dead_code)]

use neurostore_container::{AttributeMap, DatasetData, StorageManager, LEGACY_KEY_DATA_VERSION};
use neurostore_index::{Algorithm, IndexDao, Operation, Project, SqliteIndex};
use neurostore_structures::{AttrValue, Gid};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PROJECT: &str = "demo_project";

/// Builder for a schema 4 container: capitalised keys, byte-string values
pub struct LegacyContainer {
    root: AttributeMap,
    datasets: Vec<(String, DatasetData)>,
}

impl LegacyContainer {
    pub fn new(kind: &str, gid: &str) -> Self {
        let mut container = Self {
            root: AttributeMap::new(),
            datasets: Vec::new(),
        };
        container = container
            .attr("Type", kind)
            .attr("Module", "tvb.datatypes.legacy")
            .attr("Gid", gid)
            .attr("Create_date", "datetime:2019-07-31 10:20:30.123456")
            .attr("Subject", "John Doe")
            .attr("User_tag_1", "imported")
            .attr("Visible", "bool:True");
        container
            .root
            .insert(LEGACY_KEY_DATA_VERSION.to_string(), AttrValue::Int(4));
        container
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.root
            .insert(key.to_string(), AttrValue::Bytes(value.as_bytes().to_vec()));
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.root.remove(key);
        self
    }

    pub fn dataset(mut self, name: &str, data: DatasetData) -> Self {
        self.datasets.push((name.to_string(), data));
        self
    }

    /// Write the container. Numeric datasets carry the stale schema 4 statistics block.
    pub fn write(self, path: &Path) -> PathBuf {
        let mut manager = StorageManager::create(path).with_compression(false);
        manager.set_metadata(self.root);
        for (name, data) in self.datasets {
            let numeric = data.is_numeric();
            let len = data.len() as i64;
            manager.store_data(&name, data);
            if numeric {
                manager
                    .set_dataset_metadata(
                        &name,
                        AttributeMap::from([
                            ("Variance".to_string(), AttrValue::Float(99.0)),
                            ("Size".to_string(), AttrValue::Int(len)),
                            ("Maximum".to_string(), AttrValue::Float(-1.0)),
                        ]),
                    )
                    .unwrap();
            }
        }
        manager.commit().unwrap();
        path.to_path_buf()
    }
}

pub fn bare_hex() -> String {
    Gid::new_random().hex()
}

pub fn connectivity(gid: &str) -> LegacyContainer {
    LegacyContainer::new("Connectivity", gid)
        .attr("Number_of_regions", "5")
        .attr("Number_of_connections", "10")
        .attr("Undirected", "1")
        .attr("Saved_selection", "null")
        .dataset(
            "weights",
            DatasetData::float_with_shape(&[2, 2], vec![0.0, 1.5, 1.5, 0.0]).unwrap(),
        )
        .dataset(
            "tract_lengths",
            DatasetData::float_with_shape(&[2, 2], vec![0.0, 20.0, 20.0, 0.0]).unwrap(),
        )
        .dataset(
            "centres",
            DatasetData::float_with_shape(&[2, 3], vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0]).unwrap(),
        )
        .dataset(
            "region_labels",
            DatasetData::Bytes(vec![b"lA1".to_vec(), b"rA1".to_vec()]),
        )
}

pub fn region_mapping(gid: &str, surface: &str, connectivity: &str) -> LegacyContainer {
    LegacyContainer::new("RegionMapping", gid)
        .attr("Surface", surface)
        .attr("Connectivity", connectivity)
        .attr("Length_1d", "4")
        .attr("Nr_dimensions", "1")
        .dataset("array_data", DatasetData::from_vec_i64(vec![0, 0, 1, 1]))
}

/// A time series of `kind` without its reference attributes
pub fn time_series(kind: &str, gid: &str) -> LegacyContainer {
    LegacyContainer::new(kind, gid)
        .attr("Nr_dimensions", "4")
        .attr("Sample_rate", "1024.0")
        .attr("Sample_period", "0.9765625")
        .attr("Sample_period_unit", "\"ms\"")
        .attr("Start_time", "0")
        .attr("Title", "\"Regions\"")
        .attr("Has_surface_mapping", "bool:True")
        .attr("Has_volume_mapping", "bool:False")
        .attr("Length_1d", "3")
        .dataset(
            "data",
            DatasetData::float_with_shape(&[3, 1, 2, 1], vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap(),
        )
        .dataset("time", DatasetData::from_vec_f64(vec![0.0, 1.0, 2.0]))
}

pub fn sensors_eeg(gid: &str) -> LegacyContainer {
    LegacyContainer::new("SensorsEEG", gid)
        .attr("Number_of_sensors", "2")
        .attr("Sensors_type", "\"EEG\"")
        .attr("Has_orientation", "0")
        .dataset("labels", DatasetData::Bytes(vec![b"Fp1".to_vec(), b"Fz".to_vec()]))
        .dataset(
            "locations",
            DatasetData::float_with_shape(&[2, 3], vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0]).unwrap(),
        )
}

/// A storage tree `<tmp>/PROJECTS/<project>/<operation id>/` plus an in-memory index
pub struct Storage {
    pub dir: TempDir,
    pub index: SqliteIndex,
    pub project_id: i64,
}

impl Storage {
    pub fn new() -> Self {
        let index = SqliteIndex::open_in_memory().unwrap();
        let project_id = index
            .store_entity(Project::new(PROJECT).into())
            .unwrap()
            .id()
            .unwrap();
        Self {
            dir: TempDir::new().unwrap(),
            index,
            project_id,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("PROJECTS")
    }

    /// Create an operation row and its folder.
    pub fn operation(&self) -> (i64, PathBuf) {
        self.operation_with(|_| {})
    }

    pub fn operation_with(&self, configure: impl FnOnce(&mut Operation)) -> (i64, PathBuf) {
        let mut operation = Operation::new(Gid::new_random(), self.project_id);
        configure(&mut operation);
        let id = self.index.store_entity(operation.into()).unwrap().id().unwrap();
        let folder = self.root().join(PROJECT).join(id.to_string());
        std::fs::create_dir_all(&folder).unwrap();
        (id, folder)
    }

    pub fn algorithm(&self, module: &str, classname: &str) -> i64 {
        self.index
            .store_entity(Algorithm::new(module, classname).into())
            .unwrap()
            .id()
            .unwrap()
    }

    pub fn operation_row(&self, id: i64) -> Operation {
        self.index.get_operation_by_id(id).unwrap()
    }
}

pub fn write_operation_xml(folder: &Path, parameters: &str, module: &str, classname: &str) {
    write_operation_xml_with(folder, parameters, module, classname, "")
}

pub fn write_operation_xml_with(
    folder: &Path,
    parameters: &str,
    module: &str,
    classname: &str,
    extra_attributes: &str,
) {
    let xml = format!(
        r#"<?xml version="1.0" ?>
<tvb_data>
  <Operation gid="{gid}" {extra}>
    <status>5-FINISHED</status>
    <create_date>2019-05-20 11:22:33.123456</create_date>
    <parameters>{parameters}</parameters>
    <algorithm><module>{module}</module><classname>{classname}</classname></algorithm>
  </Operation>
</tvb_data>"#,
        gid = Gid::new_random().as_uuid(),
        extra = extra_attributes,
        parameters = escape(parameters),
        module = module,
        classname = classname,
    );
    std::fs::write(folder.join("Operation.xml"), xml).unwrap();
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn datatype_exists(index: &SqliteIndex, gid: &str) -> bool {
    match index.get_datatype_by_gid(gid) {
        Ok(_) => true,
        Err(e) if e.is_not_found() => false,
        Err(e) => panic!("index lookup failed: {}", e),
    }
}
