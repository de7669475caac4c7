// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Staged access to one container file.
//!
//! A [`StorageManager`] loads the whole container into memory. Every mutation is applied
//! to the in-memory copy only; nothing touches the disk until [`StorageManager::commit`]
//! or [`StorageManager::commit_to`], which write through a temporary file and an atomic
//! rename.

use crate::dataset::{AttributeMap, Dataset, DatasetData};
use crate::format::{load_container, save_container, ContainerPayload};
use crate::{ContainerError, ContainerResult};
use neurostore_structures::{AttrValue, KEY_DATA_VERSION};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version key as written by schema 4 and older
pub const LEGACY_KEY_DATA_VERSION: &str = "Data_version";

#[derive(Debug)]
pub struct StorageManager {
    path: PathBuf,
    payload: ContainerPayload,
    compress: bool,
}

impl StorageManager {
    /// Load an existing container.
    pub fn open<P: AsRef<Path>>(path: P) -> ContainerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let payload = load_container(&path)?;
        Ok(Self {
            path,
            payload,
            compress: cfg!(feature = "compression"),
        })
    }

    /// Start an empty container. The file exists only after the first commit.
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            payload: ContainerPayload::default(),
            compress: cfg!(feature = "compression"),
        }
    }

    /// Enable or disable LZ4 compression for subsequent commits.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress && cfg!(feature = "compression");
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root attributes
    pub fn get_metadata(&self) -> &AttributeMap {
        &self.payload.root
    }

    /// Merge attributes into the root block.
    pub fn set_metadata(&mut self, attributes: AttributeMap) {
        self.payload.root.extend(attributes);
    }

    /// Replace the whole root block.
    pub fn replace_metadata(&mut self, attributes: AttributeMap) {
        self.payload.root = attributes;
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<AttrValue> {
        self.payload.root.remove(key)
    }

    /// Schema version declared in the root block, under the current key or the legacy
    /// capitalised one.
    pub fn declared_version(&self) -> Option<u32> {
        [KEY_DATA_VERSION, LEGACY_KEY_DATA_VERSION]
            .iter()
            .find_map(|key| self.payload.root.get(*key))
            .and_then(|value| match value {
                AttrValue::Int(v) => u32::try_from(*v).ok(),
                AttrValue::Float(v) if v.fract() == 0.0 && *v >= 0.0 => Some(*v as u32),
                other => other.to_text().trim().parse::<u32>().ok(),
            })
    }

    pub fn get_dataset_metadata(&self, dataset: &str) -> ContainerResult<&AttributeMap> {
        self.dataset(dataset).map(|d| &d.attributes)
    }

    /// Merge attributes into a dataset's block.
    pub fn set_dataset_metadata(
        &mut self,
        dataset: &str,
        attributes: AttributeMap,
    ) -> ContainerResult<()> {
        self.dataset_mut(dataset)?.attributes.extend(attributes);
        Ok(())
    }

    /// Remove one dataset attribute. Absent attributes are not an error; absent datasets are.
    pub fn remove_dataset_metadata(
        &mut self,
        dataset: &str,
        key: &str,
    ) -> ContainerResult<Option<AttrValue>> {
        Ok(self.dataset_mut(dataset)?.attributes.remove(key))
    }

    pub fn get_data(&self, dataset: &str) -> ContainerResult<&DatasetData> {
        self.dataset(dataset).map(|d| &d.data)
    }

    /// Store `data` under `name`, replacing any existing dataset and its attributes.
    pub fn store_data(&mut self, name: &str, data: DatasetData) {
        self.payload
            .datasets
            .insert(name.to_string(), Dataset::new(data));
    }

    /// Replace the content of an existing dataset, keeping its attribute block.
    pub fn replace_data(&mut self, name: &str, data: DatasetData) -> ContainerResult<()> {
        self.dataset_mut(name)?.data = data;
        Ok(())
    }

    pub fn remove_data(&mut self, name: &str) -> ContainerResult<Dataset> {
        self.payload
            .datasets
            .remove(name)
            .ok_or_else(|| ContainerError::MissingDataset(name.to_string()))
    }

    pub fn has_dataset(&self, name: &str) -> bool {
        self.payload.datasets.contains_key(name)
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.payload.datasets.keys().map(String::as_str)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.payload.datasets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write the staged state back to the container's own path.
    pub fn commit(&self) -> ContainerResult<()> {
        save_container(&self.path, &self.payload, self.compress)
    }

    /// Write the staged state to `target`, then remove the file at the old path.
    ///
    /// The new file is complete before the old one disappears, so a crash in between
    /// leaves both rather than neither.
    pub fn commit_to<P: AsRef<Path>>(&mut self, target: P) -> ContainerResult<()> {
        let target = target.as_ref().to_path_buf();
        save_container(&target, &self.payload, self.compress)?;
        if target != self.path && self.path.is_file() {
            std::fs::remove_file(&self.path)?;
            info!(
                target: "neurostore-container",
                "Renamed {} -> {}",
                self.path.display(),
                target.display()
            );
        }
        self.path = target;
        Ok(())
    }

    /// Delete the container file.
    pub fn delete(self) -> ContainerResult<()> {
        if self.path.is_file() {
            std::fs::remove_file(&self.path)?;
        }
        debug!(target: "neurostore-container", "Deleted {}", self.path.display());
        Ok(())
    }

    fn dataset(&self, name: &str) -> ContainerResult<&Dataset> {
        self.payload
            .datasets
            .get(name)
            .ok_or_else(|| ContainerError::MissingDataset(name.to_string()))
    }

    fn dataset_mut(&mut self, name: &str) -> ContainerResult<&mut Dataset> {
        self.payload
            .datasets
            .get_mut(name)
            .ok_or_else(|| ContainerError::MissingDataset(name.to_string()))
    }
}
