// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Migration steps. A step moves one container from its source data version to the next.

use crate::configuration::{reconstruct, ConfigurationObject, DroppedField};
use crate::legacy_kind::{validate_against_registry, LegacyKind};
use crate::metadata::{normalize_identity, KEY_CREATE_DATE};
use crate::normalize::rename_legacy_file_name;
use crate::operation_xml::{LegacyOperation, OPERATION_XML};
use crate::rules::{rewrite, KindRewrite, RuleOutcome};
use crate::{MigrationError, MigrationResult, CURRENT_DATA_VERSION, LEGACY_DATA_VERSION};
use chrono::Utc;
use neurostore_container::{load_generic_attributes, load_record, written_by, StorageManager};
use neurostore_index::{
    BurstConfiguration, ConfigurationRow, DatatypeIndexRow, Entity, IndexDao, LegacyBurst,
};
use neurostore_structures::{
    parse_legacy_timestamp, AdapterKind, DatatypeRegistry, Gid, MetadataValue, RootMetadata,
    KEY_DATA_VERSION, KEY_GID, KEY_WRITTEN_BY,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const KEY_PARENT_BURST: &str = "parent_burst";
const PARAM_TIME_SERIES: &str = "time_series";
const VIEW_MODEL_LABEL: &str = "ViewModel";
const BURST_LABEL: &str = "BurstConfiguration";

/// One version-to-version container migration
pub trait MigrationStep {
    fn source_version(&self) -> u32;

    fn target_version(&self) -> u32;

    /// Migrate the container at `path`, whose declared version is
    /// [`MigrationStep::source_version`].
    fn update(&self, path: &Path) -> MigrationResult<StepReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Rewritten, and indexed when it lives in an operation folder
    Migrated,
    /// The kind has no successor and the file was removed
    Deleted,
    /// Root block rewritten but the kind cannot be indexed yet
    Unsupported,
}

/// What one step did to one container
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Where the container lives after the step; equal to the input unless renamed
    pub path: PathBuf,
    pub kind: LegacyKind,
    pub outcome: StepOutcome,
    /// Legacy parameters left out of the reconstructed configuration object
    pub dropped_fields: Vec<DroppedField>,
    /// Row id of the index row written for the container
    pub index_row: Option<i64>,
}

impl StepReport {
    fn new(path: PathBuf, kind: LegacyKind, outcome: StepOutcome) -> Self {
        Self {
            path,
            kind,
            outcome,
            dropped_fields: Vec::new(),
            index_row: None,
        }
    }
}

/// Knobs for [`V4ToV5Step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOptions {
    /// Apply the schema 5 file name substitutions in operation folders
    pub rename_legacy_files: bool,
    /// Delete `Operation.xml` once its configuration object is persisted
    pub remove_operation_xml: bool,
    /// Extension of containers the step creates (configuration objects, bursts)
    pub container_extension: String,
    pub compression: bool,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            rename_legacy_files: true,
            remove_operation_xml: true,
            container_extension: "h5".to_string(),
            compression: false,
        }
    }
}

/// The schema 4 to schema 5 migration.
///
/// A container whose parent folder is named by a numeric operation id is in storage
/// mode: it may be renamed, its operation's `Operation.xml` is turned into a persisted
/// configuration object, and an index row is written for it. Any other container only
/// has its file rewritten.
pub struct V4ToV5Step<'a, D: IndexDao> {
    registry: &'a DatatypeRegistry,
    index: &'a D,
    options: StepOptions,
}

impl<'a, D: IndexDao> V4ToV5Step<'a, D> {
    /// Fails when a legacy kind has no usable successor in `registry`.
    pub fn new(registry: &'a DatatypeRegistry, index: &'a D) -> MigrationResult<Self> {
        validate_against_registry(registry)?;
        Ok(Self {
            registry,
            index,
            options: StepOptions::default(),
        })
    }

    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StepOptions {
        &self.options
    }

    fn migrate(&self, path: &Path) -> MigrationResult<StepReport> {
        if !path.is_file() {
            return Err(MigrationError::incompatible(path, "not a regular file"));
        }

        let mut manager = StorageManager::open(path)?.with_compression(self.options.compression);
        let root = normalize_identity(path, manager.get_metadata(), CURRENT_DATA_VERSION)?;
        debug!(
            target: "neurostore-migration",
            "{} declares legacy kind {}", path.display(), root.kind
        );

        let KindRewrite {
            kind,
            mut metadata,
            dependencies,
            param_edits,
            algorithm_rename,
            dataset_edits,
            outcome,
        } = rewrite(root)?;

        if outcome == RuleOutcome::Delete {
            manager.delete()?;
            info!(
                target: "neurostore-migration",
                "Deleted {} container {} (no successor kind)", kind, path.display()
            );
            return Ok(StepReport::new(path.to_path_buf(), kind, StepOutcome::Deleted));
        }

        for edit in &dataset_edits {
            edit.apply(&mut manager)?;
        }

        if outcome == RuleOutcome::Unsupported {
            manager.replace_metadata(metadata.to_stored());
            manager.commit()?;
            warn!(
                target: "neurostore-migration",
                "{} containers are not indexed yet; {} left with a rewritten root block only",
                kind,
                path.display()
            );
            return Ok(StepReport::new(path.to_path_buf(), kind, StepOutcome::Unsupported));
        }

        let Some(operation_id) = operation_id_of(path) else {
            manager.replace_metadata(metadata.to_stored());
            manager.commit()?;
            info!(
                target: "neurostore-migration",
                "Migrated standalone {} container {}", kind, path.display()
            );
            return Ok(StepReport::new(path.to_path_buf(), kind, StepOutcome::Migrated));
        };

        let dependency_rows = self.resolve_dependencies(&dependencies)?;

        let target_path = if self.options.rename_legacy_files {
            renamed_path(path)
        } else {
            path.to_path_buf()
        };

        let folder = path.parent().unwrap_or_else(|| Path::new("."));
        let xml_path = folder.join(OPERATION_XML);
        let mut dropped_fields = Vec::new();
        let mut operation = self.index.get_operation_by_id(operation_id)?;

        let legacy_operation = if xml_path.is_file() {
            Some(LegacyOperation::from_file(&xml_path)?)
        } else {
            debug!(
                target: "neurostore-migration",
                "Operation {} has no {}; configuration already migrated", operation_id, OPERATION_XML
            );
            None
        };

        if let Some(legacy) = &legacy_operation {
            let mut params = legacy.parameters()?;
            for edit in &param_edits {
                edit.apply(&mut params, &target_path);
            }

            if let Some(parent_burst) = self.inherited_burst(&params)? {
                metadata.insert(KEY_PARENT_BURST, parent_burst);
            }

            let algorithm_ref = legacy.algorithm()?;
            let classname = match algorithm_rename {
                Some((from, to)) => algorithm_ref.classname.replace(from, to),
                None => algorithm_ref.classname.clone(),
            };
            let algorithm = self
                .index
                .get_algorithm_by_module(&algorithm_ref.module, &classname)?;

            // Derived from the operation so a rerun rewrites the same side containers
            let operation_gid = legacy.gid()?.unwrap_or(operation.gid);
            let (configuration, dropped) = reconstruct(
                operation_gid.derived(VIEW_MODEL_LABEL),
                &classname,
                CURRENT_DATA_VERSION,
                &params,
            );
            dropped_fields = dropped;
            self.persist_configuration(folder, operation_id, &configuration)?;

            operation.fk_from_algo = algorithm.id;
            operation.parameters = serde_json::to_string(&Value::Object(params))?;
            operation.view_model_gid = Some(configuration.gid);
            if operation.create_date.is_none() {
                operation.create_date = legacy.create_date()?;
            }

            if kind.is_time_series() {
                let burst_id = match operation.legacy_burst_id {
                    Some(id) => Some(id),
                    None => legacy.legacy_burst_id()?,
                };
                if let Some(burst) = self.migrate_burst(path, burst_id, &configuration)? {
                    metadata.insert(KEY_PARENT_BURST, burst);
                }
            }

            self.index.store_entity(Entity::Operation(operation))?;
        }

        // Row before commit: a failed index write leaves the file at schema 4 for the next run
        manager.replace_metadata(metadata.to_stored());
        let index_row = self.materialize_index_row(&manager, operation_id, &dependency_rows)?;
        manager.commit_to(&target_path)?;

        if legacy_operation.is_some() && self.options.remove_operation_xml {
            std::fs::remove_file(&xml_path)?;
            debug!(target: "neurostore-migration", "Removed {}", xml_path.display());
        }

        info!(
            target: "neurostore-migration",
            "Migrated {} -> {} (operation {}, index row {})",
            path.display(),
            target_path.display(),
            operation_id,
            index_row
        );

        Ok(StepReport {
            path: target_path,
            kind,
            outcome: StepOutcome::Migrated,
            dropped_fields,
            index_row: Some(index_row),
        })
    }

    /// Index row ids of every dependency. A dependency without a row fails the container.
    fn resolve_dependencies(
        &self,
        dependencies: &BTreeMap<String, Gid>,
    ) -> MigrationResult<BTreeMap<String, i64>> {
        let mut rows = BTreeMap::new();
        for (field, gid) in dependencies {
            let row = self.lookup_dependency(field, gid)?;
            let id = row.id.ok_or_else(|| MigrationError::DependencyNotFound {
                field: field.clone(),
                gid: gid.urn(),
            })?;
            debug!(
                target: "neurostore-migration",
                "Dependency {} = {} resolved to row {}", field, gid, id
            );
            rows.insert(field.clone(), id);
        }
        Ok(rows)
    }

    fn lookup_dependency(&self, field: &str, gid: &Gid) -> MigrationResult<DatatypeIndexRow> {
        self.index.get_datatype_by_gid(&gid.hex()).map_err(|e| {
            if e.is_not_found() {
                MigrationError::DependencyNotFound {
                    field: field.to_string(),
                    gid: gid.urn(),
                }
            } else {
                e.into()
            }
        })
    }

    /// Parent burst of the input time series an analyzer ran on.
    fn inherited_burst(&self, params: &Map<String, Value>) -> MigrationResult<Option<Gid>> {
        let Some(Value::String(raw)) = params.get(PARAM_TIME_SERIES) else {
            return Ok(None);
        };
        let gid = Gid::parse(raw)?;
        Ok(self.lookup_dependency(PARAM_TIME_SERIES, &gid)?.fk_parent_burst)
    }

    /// Write the configuration object's container and its index row.
    fn persist_configuration(
        &self,
        folder: &Path,
        operation_id: i64,
        configuration: &ConfigurationObject,
    ) -> MigrationResult<()> {
        let mut metadata = configuration.to_metadata();
        self.write_side_container(folder, AdapterKind::ViewModel, configuration.gid, &mut metadata)?;

        self.index.store_entity(Entity::Configuration(ConfigurationRow {
            id: None,
            gid: configuration.gid,
            fk_operation: operation_id,
            algorithm: configuration.algorithm.clone(),
            version: configuration.version,
            fields: Value::Object(configuration.fields.clone()),
        }))?;
        debug!(
            target: "neurostore-migration",
            "Persisted {} configuration {} for operation {}",
            configuration.algorithm,
            configuration.gid,
            operation_id
        );
        Ok(())
    }

    /// Rebuild a schema 4 burst as a schema 5 burst configuration, pointing at the
    /// simulator's configuration object. Returns the new burst gid.
    ///
    /// The burst belongs to the project named by the operation folder's parent.
    fn migrate_burst(
        &self,
        container: &Path,
        burst_id: Option<i64>,
        simulator: &ConfigurationObject,
    ) -> MigrationResult<Option<Gid>> {
        let Some(burst_id) = burst_id else {
            return Ok(None);
        };
        let folder = container.parent().unwrap_or_else(|| Path::new("."));
        let project_name = folder
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .ok_or_else(|| MigrationError::incompatible(container, "operation folder has no project"))?;
        let project = self.index.get_project_by_name(project_name)?;
        let fk_project = project.id.ok_or_else(|| {
            MigrationError::incompatible(container, format!("project '{}' has no id", project_name))
        })?;

        let Some(legacy) = self.index.get_burst_for_migration(burst_id)? else {
            warn!(
                target: "neurostore-migration",
                "Legacy burst {} not found; time series keeps no parent burst", burst_id
            );
            return Ok(None);
        };

        let burst = burst_from_legacy(&legacy, fk_project, simulator.gid)?;
        let mut metadata = burst_metadata(&burst);
        self.write_side_container(folder, AdapterKind::BurstConfiguration, burst.gid, &mut metadata)?;
        self.index.store_entity(Entity::Burst(burst.clone()))?;

        info!(
            target: "neurostore-migration",
            "Legacy burst {} ('{}') migrated as {}", burst_id, burst.name, burst.gid
        );
        Ok(Some(burst.gid))
    }

    /// Write `<Kind>_<hex>.<ext>` next to the migrated containers.
    fn write_side_container(
        &self,
        folder: &Path,
        adapter: AdapterKind,
        gid: Gid,
        metadata: &mut RootMetadata,
    ) -> MigrationResult<PathBuf> {
        metadata.insert(KEY_GID, gid);
        metadata.insert(KEY_WRITTEN_BY, adapter.class_path());
        metadata.insert(
            KEY_DATA_VERSION,
            MetadataValue::Int(i64::from(CURRENT_DATA_VERSION)),
        );
        if !metadata.contains(KEY_CREATE_DATE) {
            metadata.insert(KEY_CREATE_DATE, MetadataValue::Timestamp(Utc::now().naive_utc()));
        }

        let stem = adapter.name().trim_end_matches("H5");
        let path = folder.join(format!(
            "{}_{}.{}",
            stem,
            gid.hex(),
            self.options.container_extension
        ));
        let mut manager = StorageManager::create(&path).with_compression(self.options.compression);
        manager.replace_metadata(metadata.to_stored());
        manager.commit()?;
        Ok(path)
    }

    fn materialize_index_row(
        &self,
        manager: &StorageManager,
        operation_id: i64,
        dependency_rows: &BTreeMap<String, i64>,
    ) -> MigrationResult<i64> {
        let adapter = written_by(manager)?;
        let record = load_record(manager, adapter, self.registry)?;
        let attributes = load_generic_attributes(manager)?;

        let mut row = DatatypeIndexRow::new(record.gid, self.registry.index_for_adapter(adapter)?);
        row.fill_from_record(&record, dependency_rows);
        row.fill_from_generic_attributes(&attributes);
        row.fk_from_operation = Some(operation_id);

        let stored = self.index.store_entity(Entity::Datatype(row))?;
        stored.id().ok_or_else(|| {
            MigrationError::incompatible(manager.path(), "index row stored without an id")
        })
    }
}

impl<D: IndexDao> MigrationStep for V4ToV5Step<'_, D> {
    fn source_version(&self) -> u32 {
        LEGACY_DATA_VERSION
    }

    fn target_version(&self) -> u32 {
        CURRENT_DATA_VERSION
    }

    fn update(&self, path: &Path) -> MigrationResult<StepReport> {
        self.migrate(path)
    }
}

/// Operation id named by the container's folder, if the folder is an operation folder.
pub fn operation_id_of(path: &Path) -> Option<i64> {
    path.parent()?.file_name()?.to_str()?.parse().ok()
}

fn renamed_path(path: &Path) -> PathBuf {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => path.with_file_name(rename_legacy_file_name(name)),
        None => path.to_path_buf(),
    }
}

fn burst_from_legacy(
    legacy: &LegacyBurst,
    fk_project: i64,
    simulator_gid: Gid,
) -> MigrationResult<BurstConfiguration> {
    let timestamp = |raw: &Option<String>| {
        raw.as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(parse_legacy_timestamp)
            .transpose()
    };

    let mut burst = BurstConfiguration::new(simulator_gid.derived(BURST_LABEL), fk_project);
    burst.name = legacy.name.clone();
    burst.fk_simulation = legacy.fk_simulation;
    burst.status = legacy.status.clone();
    burst.start_time = timestamp(&legacy.start_time)?;
    burst.finish_time = timestamp(&legacy.finish_time)?;
    burst.error_message = legacy.error_message.clone();
    burst.datatypes_number = legacy.datatypes_number;
    burst.dynamic_ids = legacy.dynamic_ids.clone();
    burst.range_1 = legacy.range_1.clone();
    burst.range_2 = legacy.range_2.clone();
    burst.fk_operation_group = legacy.fk_operation_group;
    burst.fk_metric_operation_group = legacy.fk_metric_operation_group;
    burst.simulator_gid = Some(simulator_gid);
    Ok(burst)
}

fn burst_metadata(burst: &BurstConfiguration) -> RootMetadata {
    let mut metadata = RootMetadata::new();
    metadata.insert("name", burst.name.as_str());
    metadata.insert("status", burst.status.as_str());
    metadata.insert("dynamic_ids", burst.dynamic_ids.as_str());
    metadata.insert("datatypes_number", MetadataValue::Int(burst.datatypes_number));
    if let Some(simulator) = burst.simulator_gid {
        metadata.insert("simulator", simulator);
    }
    if let Some(start) = burst.start_time {
        metadata.insert("start_time", MetadataValue::Timestamp(start));
    }
    if let Some(finish) = burst.finish_time {
        metadata.insert("finish_time", MetadataValue::Timestamp(finish));
    }
    for (key, value) in [("range_1", &burst.range_1), ("range_2", &burst.range_2)] {
        if let Some(range) = value {
            metadata.insert(key, range.as_str());
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_of() {
        assert_eq!(
            operation_id_of(Path::new("/store/PROJECTS/demo/42/Connectivity_ab.h5")),
            Some(42)
        );
        assert_eq!(operation_id_of(Path::new("/tmp/imports/Connectivity_ab.h5")), None);
        assert_eq!(operation_id_of(Path::new("Connectivity_ab.h5")), None);
    }

    #[test]
    fn test_renamed_path() {
        assert_eq!(
            renamed_path(Path::new("/s/p/3/SensorsEEG_4e1f-0c9a.h5")),
            PathBuf::from("/s/p/3/Sensors_4e1f0c9a.h5")
        );
    }

    #[test]
    fn test_burst_from_legacy() {
        let legacy = LegacyBurst {
            id: 3,
            name: "sim_1".to_string(),
            fk_project: 1,
            fk_simulation: Some(9),
            status: "finished".to_string(),
            start_time: Some("2019-08-01 10:00:00.000001".to_string()),
            finish_time: Some(String::new()),
            error_message: None,
            datatypes_number: 2,
            dynamic_ids: "[]".to_string(),
            range_1: None,
            range_2: None,
            fk_operation_group: None,
            fk_metric_operation_group: None,
        };
        let simulator = Gid::new_random();
        let burst = burst_from_legacy(&legacy, 4, simulator).unwrap();
        assert_eq!(burst.gid, burst_from_legacy(&legacy, 4, simulator).unwrap().gid);
        assert_eq!(burst.fk_project, 4);
        assert_eq!(burst.name, "sim_1");
        assert_eq!(burst.simulator_gid, Some(simulator));
        assert!(burst.start_time.is_some());
        assert!(burst.finish_time.is_none());

        let metadata = burst_metadata(&burst);
        assert_eq!(metadata.get("simulator"), Some(&MetadataValue::Reference(simulator)));
        assert_eq!(metadata.get_str("status"), Some("finished"));
    }
}
