// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::*;
use neurostore_container::{DatasetData, StorageManager};
use neurostore_index::{
    Algorithm, DatatypeIndexRow, Entity, IndexDao, IndexError, IndexResult, LegacyBurst,
    Operation, Project, SqliteIndex,
};
use neurostore_migration::{
    ContainerStatus, ErrorPolicy, MigrationError, Orchestrator, StepOutcome, V4ToV5Step,
    CURRENT_DATA_VERSION,
};
use neurostore_structures::DatatypeRegistry;
use std::cell::Cell;

/// Index whose datatype writes fail while `locked` is set, like a busy database
struct LockableIndex<'a> {
    inner: &'a SqliteIndex,
    locked: Cell<bool>,
}

impl IndexDao for LockableIndex<'_> {
    fn get_datatype_by_gid(&self, hex_id: &str) -> IndexResult<DatatypeIndexRow> {
        self.inner.get_datatype_by_gid(hex_id)
    }

    fn get_operation_by_id(&self, id: i64) -> IndexResult<Operation> {
        self.inner.get_operation_by_id(id)
    }

    fn get_project_by_name(&self, name: &str) -> IndexResult<Project> {
        self.inner.get_project_by_name(name)
    }

    fn get_algorithm_by_module(&self, module: &str, classname: &str) -> IndexResult<Algorithm> {
        self.inner.get_algorithm_by_module(module, classname)
    }

    fn store_entity(&self, entity: Entity) -> IndexResult<Entity> {
        if self.locked.get() && matches!(entity, Entity::Datatype(_)) {
            return Err(IndexError::Integrity("database is locked".to_string()));
        }
        self.inner.store_entity(entity)
    }

    fn get_burst_for_migration(&self, id: i64) -> IndexResult<Option<LegacyBurst>> {
        self.inner.get_burst_for_migration(id)
    }
}

fn connectivity_measure(gid: &str, connectivity: &str) -> LegacyContainer {
    LegacyContainer::new("ConnectivityMeasure", gid)
        .attr("Connectivity", connectivity)
        .attr("Title", "\"degree\"")
        .attr("Length_1d", "2")
        .attr("Nr_dimensions", "1")
        .dataset("array_data", DatasetData::from_vec_f64(vec![3.0, 5.0]))
}

#[test]
fn operation_folders_are_migrated_in_creation_order() {
    let storage = Storage::new();
    let registry = DatatypeRegistry::standard().unwrap();

    let connectivity_gid = bare_hex();
    let measure_gid = bare_hex();
    let (_, first) = storage.operation();
    let (_, second) = storage.operation();
    // Written out of order on purpose: the dependency must still be migrated first
    connectivity_measure(&measure_gid, &connectivity_gid)
        .write(&second.join(format!("ConnectivityMeasure_{}.h5", measure_gid)));
    connectivity(&connectivity_gid)
        .write(&first.join(format!("Connectivity_{}.h5", connectivity_gid)));

    let step = V4ToV5Step::new(&registry, &storage.index).unwrap();
    let orchestrator = Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Halt, "h5").with_step(step);
    let summary = orchestrator.run(&storage.root()).unwrap();

    assert_eq!(summary.migrated(), 2);
    assert!(!summary.has_failures());
    assert!(summary.reports().all(|r| r.outcome == StepOutcome::Migrated));
    assert_eq!(summary.outcomes[0].from_version, Some(4));

    let measure = storage.index.get_datatype_by_gid(&measure_gid).unwrap();
    let connectivity_row = storage.index.get_datatype_by_gid(&connectivity_gid).unwrap();
    assert_eq!(
        measure.dependencies["connectivity"],
        connectivity_row.id.unwrap()
    );

    let rerun = orchestrator.run(&storage.root()).unwrap();
    assert_eq!(rerun.up_to_date(), 2);
    assert_eq!(rerun.migrated(), 0);
    assert_eq!(storage.index.datatype_count().unwrap(), 2);
}

#[test]
fn halt_policy_stops_at_first_failure() {
    let storage = Storage::new();
    let registry = DatatypeRegistry::standard().unwrap();

    let (_, folder) = storage.operation();
    connectivity_measure(&bare_hex(), &bare_hex()).write(&folder.join("ConnectivityMeasure_a.h5"));
    let (_, later) = storage.operation();
    let later_gid = bare_hex();
    let later_path = connectivity(&later_gid).write(&later.join("Connectivity_b.h5"));

    let step = V4ToV5Step::new(&registry, &storage.index).unwrap();
    let orchestrator = Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Halt, "h5").with_step(step);

    let err = orchestrator.run(&storage.root()).unwrap_err();
    assert!(matches!(err, MigrationError::DependencyNotFound { .. }));
    assert!(later_path.exists());
    assert!(!datatype_exists(&storage.index, &later_gid));
}

#[test]
fn continue_policy_records_failures_and_moves_on() {
    let storage = Storage::new();
    let registry = DatatypeRegistry::standard().unwrap();

    let (_, folder) = storage.operation();
    let broken = connectivity_measure(&bare_hex(), &bare_hex())
        .write(&folder.join("ConnectivityMeasure_a.h5"));
    let (_, later) = storage.operation();
    let later_gid = bare_hex();
    connectivity(&later_gid).write(&later.join("Connectivity_b.h5"));
    let gone = bare_hex();
    LegacyContainer::new("SimulationState", &gone).write(&later.join("SimulationState_c.h5"));

    let step = V4ToV5Step::new(&registry, &storage.index).unwrap();
    let summary = Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Continue, "h5")
        .with_step(step)
        .run(&storage.root())
        .unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.migrated(), 2);
    assert_eq!(summary.deleted(), 1);
    let failure = summary
        .outcomes
        .iter()
        .find(|o| matches!(o.status, ContainerStatus::Failed(_)))
        .unwrap();
    assert_eq!(failure.path, broken);
    assert!(datatype_exists(&storage.index, &later_gid));
    assert!(!datatype_exists(&storage.index, &gone));
    assert!(summary.to_string().contains("1 failed"));
}

#[test]
fn version_without_a_step_fails_the_container() {
    let storage = Storage::new();
    let (_, folder) = storage.operation();
    connectivity(&bare_hex()).write(&folder.join("Connectivity_a.h5"));

    let summary = Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Continue, "h5")
        .run(&storage.root())
        .unwrap();
    assert_eq!(summary.failed(), 1);
    let ContainerStatus::Failed(reason) = &summary.outcomes[0].status else {
        panic!("expected a failure, got {:?}", summary.outcomes[0].status);
    };
    assert!(reason.contains('4'));
}

#[test]
fn failed_index_write_leaves_container_pending() {
    let storage = Storage::new();
    let registry = DatatypeRegistry::standard().unwrap();
    let index = LockableIndex {
        inner: &storage.index,
        locked: Cell::new(true),
    };

    let module = "tvb.adapters.uploaders.zip_connectivity_importer";
    storage.algorithm(module, "ZIPConnectivityImporter");
    let (op_id, folder) = storage.operation();
    write_operation_xml(
        &folder,
        "{'uploaded': '/data/conn.zip'}",
        module,
        "ZIPConnectivityImporter",
    );
    let gid = bare_hex();
    let path = connectivity(&gid).write(&folder.join(format!("Connectivity_{}.h5", gid)));

    let step = V4ToV5Step::new(&registry, &index).unwrap();
    let orchestrator =
        Orchestrator::new(CURRENT_DATA_VERSION, ErrorPolicy::Continue, "h5").with_step(step);

    let first = orchestrator.run(&storage.root()).unwrap();
    assert_eq!(first.failed(), 1);
    assert!(!datatype_exists(&storage.index, &gid));
    assert_eq!(StorageManager::open(&path).unwrap().declared_version(), Some(4));
    assert!(folder.join("Operation.xml").is_file());

    index.locked.set(false);
    let second = orchestrator.run(&storage.root()).unwrap();
    assert_eq!(second.failed(), 0);
    assert_eq!(second.migrated(), 1);
    assert_eq!(second.up_to_date(), 1);

    let row = storage.index.get_datatype_by_gid(&gid).unwrap();
    assert_eq!(row.fk_from_operation, Some(op_id));
    assert!(!folder.join("Operation.xml").exists());
    assert_eq!(storage.index.configuration_count().unwrap(), 1);
}
