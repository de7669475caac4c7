// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::entities::{Algorithm, DatatypeIndexRow, Entity, LegacyBurst, Operation, Project};
use crate::IndexResult;

/// The data-access facade the migration engine works through.
///
/// Implementations must provide read-your-writes: a row stored with
/// [`IndexDao::store_entity`] is visible to every later lookup on the same facade.
pub trait IndexDao {
    /// Datatype row by gid. Accepts bare hex (with or without dashes) or the URN form.
    fn get_datatype_by_gid(&self, hex_id: &str) -> IndexResult<DatatypeIndexRow>;

    fn get_operation_by_id(&self, id: i64) -> IndexResult<Operation>;

    fn get_project_by_name(&self, name: &str) -> IndexResult<Project>;

    fn get_algorithm_by_module(&self, module: &str, classname: &str) -> IndexResult<Algorithm>;

    /// Idempotent upsert keyed by the entity's natural key. Returns the stored entity with
    /// its row id.
    fn store_entity(&self, entity: Entity) -> IndexResult<Entity>;

    /// Schema 4 burst parameters, `None` when the id names no legacy burst.
    fn get_burst_for_migration(&self, id: i64) -> IndexResult<Option<LegacyBurst>>;
}
