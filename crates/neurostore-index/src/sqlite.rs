// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! SQLite implementation of [`IndexDao`].

use crate::dao::IndexDao;
use crate::entities::{
    Algorithm, BurstConfiguration, ConfigurationRow, DatatypeIndexRow, Entity, LegacyBurst,
    Operation, Project,
};
use crate::{IndexError, IndexResult};
use chrono::NaiveDateTime;
use neurostore_structures::{Gid, IndexKind};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const DATE_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS algorithms (
    id INTEGER PRIMARY KEY,
    module TEXT NOT NULL,
    classname TEXT NOT NULL,
    display_name TEXT NOT NULL,
    UNIQUE (module, classname)
);
CREATE TABLE IF NOT EXISTS operations (
    id INTEGER PRIMARY KEY,
    gid TEXT NOT NULL UNIQUE,
    fk_project INTEGER NOT NULL REFERENCES projects(id),
    fk_from_algo INTEGER REFERENCES algorithms(id),
    status TEXT NOT NULL,
    create_date TEXT,
    parameters TEXT NOT NULL,
    view_model_gid TEXT,
    legacy_burst_id INTEGER
);
CREATE TABLE IF NOT EXISTS datatypes (
    id INTEGER PRIMARY KEY,
    gid TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    fk_from_operation INTEGER REFERENCES operations(id),
    create_date TEXT,
    subject TEXT NOT NULL,
    title TEXT,
    state TEXT,
    user_tag_1 TEXT NOT NULL,
    user_tag_2 TEXT,
    user_tag_3 TEXT,
    user_tag_4 TEXT,
    user_tag_5 TEXT,
    visible INTEGER NOT NULL,
    operation_tag TEXT,
    fk_parent_burst TEXT,
    scalars TEXT NOT NULL,
    datasets TEXT NOT NULL,
    dependencies TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS configurations (
    id INTEGER PRIMARY KEY,
    gid TEXT NOT NULL UNIQUE,
    fk_operation INTEGER NOT NULL REFERENCES operations(id),
    algorithm TEXT NOT NULL,
    version INTEGER NOT NULL,
    fields TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS bursts (
    id INTEGER PRIMARY KEY,
    gid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    fk_project INTEGER NOT NULL,
    fk_simulation INTEGER,
    status TEXT NOT NULL,
    start_time TEXT,
    finish_time TEXT,
    error_message TEXT,
    datatypes_number INTEGER NOT NULL,
    dynamic_ids TEXT NOT NULL,
    range_1 TEXT,
    range_2 TEXT,
    fk_operation_group INTEGER,
    fk_metric_operation_group INTEGER,
    simulator_gid TEXT
);
CREATE TABLE IF NOT EXISTS legacy_bursts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    fk_project INTEGER NOT NULL,
    fk_simulation INTEGER,
    status TEXT NOT NULL,
    start_time TEXT,
    finish_time TEXT,
    error_message TEXT,
    datatypes_number INTEGER NOT NULL DEFAULT 0,
    dynamic_ids TEXT NOT NULL DEFAULT '[]',
    range_1 TEXT,
    range_2 TEXT,
    fk_operation_group INTEGER,
    fk_metric_operation_group INTEGER
);
";

const DATATYPE_COLUMNS: &str = "id, gid, kind, fk_from_operation, create_date, subject, title, \
     state, user_tag_1, user_tag_2, user_tag_3, user_tag_4, user_tag_5, visible, operation_tag, \
     fk_parent_burst, scalars, datasets, dependencies";

const OPERATION_COLUMNS: &str = "id, gid, fk_project, fk_from_algo, status, create_date, \
     parameters, view_model_gid, legacy_burst_id";

const BURST_COLUMNS: &str = "id, gid, name, fk_project, fk_simulation, status, start_time, \
     finish_time, error_message, datatypes_number, dynamic_ids, range_1, range_2, \
     fk_operation_group, fk_metric_operation_group, simulator_gid";

/// SQLite-backed relational index
pub struct SqliteIndex {
    connection: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) an index database file. The schema is created when missing.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> IndexResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;PRAGMA synchronous=FULL;")?;
        info!(
            target: "neurostore-index",
            "Opened index database {}",
            path.as_ref().display()
        );
        Self::with_connection(conn)
    }

    /// In-memory database, schema included.
    pub fn open_in_memory() -> IndexResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> IndexResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(conn),
        })
    }

    /// Seed a schema 4 burst, as found in a legacy database.
    pub fn insert_legacy_burst(&self, burst: &LegacyBurst) -> IndexResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT OR REPLACE INTO legacy_bursts (id, name, fk_project, fk_simulation, status, \
             start_time, finish_time, error_message, datatypes_number, dynamic_ids, range_1, \
             range_2, fk_operation_group, fk_metric_operation_group) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                burst.id,
                burst.name,
                burst.fk_project,
                burst.fk_simulation,
                burst.status,
                burst.start_time,
                burst.finish_time,
                burst.error_message,
                burst.datatypes_number,
                burst.dynamic_ids,
                burst.range_1,
                burst.range_2,
                burst.fk_operation_group,
                burst.fk_metric_operation_group,
            ],
        )?;
        Ok(())
    }

    pub fn datatype_count(&self) -> IndexResult<i64> {
        let conn = self.connection.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM datatypes", [], |row| row.get(0))?)
    }

    pub fn configuration_count(&self) -> IndexResult<i64> {
        let conn = self.connection.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM configurations", [], |row| row.get(0))?)
    }

    /// Configuration row persisted for an operation, if any.
    pub fn get_configuration_for_operation(
        &self,
        fk_operation: i64,
    ) -> IndexResult<Option<ConfigurationRow>> {
        let conn = self.connection.lock();
        let row = conn
            .query_row(
                "SELECT id, gid, fk_operation, algorithm, version, fields FROM configurations \
                 WHERE fk_operation = ?1 ORDER BY id DESC LIMIT 1",
                params![fk_operation],
                |row| {
                    Ok(ConfigurationRow {
                        id: row.get(0)?,
                        gid: gid_column(row, 1)?,
                        fk_operation: row.get(2)?,
                        algorithm: row.get(3)?,
                        version: row.get(4)?,
                        fields: json_column(row, 5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn get_burst_by_gid(&self, gid: &Gid) -> IndexResult<BurstConfiguration> {
        let conn = self.connection.lock();
        conn.query_row(
            &format!("SELECT {} FROM bursts WHERE gid = ?1", BURST_COLUMNS),
            params![gid.hex()],
            burst_from_row,
        )
        .optional()?
        .ok_or_else(|| IndexError::NotFound {
            entity: "burst",
            key: gid.urn(),
        })
    }

    fn store_project(conn: &Connection, mut project: Project) -> IndexResult<Project> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM projects WHERE name = ?1",
                params![project.name],
                |row| row.get(0),
            )
            .optional()?;
        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE projects SET description = ?2 WHERE id = ?1",
                    params![id, project.description],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO projects (id, name, description) VALUES (?1, ?2, ?3)",
                    params![project.id, project.name, project.description],
                )?;
                conn.last_insert_rowid()
            }
        };
        project.id = Some(id);
        Ok(project)
    }

    fn store_algorithm(conn: &Connection, mut algorithm: Algorithm) -> IndexResult<Algorithm> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM algorithms WHERE module = ?1 AND classname = ?2",
                params![algorithm.module, algorithm.classname],
                |row| row.get(0),
            )
            .optional()?;
        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE algorithms SET display_name = ?2 WHERE id = ?1",
                    params![id, algorithm.display_name],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO algorithms (id, module, classname, display_name) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        algorithm.id,
                        algorithm.module,
                        algorithm.classname,
                        algorithm.display_name
                    ],
                )?;
                conn.last_insert_rowid()
            }
        };
        algorithm.id = Some(id);
        Ok(algorithm)
    }

    fn store_operation(conn: &Connection, mut operation: Operation) -> IndexResult<Operation> {
        let existing = existing_id_by_gid(conn, "operations", &operation.gid)?;
        let create_date = operation.create_date.map(format_date);
        let view_model_gid = operation.view_model_gid.map(|g| g.hex());
        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE operations SET fk_project = ?2, fk_from_algo = ?3, status = ?4, \
                     create_date = ?5, parameters = ?6, view_model_gid = ?7, legacy_burst_id = ?8 \
                     WHERE id = ?1",
                    params![
                        id,
                        operation.fk_project,
                        operation.fk_from_algo,
                        operation.status,
                        create_date,
                        operation.parameters,
                        view_model_gid,
                        operation.legacy_burst_id,
                    ],
                )?;
                id
            }
            None => {
                conn.execute(
                    &format!(
                        "INSERT INTO operations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        OPERATION_COLUMNS
                    ),
                    params![
                        operation.id,
                        operation.gid.hex(),
                        operation.fk_project,
                        operation.fk_from_algo,
                        operation.status,
                        create_date,
                        operation.parameters,
                        view_model_gid,
                        operation.legacy_burst_id,
                    ],
                )?;
                conn.last_insert_rowid()
            }
        };
        operation.id = Some(id);
        Ok(operation)
    }

    fn store_datatype(
        conn: &Connection,
        mut row: DatatypeIndexRow,
    ) -> IndexResult<DatatypeIndexRow> {
        let existing = existing_id_by_gid(conn, "datatypes", &row.gid)?;
        let scalars = serde_json::to_string(&row.scalars)?;
        let datasets = serde_json::to_string(&row.datasets)?;
        let dependencies = serde_json::to_string(&row.dependencies)?;
        let create_date = row.create_date.map(format_date);
        let parent_burst = row.fk_parent_burst.map(|g| g.hex());

        if let Some(id) = existing {
            conn.execute("DELETE FROM datatypes WHERE id = ?1", params![id])?;
            row.id = Some(id);
        }
        conn.execute(
            &format!(
                "INSERT INTO datatypes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                DATATYPE_COLUMNS
            ),
            params![
                row.id,
                row.gid.hex(),
                row.kind.name(),
                row.fk_from_operation,
                create_date,
                row.subject,
                row.title,
                row.state,
                row.user_tag_1,
                row.user_tag_2,
                row.user_tag_3,
                row.user_tag_4,
                row.user_tag_5,
                row.visible,
                row.operation_tag,
                parent_burst,
                scalars,
                datasets,
                dependencies,
            ],
        )?;
        row.id = Some(conn.last_insert_rowid());
        Ok(row)
    }

    fn store_configuration(
        conn: &Connection,
        mut configuration: ConfigurationRow,
    ) -> IndexResult<ConfigurationRow> {
        let existing = existing_id_by_gid(conn, "configurations", &configuration.gid)?;
        let fields = serde_json::to_string(&configuration.fields)?;
        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE configurations SET fk_operation = ?2, algorithm = ?3, version = ?4, \
                     fields = ?5 WHERE id = ?1",
                    params![
                        id,
                        configuration.fk_operation,
                        configuration.algorithm,
                        configuration.version,
                        fields
                    ],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO configurations (id, gid, fk_operation, algorithm, version, fields) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        configuration.id,
                        configuration.gid.hex(),
                        configuration.fk_operation,
                        configuration.algorithm,
                        configuration.version,
                        fields
                    ],
                )?;
                conn.last_insert_rowid()
            }
        };
        configuration.id = Some(id);
        Ok(configuration)
    }

    fn store_burst(
        conn: &Connection,
        mut burst: BurstConfiguration,
    ) -> IndexResult<BurstConfiguration> {
        if let Some(id) = existing_id_by_gid(conn, "bursts", &burst.gid)? {
            conn.execute("DELETE FROM bursts WHERE id = ?1", params![id])?;
            burst.id = Some(id);
        }
        conn.execute(
            &format!(
                "INSERT INTO bursts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, \
                 ?12, ?13, ?14, ?15, ?16)",
                BURST_COLUMNS
            ),
            params![
                burst.id,
                burst.gid.hex(),
                burst.name,
                burst.fk_project,
                burst.fk_simulation,
                burst.status,
                burst.start_time.map(format_date),
                burst.finish_time.map(format_date),
                burst.error_message,
                burst.datatypes_number,
                burst.dynamic_ids,
                burst.range_1,
                burst.range_2,
                burst.fk_operation_group,
                burst.fk_metric_operation_group,
                burst.simulator_gid.map(|g| g.hex()),
            ],
        )?;
        burst.id = Some(conn.last_insert_rowid());
        Ok(burst)
    }
}

impl IndexDao for SqliteIndex {
    fn get_datatype_by_gid(&self, hex_id: &str) -> IndexResult<DatatypeIndexRow> {
        let not_found = || IndexError::NotFound {
            entity: "datatype",
            key: hex_id.to_string(),
        };
        let gid = Gid::parse(hex_id).map_err(|_| not_found())?;
        let conn = self.connection.lock();
        conn.query_row(
            &format!("SELECT {} FROM datatypes WHERE gid = ?1", DATATYPE_COLUMNS),
            params![gid.hex()],
            datatype_from_row,
        )
        .optional()?
        .ok_or_else(not_found)
    }

    fn get_operation_by_id(&self, id: i64) -> IndexResult<Operation> {
        let conn = self.connection.lock();
        conn.query_row(
            &format!("SELECT {} FROM operations WHERE id = ?1", OPERATION_COLUMNS),
            params![id],
            operation_from_row,
        )
        .optional()?
        .ok_or_else(|| IndexError::NotFound {
            entity: "operation",
            key: id.to_string(),
        })
    }

    fn get_project_by_name(&self, name: &str) -> IndexResult<Project> {
        let conn = self.connection.lock();
        conn.query_row(
            "SELECT id, name, description FROM projects WHERE name = ?1",
            params![name],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| IndexError::NotFound {
            entity: "project",
            key: name.to_string(),
        })
    }

    fn get_algorithm_by_module(&self, module: &str, classname: &str) -> IndexResult<Algorithm> {
        let conn = self.connection.lock();
        conn.query_row(
            "SELECT id, module, classname, display_name FROM algorithms \
             WHERE module = ?1 AND classname = ?2",
            params![module, classname],
            |row| {
                Ok(Algorithm {
                    id: row.get(0)?,
                    module: row.get(1)?,
                    classname: row.get(2)?,
                    display_name: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| IndexError::NotFound {
            entity: "algorithm",
            key: format!("{}.{}", module, classname),
        })
    }

    fn store_entity(&self, entity: Entity) -> IndexResult<Entity> {
        let conn = self.connection.lock();
        let name = entity.entity_name();
        let stored = match entity {
            Entity::Project(e) => Entity::Project(Self::store_project(&conn, e)?),
            Entity::Algorithm(e) => Entity::Algorithm(Self::store_algorithm(&conn, e)?),
            Entity::Operation(e) => Entity::Operation(Self::store_operation(&conn, e)?),
            Entity::Datatype(e) => Entity::Datatype(Self::store_datatype(&conn, e)?),
            Entity::Configuration(e) => {
                Entity::Configuration(Self::store_configuration(&conn, e)?)
            }
            Entity::Burst(e) => Entity::Burst(Self::store_burst(&conn, e)?),
        };
        debug!(
            target: "neurostore-index",
            "Stored {} row {:?}",
            name,
            stored.id()
        );
        Ok(stored)
    }

    fn get_burst_for_migration(&self, id: i64) -> IndexResult<Option<LegacyBurst>> {
        let conn = self.connection.lock();
        let burst = conn
            .query_row(
                "SELECT id, name, fk_project, fk_simulation, status, start_time, finish_time, \
                 error_message, datatypes_number, dynamic_ids, range_1, range_2, \
                 fk_operation_group, fk_metric_operation_group FROM legacy_bursts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(LegacyBurst {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        fk_project: row.get(2)?,
                        fk_simulation: row.get(3)?,
                        status: row.get(4)?,
                        start_time: row.get(5)?,
                        finish_time: row.get(6)?,
                        error_message: row.get(7)?,
                        datatypes_number: row.get(8)?,
                        dynamic_ids: row.get(9)?,
                        range_1: row.get(10)?,
                        range_2: row.get(11)?,
                        fk_operation_group: row.get(12)?,
                        fk_metric_operation_group: row.get(13)?,
                    })
                },
            )
            .optional()?;
        Ok(burst)
    }
}

fn existing_id_by_gid(conn: &Connection, table: &str, gid: &Gid) -> IndexResult<Option<i64>> {
    Ok(conn
        .query_row(
            &format!("SELECT id FROM {} WHERE gid = ?1", table),
            params![gid.hex()],
            |row| row.get(0),
        )
        .optional()?)
}

fn format_date(date: NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn gid_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Gid> {
    let text: String = row.get(index)?;
    Gid::parse(&text).map_err(|e| conversion_error(index, e))
}

fn opt_gid_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Gid>> {
    let text: Option<String> = row.get(index)?;
    text.map(|t| Gid::parse(&t).map_err(|e| conversion_error(index, e)))
        .transpose()
}

fn date_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let text: Option<String> = row.get(index)?;
    text.map(|t| {
        NaiveDateTime::parse_from_str(&t, DATE_PARSE_FORMAT).map_err(|e| conversion_error(index, e))
    })
    .transpose()
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(index, e))
}

fn kind_column(row: &Row<'_>, index: usize) -> rusqlite::Result<IndexKind> {
    let text: String = row.get(index)?;
    text.parse::<IndexKind>()
        .map_err(|e| conversion_error(index, e))
}

fn datatype_from_row(row: &Row<'_>) -> rusqlite::Result<DatatypeIndexRow> {
    Ok(DatatypeIndexRow {
        id: row.get(0)?,
        gid: gid_column(row, 1)?,
        kind: kind_column(row, 2)?,
        fk_from_operation: row.get(3)?,
        create_date: date_column(row, 4)?,
        subject: row.get(5)?,
        title: row.get(6)?,
        state: row.get(7)?,
        user_tag_1: row.get(8)?,
        user_tag_2: row.get(9)?,
        user_tag_3: row.get(10)?,
        user_tag_4: row.get(11)?,
        user_tag_5: row.get(12)?,
        visible: row.get(13)?,
        operation_tag: row.get(14)?,
        fk_parent_burst: opt_gid_column(row, 15)?,
        scalars: json_column(row, 16)?,
        datasets: json_column(row, 17)?,
        dependencies: json_column(row, 18)?,
    })
}

fn operation_from_row(row: &Row<'_>) -> rusqlite::Result<Operation> {
    Ok(Operation {
        id: row.get(0)?,
        gid: gid_column(row, 1)?,
        fk_project: row.get(2)?,
        fk_from_algo: row.get(3)?,
        status: row.get(4)?,
        create_date: date_column(row, 5)?,
        parameters: row.get(6)?,
        view_model_gid: opt_gid_column(row, 7)?,
        legacy_burst_id: row.get(8)?,
    })
}

fn burst_from_row(row: &Row<'_>) -> rusqlite::Result<BurstConfiguration> {
    Ok(BurstConfiguration {
        id: row.get(0)?,
        gid: gid_column(row, 1)?,
        name: row.get(2)?,
        fk_project: row.get(3)?,
        fk_simulation: row.get(4)?,
        status: row.get(5)?,
        start_time: date_column(row, 6)?,
        finish_time: date_column(row, 7)?,
        error_message: row.get(8)?,
        datatypes_number: row.get(9)?,
        dynamic_ids: row.get(10)?,
        range_1: row.get(11)?,
        range_2: row.get(12)?,
        fk_operation_group: row.get(13)?,
        fk_metric_operation_group: row.get(14)?,
        simulator_gid: opt_gid_column(row, 15)?,
    })
}
