// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sequential driver that walks a storage tree and applies migration steps to every
//! container until it reaches the target data version.

use crate::step::{MigrationStep, StepOutcome, StepReport};
use crate::{MigrationError, MigrationResult};
use neurostore_container::StorageManager;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, warn};

/// What to do when one container fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Record the failure and move on to the next container
    #[default]
    Continue,
    /// Stop the run and return the error
    Halt,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(ErrorPolicy::Continue),
            "halt" => Ok(ErrorPolicy::Halt),
            other => Err(format!("unknown error policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerStatus {
    /// One report per applied step
    Migrated(Vec<StepReport>),
    UpToDate,
    /// Not a migratable container
    Skipped(String),
    Failed(String),
}

/// Result for one container of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerOutcome {
    pub path: PathBuf,
    pub from_version: Option<u32>,
    pub status: ContainerStatus,
}

impl ContainerOutcome {
    /// Where the container ended up, following renames
    pub fn final_path(&self) -> &Path {
        match &self.status {
            ContainerStatus::Migrated(reports) => reports
                .last()
                .map(|report| report.path.as_path())
                .unwrap_or(&self.path),
            _ => &self.path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    pub outcomes: Vec<ContainerOutcome>,
}

impl MigrationSummary {
    pub fn migrated(&self) -> usize {
        self.count(|s| matches!(s, ContainerStatus::Migrated(_)))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|s| matches!(s, ContainerStatus::UpToDate))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ContainerStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ContainerStatus::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Containers whose kind was deleted during migration
    pub fn deleted(&self) -> usize {
        self.reports()
            .filter(|r| r.outcome == StepOutcome::Deleted)
            .count()
    }

    pub fn reports(&self) -> impl Iterator<Item = &StepReport> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                ContainerStatus::Migrated(reports) => Some(reports),
                _ => None,
            })
            .flatten()
    }

    fn count(&self, predicate: impl Fn(&ContainerStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

impl Display for MigrationSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} migrated ({} deleted), {} up to date, {} skipped, {} failed",
            self.migrated(),
            self.deleted(),
            self.up_to_date(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Applies registered steps to containers one at a time.
pub struct Orchestrator<'a> {
    steps: Vec<Box<dyn MigrationStep + 'a>>,
    target_version: u32,
    policy: ErrorPolicy,
    extension: String,
}

impl<'a> Orchestrator<'a> {
    pub fn new(target_version: u32, policy: ErrorPolicy, extension: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            target_version,
            policy,
            extension: extension.into(),
        }
    }

    pub fn with_step(mut self, step: impl MigrationStep + 'a) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Migrate every container under `root` (or `root` itself when it is a file).
    ///
    /// The file list is taken before the first migration, so containers written during
    /// the run are not visited.
    pub fn run(&self, root: &Path) -> MigrationResult<MigrationSummary> {
        let containers = if root.is_file() {
            vec![root.to_path_buf()]
        } else {
            collect_containers(root, &self.extension)?
        };
        info!(
            target: "neurostore-migration",
            "Found {} containers under {}", containers.len(), root.display()
        );

        let mut summary = MigrationSummary::default();
        for path in containers {
            match self.migrate_file(&path) {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(e) => {
                    error!(
                        target: "neurostore-migration",
                        "Failed to migrate {}: {}", path.display(), e
                    );
                    if self.policy == ErrorPolicy::Halt {
                        return Err(e);
                    }
                    summary.outcomes.push(ContainerOutcome {
                        path,
                        from_version: None,
                        status: ContainerStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        info!(target: "neurostore-migration", "Migration finished: {}", summary);
        Ok(summary)
    }

    /// Bring one container to the target version.
    pub fn migrate_file(&self, path: &Path) -> MigrationResult<ContainerOutcome> {
        let declared = match StorageManager::open(path) {
            Ok(manager) => manager.declared_version(),
            Err(e) => {
                warn!(
                    target: "neurostore-migration",
                    "Skipping {}: {}", path.display(), e
                );
                return Ok(ContainerOutcome {
                    path: path.to_path_buf(),
                    from_version: None,
                    status: ContainerStatus::Skipped(e.to_string()),
                });
            }
        };
        let Some(from_version) = declared else {
            return Ok(ContainerOutcome {
                path: path.to_path_buf(),
                from_version: None,
                status: ContainerStatus::Skipped("no data version".to_string()),
            });
        };
        if from_version >= self.target_version {
            return Ok(ContainerOutcome {
                path: path.to_path_buf(),
                from_version: Some(from_version),
                status: ContainerStatus::UpToDate,
            });
        }

        let mut reports = Vec::new();
        let mut current_path = path.to_path_buf();
        let mut version = from_version;
        while version < self.target_version {
            let step = self
                .steps
                .iter()
                .find(|step| step.source_version() == version)
                .ok_or(MigrationError::UnsupportedVersion(version))?;
            let report = step.update(&current_path)?;
            current_path = report.path.clone();
            let finished = report.outcome != StepOutcome::Migrated;
            reports.push(report);
            if finished {
                break;
            }
            version = step.target_version();
        }

        Ok(ContainerOutcome {
            path: path.to_path_buf(),
            from_version: Some(from_version),
            status: ContainerStatus::Migrated(reports),
        })
    }
}

/// Container files under `root` with the given extension, depth first.
///
/// Entries of one directory are visited with numeric names in numeric order first, then
/// everything else by name, so operation folders are processed in creation order.
pub fn collect_containers(root: &Path, extension: &str) -> MigrationResult<Vec<PathBuf>> {
    let mut containers = Vec::new();
    visit(root, extension, &mut containers)?;
    Ok(containers)
}

fn visit(dir: &Path, extension: &str, containers: &mut Vec<PathBuf>) -> MigrationResult<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|path| sort_key(path));

    for path in entries {
        if path.is_dir() {
            visit(&path, extension, containers)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            containers.push(path);
        }
    }
    Ok(())
}

fn sort_key(path: &Path) -> (u8, i64, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.parse::<i64>() {
        Ok(number) => (0, number, name),
        Err(_) => (1, 0, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_policy_parsing() {
        assert_eq!("halt".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Halt);
        assert_eq!(" Continue ".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Continue);
        assert!("retry".parse::<ErrorPolicy>().is_err());
    }

    #[test]
    fn test_numeric_folders_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for op in ["10", "9", "100", "notes"] {
            let folder = dir.path().join(op);
            std::fs::create_dir(&folder).unwrap();
            std::fs::write(folder.join("Record_a.h5"), b"").unwrap();
            std::fs::write(folder.join("Operation.xml"), b"").unwrap();
        }

        let found = collect_containers(dir.path(), "h5").unwrap();
        let folders: Vec<String> = found
            .iter()
            .map(|p| p.parent().unwrap().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(folders, vec!["9", "10", "100", "notes"]);
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.h5");
        std::fs::write(&path, b"not a container").unwrap();

        let orchestrator = Orchestrator::new(5, ErrorPolicy::Halt, "h5");
        let summary = orchestrator.run(dir.path()).unwrap();
        assert_eq!(summary.skipped(), 1);
        assert!(!summary.has_failures());
    }
}
