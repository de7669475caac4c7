// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console logging is always available. With the `file-logging` feature each run also
//! gets a timestamped folder with one JSON log file per crate plus a combined file, and
//! old run folders are pruned.

use anyhow::{anyhow, Result};
use chrono::{NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Filter built from `RUST_LOG` when set, else from the debug flags and default level.
fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(debug_flags.to_filter_string(&config.level)))
}

/// Install a console subscriber.
///
/// Fails when a global subscriber is already installed.
pub fn init_console_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(debug_flags, config))
        .with_target(true);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install logging subscriber: {}", e))
}

/// Keeps the file writers alive; logs are flushed when it is dropped.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// The run folder, when file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize console logging plus, when `config.log_dir` is set, per-run log files:
///
/// ```text
/// <log_dir>/
///   └── run_20250101_120000/
///       ├── neurostore-migration.log
///       ├── neurostore-index.log
///       └── neurostore.log (combined)
/// ```
#[cfg(feature = "file-logging")]
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    use anyhow::Context;
    use tracing_appender::rolling;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{Layer, Registry};

    let Some(base_log_dir) = &config.log_dir else {
        init_console_logging(debug_flags, config)?;
        return Ok(LoggingGuard {
            _file_guards: Vec::new(),
            log_dir: None,
        });
    };

    let run_folder = base_log_dir.join(format!(
        "{}{}",
        RUN_PREFIX,
        Utc::now().format(RUN_TIMESTAMP_FORMAT)
    ));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    cleanup_old_logs(base_log_dir, config.retention_days, config.retention_runs)?;

    let mut layers = Vec::new();
    let mut file_guards = Vec::new();

    layers.push(
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(build_filter(debug_flags, config))
            .boxed(),
    );

    for crate_name in crate::KNOWN_CRATES {
        let appender = rolling::never(&run_folder, format!("{}.log", crate_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guards.push(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::new(format!("{}=debug,off", crate_name)))
                .boxed(),
        );
    }

    let combined = rolling::never(&run_folder, "neurostore.log");
    let (combined_writer, combined_guard) = tracing_appender::non_blocking(combined);
    file_guards.push(combined_guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(combined_writer)
            .with_target(true)
            .json()
            .with_filter(build_filter(debug_flags, config))
            .boxed(),
    );

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logging subscriber: {}", e))?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
        log_dir: Some(run_folder),
    })
}

/// Console-only fallback when built without `file-logging`.
#[cfg(not(feature = "file-logging"))]
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    if config.log_dir.is_some() {
        eprintln!("Warning: file logging requested but the file-logging feature is disabled");
    }
    init_console_logging(debug_flags, config)?;
    Ok(LoggingGuard { log_dir: None })
}

/// Remove run folders older than `retention_days`, then keep only the newest
/// `retention_runs` of the rest. Folders not named `run_<timestamp>` are left alone.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u32,
    retention_runs: usize,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }
    let cutoff = Utc::now().naive_utc() - chrono::Duration::days(i64::from(retention_days));

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let started = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(started) = started {
            runs.push((path, started));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (position, (path, started)) in runs.iter().enumerate() {
        if *started < cutoff || position >= retention_runs {
            match std::fs::remove_dir_all(path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_folder(base: &Path, age_days: i64) -> PathBuf {
        let started = Utc::now().naive_utc() - chrono::Duration::days(age_days);
        let path = base.join(format!(
            "{}{}",
            RUN_PREFIX,
            started.format(RUN_TIMESTAMP_FORMAT)
        ));
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_cleanup_by_age_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let expired = run_folder(dir.path(), 30);
        let older = run_folder(dir.path(), 3);
        let newer = run_folder(dir.path(), 1);
        let newest = run_folder(dir.path(), 0);
        let unrelated = dir.path().join("notes");
        std::fs::create_dir_all(&unrelated).unwrap();

        let removed = cleanup_old_logs(dir.path(), 7, 2).unwrap();

        assert_eq!(removed, 2);
        assert!(!expired.exists());
        assert!(!older.exists());
        assert!(newer.exists());
        assert!(newest.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 7, 2).unwrap(), 0);
    }
}
