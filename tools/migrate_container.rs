// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Container Migration Tool

Migrates data version 4 containers (single files or whole storage trees) to the current
data version and brings the relational index up to date.

Usage:
  cargo run --bin migrate_container -- <path>... [--config FILE] [--database FILE] [--debug-<crate>]

Example:
  cargo run --bin migrate_container -- /data/neurostore/PROJECTS --database /data/neurostore/neurostore.db --on-error halt
*/

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use neurostore::config::{find_config_file, load_config, validate_config, NeurostoreConfig};
use neurostore::index::SqliteIndex;
use neurostore::migration::{
    ContainerStatus, ErrorPolicy, MigrationSummary, Orchestrator, StepOptions, V4ToV5Step,
};
use neurostore::observability::{
    debug_flags_help, init_logging, CrateDebugFlags, LogFormat, LoggingConfig,
};
use neurostore::structures::DatatypeRegistry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Migrate legacy neurostore containers to the current data version
#[derive(Parser, Debug)]
#[command(name = "migrate_container", version, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Container files or directory trees to migrate
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (default: discovered neurostore_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Index database, overriding `index.database_path`
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// What to do when a container fails: continue or halt
    #[arg(long)]
    on_error: Option<ErrorPolicy>,

    /// Keep legacy file names in operation folders
    #[arg(long, default_value_t = false)]
    keep_file_names: bool,
}

fn main() -> Result<()> {
    // `--debug-<crate>` flags are handled by the observability crate, not clap
    let mut debug_args = Vec::new();
    let mut cli_args = Vec::new();
    for (position, arg) in std::env::args().enumerate() {
        if position > 0 && arg.starts_with("--debug-") {
            debug_args.push(arg);
        } else {
            cli_args.push(arg);
        }
    }
    let args = Args::parse_from(cli_args);

    let config = resolve_config(&args)?;

    let mut debug_flags = CrateDebugFlags::from_args(debug_args);
    if let Ok(value) = std::env::var("NEUROSTORE_DEBUG") {
        debug_flags.merge_env_value(&value);
    }
    if config.system.debug {
        debug_flags.merge_env_value("all");
    }
    let logging = LoggingConfig {
        level: config.system.log_level.clone(),
        format: LogFormat::Text,
        log_dir: cfg!(feature = "file-logging").then(|| config.logging.log_dir.clone()),
        retention_days: config.logging.retention_days,
        retention_runs: config.logging.retention_runs,
    };
    let logging_guard = init_logging(&debug_flags, &logging)?;

    let policy: ErrorPolicy = config
        .migration
        .on_error
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let registry = DatatypeRegistry::standard().context("Failed to build the datatype registry")?;
    let index = SqliteIndex::open(
        &config.index.database_path,
        Duration::from_millis(config.index.busy_timeout_ms),
    )
    .with_context(|| {
        format!(
            "Failed to open index database {}",
            config.index.database_path.display()
        )
    })?;
    info!(
        target: "migrate_container",
        "Index database: {}", config.index.database_path.display()
    );

    let step = V4ToV5Step::new(&registry, &index)?.with_options(StepOptions {
        rename_legacy_files: config.migration.rename_legacy_files,
        remove_operation_xml: config.migration.remove_operation_xml,
        container_extension: config.storage.container_extension.clone(),
        compression: config.storage.compression,
    });
    let orchestrator = Orchestrator::new(
        config.migration.target_version,
        policy,
        config.storage.container_extension.clone(),
    )
    .with_step(step);

    let mut total = MigrationSummary::default();
    for path in &args.paths {
        let summary = orchestrator
            .run(path)
            .with_context(|| format!("Migration of {} halted", path.display()))?;
        total.outcomes.extend(summary.outcomes);
    }

    print_summary(&total);
    if total.has_failures() {
        drop(logging_guard);
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<NeurostoreConfig> {
    let mut overrides = HashMap::new();
    if let Some(database) = &args.database {
        overrides.insert("database_path".to_string(), database.display().to_string());
    }
    if let Some(policy) = args.on_error {
        let value = match policy {
            ErrorPolicy::Continue => "continue",
            ErrorPolicy::Halt => "halt",
        };
        overrides.insert("on_error".to_string(), value.to_string());
    }
    if args.keep_file_names {
        overrides.insert("rename_legacy_files".to_string(), "false".to_string());
    }

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    let config = match config_path {
        Some(path) => load_config(Some(&path), Some(&overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let mut config = NeurostoreConfig::default();
            neurostore::config::apply_environment_overrides(&mut config);
            neurostore::config::apply_cli_overrides(&mut config, &overrides);
            config
        }
    };
    validate_config(&config)?;
    Ok(config)
}

fn print_summary(summary: &MigrationSummary) {
    for outcome in &summary.outcomes {
        match &outcome.status {
            ContainerStatus::Migrated(reports) => {
                for report in reports {
                    println!(
                        "migrated  {} ({}, {:?})",
                        report.path.display(),
                        report.kind,
                        report.outcome
                    );
                    for dropped in &report.dropped_fields {
                        warn!(
                            target: "migrate_container",
                            "{}: dropped configuration field '{}': {}",
                            report.path.display(),
                            dropped.field,
                            dropped.reason
                        );
                    }
                }
            }
            ContainerStatus::UpToDate => println!("current   {}", outcome.path.display()),
            ContainerStatus::Skipped(reason) => {
                println!("skipped   {} ({})", outcome.path.display(), reason)
            }
            ContainerStatus::Failed(reason) => {
                println!("FAILED    {} ({})", outcome.path.display(), reason)
            }
        }
    }
    println!();
    println!("{}", summary);
}
