//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tm_core::{
    Classification, Config, DesiredModel, MigrationRecord, NewMigration, Reconciler, Relationship,
};
use tm_meta::MigrationLog;
use uuid::Uuid;

use crate::cli::{GlobalArgs, OutputFormat};

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors (the DuckDB connection in particular) still run.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command already printed its diagnostics.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Configuration resolved from tenantmig.yml plus command-line overrides.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl Session {
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let mut config = match &global.config {
            Some(path) => Config::load(Path::new(path)),
            None => Config::load_or_default(&root),
        }
        .context("Failed to load configuration")?;

        if let Some(log_path) = &global.log_path {
            config.database.log_path = log_path.clone();
        }
        if let Some(url) = &global.database_url {
            config.database.url = Some(url.clone());
        }
        log::debug!("Using naming rules {:?}", config.naming);
        Ok(Self { root, config })
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.config.database.log_path_absolute(&self.root)
    }

    pub(crate) fn open_log(&self) -> Result<MigrationLog> {
        let path = self.log_path();
        MigrationLog::open(&path)
            .with_context(|| format!("Failed to open migration log at {}", path.display()))
    }

    pub(crate) fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.config.naming.clone())
    }

    pub(crate) fn database_url(&self) -> Result<String> {
        self.config.database.resolved_url().context(
            "No database URL configured: set database.url, pass --database-url, or export DATABASE_URL",
        )
    }
}

/// A desired model document resolved into engine inputs.
pub(crate) struct LoadedModel {
    pub(crate) tenant_id: Uuid,
    pub(crate) classifications: Vec<Classification>,
    pub(crate) relationships: Vec<Relationship>,
}

pub(crate) fn load_model(path: &str) -> Result<LoadedModel> {
    let document = DesiredModel::load(Path::new(path))
        .with_context(|| format!("Failed to load model document {path}"))?;
    let tenant_id = document.tenant_id;
    let (classifications, relationships) = document
        .into_parts()
        .with_context(|| format!("Invalid model document {path}"))?;
    Ok(LoadedModel {
        tenant_id,
        classifications,
        relationships,
    })
}

pub(crate) fn parse_tenant(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid tenant id '{raw}'"))
}

/// Print any serializable list as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per planned migration; with `sql`, the statement follows indented.
pub(crate) fn print_planned(batch: &[NewMigration], format: OutputFormat, sql: bool) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&batch);
    }
    for migration in batch {
        println!("{:>5}  {}", migration.sequence, migration.name);
        if sql {
            for line in migration.sql.lines() {
                println!("         {line}");
            }
        }
    }
    Ok(())
}

/// One line per recorded migration with its application status.
pub(crate) fn print_records(records: &[MigrationRecord], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&records);
    }
    for record in records {
        let status = match record.applied_at {
            Some(ts) => format!("applied {}", ts.format("%Y-%m-%d %H:%M:%S")),
            None => "pending".to_string(),
        };
        println!("{:>5}  {:<27}  {}", record.sequence, status, record.name);
    }
    Ok(())
}
