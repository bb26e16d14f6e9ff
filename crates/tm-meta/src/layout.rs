//! Versioned layout of the migration log itself.
//!
//! The tables that hold tenant migrations change over time like any other
//! schema. `tm_meta.layout_version` records which [`LAYOUTS`] entries a log
//! file already carries; opening a log applies the missing ones, each
//! together with its version row so a crash never leaves a half-upgraded
//! file behind.

use crate::ddl::{LayoutVersion, LAYOUTS};
use crate::error::{MetaError, MetaResult};
use duckdb::{params, Connection};

const VERSION_TABLE: &str = "CREATE SCHEMA IF NOT EXISTS tm_meta;
CREATE TABLE IF NOT EXISTS tm_meta.layout_version (
    version    INTEGER PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT now()
);";

/// Layout version of the log behind `conn`; 0 for a fresh file.
pub fn layout_version(conn: &Connection) -> MetaResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM tm_meta.layout_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| MetaError::MigrationError(format!("cannot read log layout version: {e}")))
}

/// Newest layout this build knows how to read.
pub fn latest_layout() -> i32 {
    LAYOUTS.last().map_or(0, |l| l.version)
}

/// Bring the log behind `conn` up to [`latest_layout`].
///
/// Fails without touching the file when it was written by a newer build.
pub fn upgrade_layout(conn: &Connection) -> MetaResult<()> {
    conn.execute_batch(VERSION_TABLE)
        .map_err(|e| MetaError::MigrationError(format!("cannot create layout table: {e}")))?;

    let current = layout_version(conn)?;
    if current > latest_layout() {
        return Err(MetaError::MigrationError(format!(
            "log layout v{current} is newer than this build supports (v{})",
            latest_layout()
        )));
    }

    for layout in LAYOUTS.iter().filter(|l| l.version > current) {
        apply(conn, layout)?;
    }
    Ok(())
}

fn apply(conn: &Connection, layout: &LayoutVersion) -> MetaResult<()> {
    log::debug!("Upgrading migration log to layout v{:03}", layout.version);
    let failed =
        |e: duckdb::Error| MetaError::MigrationError(format!("layout v{:03}: {e}", layout.version));

    conn.execute_batch("BEGIN TRANSACTION").map_err(failed)?;
    let result = conn.execute_batch(layout.sql).and_then(|_| {
        conn.execute(
            "INSERT INTO tm_meta.layout_version (version) VALUES (?)",
            params![layout.version],
        )
    });
    match result {
        Ok(_) => conn.execute_batch("COMMIT").map_err(failed),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(failed(e))
        }
    }
}
