//! Append-only migration log.
//!
//! [`MigrationLog`] owns a DuckDB [`Connection`] holding every migration ever
//! emitted, per tenant. Records are inserted once and never rewritten; a
//! successful execution is recorded as a separate row, which is how
//! `applied_at` is derived.

use crate::error::{MetaError, MetaResult};
use crate::layout::upgrade_layout;
use chrono::{DateTime, SubsecRound, Utc};
use duckdb::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tm_core::{MigrationRecord, NewMigration};
use uuid::Uuid;

const SELECT_RECORDS: &str = "\
SELECT m.id, m.tenant_id, m.name, m.sql_text, m.sequence_no,
       epoch_us(m.created_at), epoch_us(a.applied_at)
FROM tm_meta.migrations m
LEFT JOIN tm_meta.applications a
  ON a.tenant_id = m.tenant_id AND a.sequence_no = m.sequence_no
WHERE m.tenant_id = ?";

/// Raw column values of one log row before parsing. Timestamps are
/// microseconds since the Unix epoch.
type RawRecord = (String, String, String, String, i64, i64, Option<i64>);

/// DuckDB-backed migration log shared by every tenant.
pub struct MigrationLog {
    conn: Mutex<Connection>,
}

impl MigrationLog {
    /// Open (or create) the log at `path` and bootstrap its schema.
    ///
    /// `:memory:` opens a throwaway in-memory log.
    pub fn open(path: &Path) -> MetaResult<Self> {
        if path == Path::new(":memory:") {
            return Self::open_memory();
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetaError::ConnectionError(format!("{e}: {}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| MetaError::ConnectionError(format!("{e}: {}", path.display())))?;
        upgrade_layout(&conn)?;
        log::debug!("Opened migration log at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory log with the schema bootstrapped.
    pub fn open_memory() -> MetaResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| MetaError::ConnectionError(e.to_string()))?;
        upgrade_layout(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MetaResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MetaError::ConnectionError("connection lock poisoned".to_string()))
    }

    /// All records of a tenant in ascending sequence order.
    pub fn history(&self, tenant_id: Uuid) -> MetaResult<Vec<MigrationRecord>> {
        let conn = self.conn()?;
        select_records(&conn, tenant_id, false)
    }

    /// Records of a tenant that have not been applied yet, in sequence order.
    pub fn pending(&self, tenant_id: Uuid) -> MetaResult<Vec<MigrationRecord>> {
        let conn = self.conn()?;
        select_records(&conn, tenant_id, true)
    }

    /// Persist a reconciled batch in one transaction.
    ///
    /// Each tenant's migrations must continue its sequence without gaps and
    /// carry names not yet recorded for it; otherwise nothing is written.
    pub fn append_batch(&self, batch: &[NewMigration]) -> MetaResult<Vec<MigrationRecord>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let records = transaction(&conn, |conn| {
            let mut next: HashMap<Uuid, i64> = HashMap::new();
            let mut records = Vec::with_capacity(batch.len());
            for migration in batch {
                let tenant = migration.tenant_id;
                let expected = match next.get(&tenant) {
                    Some(n) => *n,
                    None => max_sequence(conn, tenant)? + 1,
                };
                if migration.sequence != expected {
                    return Err(MetaError::SequenceConflict {
                        tenant_id: tenant.to_string(),
                        expected,
                        found: migration.sequence,
                    });
                }
                if name_exists(conn, tenant, &migration.name)? {
                    return Err(MetaError::DuplicateMigration {
                        tenant_id: tenant.to_string(),
                        name: migration.name.clone(),
                    });
                }

                let mut record = migration.clone().into_record();
                record.created_at = record.created_at.trunc_subsecs(6);
                conn.execute(
                    "INSERT INTO tm_meta.migrations \
                     (id, tenant_id, name, sql_text, sequence_no, created_at) \
                     VALUES (?, ?, ?, ?, ?, make_timestamp(?))",
                    params![
                        record.id.to_string(),
                        tenant.to_string(),
                        record.name,
                        record.sql,
                        record.sequence,
                        record.created_at.timestamp_micros(),
                    ],
                )
                .map_err(|e| {
                    MetaError::QueryError(format!("insert of '{}' failed: {e}", record.name))
                })?;
                next.insert(tenant, expected + 1);
                records.push(record);
            }
            Ok(records)
        })?;
        log::debug!("Recorded {} migration(s)", records.len());
        Ok(records)
    }

    /// Record that the tenant's migration `sequence` ran successfully.
    ///
    /// The first call fixes the timestamp; later calls return it unchanged.
    pub fn mark_applied(&self, tenant_id: Uuid, sequence: i64) -> MetaResult<DateTime<Utc>> {
        let conn = self.conn()?;
        transaction(&conn, |conn| {
            let known: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM tm_meta.migrations WHERE tenant_id = ? AND sequence_no = ?",
                    params![tenant_id.to_string(), sequence],
                    |row| row.get(0),
                )
                .map_err(|e| MetaError::QueryError(format!("lookup failed: {e}")))?;
            if known == 0 {
                return Err(MetaError::QueryError(format!(
                    "no migration with sequence {sequence} for tenant {tenant_id}"
                )));
            }

            let existing: Vec<i64> = conn
                .prepare(
                    "SELECT epoch_us(applied_at) FROM tm_meta.applications \
                     WHERE tenant_id = ? AND sequence_no = ?",
                )?
                .query_map(params![tenant_id.to_string(), sequence], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            if let Some(&applied_at) = existing.first() {
                return parse_timestamp(applied_at);
            }

            let now = Utc::now().trunc_subsecs(6);
            conn.execute(
                "INSERT INTO tm_meta.applications (tenant_id, sequence_no, applied_at) \
                 VALUES (?, ?, make_timestamp(?))",
                params![tenant_id.to_string(), sequence, now.timestamp_micros()],
            )
            .map_err(|e| MetaError::QueryError(format!("mark_applied failed: {e}")))?;
            Ok(now)
        })
    }

    /// Every tenant with at least one record, sorted.
    pub fn tenants(&self) -> MetaResult<Vec<Uuid>> {
        let conn = self.conn()?;
        let raw: Vec<String> = conn
            .prepare("SELECT DISTINCT tenant_id FROM tm_meta.migrations ORDER BY tenant_id")?
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        raw.iter().map(|s| parse_uuid(s)).collect()
    }
}

/// Run `body` between `BEGIN` and `COMMIT`, rolling back on error.
fn transaction<F, T>(conn: &Connection, body: F) -> MetaResult<T>
where
    F: FnOnce(&Connection) -> MetaResult<T>,
{
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| MetaError::TransactionError(format!("BEGIN failed: {e}")))?;

    let result = body(conn);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(MetaError::TransactionError(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
        }
        Err(_) => {
            let _ = conn.execute_batch("ROLLBACK");
        }
    }
    result
}

fn select_records(
    conn: &Connection,
    tenant_id: Uuid,
    pending_only: bool,
) -> MetaResult<Vec<MigrationRecord>> {
    let sql = if pending_only {
        format!("{SELECT_RECORDS} AND a.applied_at IS NULL ORDER BY m.sequence_no")
    } else {
        format!("{SELECT_RECORDS} ORDER BY m.sequence_no")
    };
    let raw: Vec<RawRecord> = conn
        .prepare(&sql)?
        .query_map(params![tenant_id.to_string()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })
        .map_err(|e| MetaError::QueryError(format!("history query failed: {e}")))?
        .collect::<Result<_, _>>()
        .map_err(|e| MetaError::QueryError(format!("history row error: {e}")))?;
    raw.into_iter().map(into_record).collect()
}

fn into_record(raw: RawRecord) -> MetaResult<MigrationRecord> {
    let (id, tenant_id, name, sql, sequence, created_at, applied_at) = raw;
    Ok(MigrationRecord {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        name,
        sql,
        sequence,
        created_at: parse_timestamp(created_at)?,
        applied_at: applied_at.map(parse_timestamp).transpose()?,
    })
}

fn max_sequence(conn: &Connection, tenant_id: Uuid) -> MetaResult<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(sequence_no), 0) FROM tm_meta.migrations WHERE tenant_id = ?",
        params![tenant_id.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| MetaError::QueryError(format!("sequence lookup failed: {e}")))
}

fn name_exists(conn: &Connection, tenant_id: Uuid, name: &str) -> MetaResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM tm_meta.migrations WHERE tenant_id = ? AND name = ?",
            params![tenant_id.to_string(), name],
            |row| row.get(0),
        )
        .map_err(|e| MetaError::QueryError(format!("name lookup failed: {e}")))?;
    Ok(count > 0)
}

fn parse_timestamp(micros: i64) -> MetaResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| MetaError::QueryError(format!("timestamp out of range: {micros}")))
}

fn parse_uuid(raw: &str) -> MetaResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| MetaError::QueryError(format!("bad uuid '{raw}': {e}")))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
