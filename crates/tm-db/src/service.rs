//! Per-tenant migration orchestration.
//!
//! [`MigrationService`] ties the pure reconciler to the migration log and an
//! executor. Reading history, reconciling and persisting the batch happen
//! under a per-tenant lock so two concurrent requests for the same tenant
//! cannot both emit the same migration. Different tenants never contend.

use crate::error::{DbError, DbResult};
use crate::traits::SqlExecutor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tm_core::{Classification, MigrationRecord, NewMigration, Reconciler, Relationship};
use tm_meta::MigrationLog;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

/// A migration that failed to execute. Everything after it stays pending.
#[derive(Debug)]
pub struct ExecutionFailure {
    pub record: MigrationRecord,
    pub error: DbError,
}

/// Outcome of executing a tenant's pending migrations.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Migrations that ran, in sequence order, with `applied_at` set
    pub applied: Vec<MigrationRecord>,

    /// The migration that stopped the run, if any
    pub failure: Option<ExecutionFailure>,

    /// Pending migrations not attempted because of the failure
    pub skipped: usize,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Generates, persists and executes migrations for any number of tenants.
pub struct MigrationService {
    log: Arc<MigrationLog>,
    executor: Arc<dyn SqlExecutor>,
    reconciler: Reconciler,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl MigrationService {
    pub fn new(
        log: Arc<MigrationLog>,
        executor: Arc<dyn SqlExecutor>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            log,
            executor,
            reconciler,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn log(&self) -> &MigrationLog {
        &self.log
    }

    fn tenant_lock(&self, tenant_id: Uuid) -> DbResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| DbError::ExecutionError("tenant lock table poisoned".to_string()))?;
        Ok(locks.entry(tenant_id).or_default().clone())
    }

    /// Compute the next batch without persisting it.
    pub fn plan(
        &self,
        tenant_id: Uuid,
        classifications: &[Classification],
        relationships: &[Relationship],
    ) -> DbResult<Vec<NewMigration>> {
        let history = self.log.history(tenant_id)?;
        Ok(self
            .reconciler
            .reconcile(classifications, relationships, &history)?)
    }

    /// Reconcile and persist the next batch for `tenant_id`.
    ///
    /// Returns the records written, which is empty when the tenant is
    /// already up to date.
    pub async fn generate(
        &self,
        tenant_id: Uuid,
        classifications: &[Classification],
        relationships: &[Relationship],
    ) -> DbResult<Vec<MigrationRecord>> {
        let lock = self.tenant_lock(tenant_id)?;
        let _guard = lock.lock().await;
        self.generate_locked(tenant_id, classifications, relationships)
    }

    /// Execute the tenant's pending migrations in sequence order.
    ///
    /// Stops at the first failure; that record and everything after it stay
    /// pending for the next run.
    pub async fn execute_pending(&self, tenant_id: Uuid) -> DbResult<ApplyReport> {
        let lock = self.tenant_lock(tenant_id)?;
        let _guard = lock.lock().await;
        self.execute_locked(tenant_id).await
    }

    /// Generate and then execute under one lock acquisition.
    pub async fn sync(
        &self,
        tenant_id: Uuid,
        classifications: &[Classification],
        relationships: &[Relationship],
    ) -> DbResult<ApplyReport> {
        let lock = self.tenant_lock(tenant_id)?;
        let _guard = lock.lock().await;
        self.generate_locked(tenant_id, classifications, relationships)?;
        self.execute_locked(tenant_id).await
    }

    fn generate_locked(
        &self,
        tenant_id: Uuid,
        classifications: &[Classification],
        relationships: &[Relationship],
    ) -> DbResult<Vec<MigrationRecord>> {
        let batch = self.plan(tenant_id, classifications, relationships)?;
        if batch.is_empty() {
            log::info!("Tenant {} is up to date", tenant_id);
            return Ok(Vec::new());
        }
        let records = self.log.append_batch(&batch)?;
        log::info!(
            "Recorded {} migration(s) for tenant {}",
            records.len(),
            tenant_id
        );
        Ok(records)
    }

    async fn execute_locked(&self, tenant_id: Uuid) -> DbResult<ApplyReport> {
        let pending = self.log.pending(tenant_id)?;
        let total = pending.len();
        let mut report = ApplyReport::default();

        for mut record in pending {
            log::debug!(
                "[{}] {:>4} {}",
                self.executor.backend(),
                record.sequence,
                record.name
            );
            match self.executor.execute_batch(&record.sql).await {
                Ok(()) => {
                    record.applied_at = Some(self.log.mark_applied(tenant_id, record.sequence)?);
                    report.applied.push(record);
                }
                Err(error) => {
                    log::error!(
                        "Migration {} '{}' failed: {}",
                        record.sequence,
                        record.name,
                        error
                    );
                    report.skipped = total - report.applied.len() - 1;
                    report.failure = Some(ExecutionFailure { record, error });
                    break;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
