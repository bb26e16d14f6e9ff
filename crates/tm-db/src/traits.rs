//! Executor trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Runs migration SQL against a tenant database.
///
/// Implementations must be Send + Sync so one executor can serve every tenant.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute one migration, which may hold several statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Backend identifier for logging
    fn backend(&self) -> &'static str;
}
