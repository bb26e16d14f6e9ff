//! Postgres executor backed by a sqlx connection pool.

use crate::error::{DbError, DbResult};
use crate::traits::SqlExecutor;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Executes migrations on Postgres.
///
/// Each migration is sent through the simple query protocol, so a record
/// holding several statements (or a `DO` block) runs as one implicit
/// transaction.
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Connect a small pool to `url`.
    pub async fn connect(url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlExecutor for PostgresExecutor {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
