//! tm-db - Migration execution for tenant-migrate
//!
//! This crate provides the `SqlExecutor` trait, a Postgres implementation,
//! and the `MigrationService` that reconciles, records and executes
//! migrations one tenant at a time.

pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod service;
pub mod traits;

pub use error::{DbError, DbResult};
#[cfg(feature = "postgres")]
pub use postgres::PostgresExecutor;
pub use service::{ApplyReport, ExecutionFailure, MigrationService};
pub use traits::SqlExecutor;

use std::sync::Arc;

/// Connect an executor for `url`, chosen by its scheme.
pub async fn connect(url: &str) -> DbResult<Arc<dyn SqlExecutor>> {
    let scheme = url.split_once("://").map_or("", |(scheme, _)| scheme);
    match scheme {
        #[cfg(feature = "postgres")]
        "postgres" | "postgresql" => Ok(Arc::new(PostgresExecutor::connect(url).await?)),
        other => Err(DbError::NotImplemented {
            backend: if other.is_empty() { "unknown" } else { other }.to_string(),
            feature: "migration execution".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let err = connect("mysql://localhost/db").await.err().unwrap();
        assert!(matches!(
            err,
            DbError::NotImplemented { ref backend, .. } if backend == "mysql"
        ));
        assert!(err.to_string().starts_with("[D003]"));
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_scheme() {
        let err = connect("localhost:5432").await.err().unwrap();
        assert!(matches!(
            err,
            DbError::NotImplemented { ref backend, .. } if backend == "unknown"
        ));
    }
}
