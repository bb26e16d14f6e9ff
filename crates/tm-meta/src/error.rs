//! Error types for the migration log.

use thiserror::Error;

/// Migration log errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Failed to open or create the log database (M001).
    #[error("[M001] Migration log connection failed: {0}")]
    ConnectionError(String),

    /// Bootstrap DDL failed (M002).
    #[error("[M002] Migration log bootstrap failed: {0}")]
    MigrationError(String),

    /// SQL execution error inside the log database (M003).
    #[error("[M003] Migration log query failed: {0}")]
    QueryError(String),

    /// Transaction management error (M004).
    #[error("[M004] Migration log transaction failed: {0}")]
    TransactionError(String),

    /// A migration with this name was already recorded for the tenant (M005).
    #[error("[M005] Migration '{name}' already recorded for tenant {tenant_id}")]
    DuplicateMigration { tenant_id: String, name: String },

    /// The batch does not continue the tenant's sequence (M006).
    #[error("[M006] Sequence conflict for tenant {tenant_id}: expected {expected}, got {found}")]
    SequenceConflict {
        tenant_id: String,
        expected: i64,
        found: i64,
    },

    /// DuckDB driver error with preserved source chain (M007).
    #[error("[M007] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::DuckDb(err)
    }
}
