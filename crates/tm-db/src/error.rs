//! Error types for tm-db

use thiserror::Error;
use tm_core::CoreError;
use tm_meta::MetaError;

/// Execution and orchestration errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Not implemented (D003)
    #[error("[D003] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Reconciliation failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Migration log failed
    #[error(transparent)]
    Meta(#[from] MetaError),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
