//! Error types for tm-core

use thiserror::Error;

/// Core error type for tenant-migrate
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Classifications were supplied without a usable tenant
    #[error("[E001] Cannot resolve a tenant for {count} classification(s): tenant_id is nil")]
    MissingTenant { count: usize },

    /// E002: Inputs for one reconciliation belong to different tenants
    #[error("[E002] Tenant mismatch in {input}: expected {expected}, found {found}")]
    TenantMismatch {
        input: String,
        expected: String,
        found: String,
    },

    /// E003: Constraint namer ran out of collision retries
    #[error("[E003] Could not derive a unique constraint name for '{base}' after {attempts} attempts")]
    ConstraintNameExhausted { base: String, attempts: u32 },

    /// E004: Configuration file not found
    #[error("[E004] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E005: Invalid configuration value
    #[error("[E005] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E006: Desired model document could not be parsed
    #[error("[E006] Failed to parse model document {path}: {details}")]
    ModelParseError { path: String, details: String },

    /// E007: IO error with file path context
    #[error("[E007] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E008: YAML parse error
    #[error("[E008] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
