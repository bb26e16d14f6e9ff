//! Configuration types and parsing for tenantmig.yml

use crate::error::{CoreError, CoreResult};
use crate::identifier::is_safe_identifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Postgres limit on identifier length, in bytes (NAMEDATALEN - 1).
pub const POSTGRES_IDENTIFIER_LIMIT: usize = 63;

/// Smallest identifier budget that still leaves room for a digest suffix.
const MIN_IDENTIFIER_BYTES: usize = 16;

/// Environment variable consulted when no database URL is configured.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Top-level configuration from tenantmig.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Identifier naming rules
    #[serde(default)]
    pub naming: NamingConfig,

    /// Migration log and target database settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Rules for deriving schema, table and constraint identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamingConfig {
    /// Prefix prepended to the sanitized tenant id
    #[serde(default = "default_schema_prefix")]
    pub schema_prefix: String,

    /// Prefix for table names that would otherwise start with a digit
    #[serde(default = "default_digit_prefix")]
    pub digit_prefix: String,

    /// Upper bound for any generated identifier, in bytes
    #[serde(default = "default_max_identifier_bytes")]
    pub max_identifier_bytes: usize,

    /// Collision retries allowed to the constraint namer
    #[serde(default = "default_max_name_attempts")]
    pub max_name_attempts: u32,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            schema_prefix: default_schema_prefix(),
            digit_prefix: default_digit_prefix(),
            max_identifier_bytes: default_max_identifier_bytes(),
            max_name_attempts: default_max_name_attempts(),
        }
    }
}

/// Where the migration log lives and which database executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file holding the migration log
    #[serde(default = "default_log_path")]
    pub log_path: String,

    /// Postgres connection URL for executing migrations
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            url: None,
        }
    }
}

impl DatabaseConfig {
    /// Configured URL, falling back to the `DATABASE_URL` environment variable.
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .filter(|u| !u.trim().is_empty())
    }

    /// Absolute path of the migration log relative to `root`.
    pub fn log_path_absolute(&self, root: &Path) -> PathBuf {
        if self.log_path == ":memory:" {
            return PathBuf::from(&self.log_path);
        }
        root.join(&self.log_path)
    }
}

fn default_schema_prefix() -> String {
    "tenant_".to_string()
}

fn default_digit_prefix() -> String {
    "t_".to_string()
}

fn default_max_identifier_bytes() -> usize {
    POSTGRES_IDENTIFIER_LIMIT
}

fn default_max_name_attempts() -> u32 {
    16
}

fn default_log_path() -> String {
    "target/migrations.duckdb".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory.
    ///
    /// Looks for tenantmig.yml or tenantmig.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("tenantmig.yml");
        let yaml_path = dir.join("tenantmig.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Load from `dir` if a config file exists, otherwise use defaults.
    pub fn load_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::load_from_dir(dir) {
            Err(CoreError::ConfigNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    fn validate(&self) -> CoreResult<()> {
        self.naming.validate()
    }
}

impl NamingConfig {
    /// Check that the configured prefixes and limits can produce valid names.
    pub fn validate(&self) -> CoreResult<()> {
        if !is_safe_identifier(&self.schema_prefix) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "naming.schema_prefix '{}' must be a lowercase identifier",
                    self.schema_prefix
                ),
            });
        }
        if !is_safe_identifier(&self.digit_prefix) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "naming.digit_prefix '{}' must be a lowercase identifier",
                    self.digit_prefix
                ),
            });
        }
        if !(MIN_IDENTIFIER_BYTES..=POSTGRES_IDENTIFIER_LIMIT).contains(&self.max_identifier_bytes)
        {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "naming.max_identifier_bytes must be between {} and {}, got {}",
                    MIN_IDENTIFIER_BYTES, POSTGRES_IDENTIFIER_LIMIT, self.max_identifier_bytes
                ),
            });
        }
        if self.max_name_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "naming.max_name_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
