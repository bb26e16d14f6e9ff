//! Identifier normalization.
//!
//! Maps human-readable classification names to table names and tenant ids to
//! schema names. Every function here is pure: the same input always yields the
//! same identifier, which is what lets migration names be compared across runs.

use crate::checksum::{short_digest, SHORT_DIGEST_LEN};
use crate::config::NamingConfig;
use crate::identifier::{SchemaName, TableName};
use crate::model::Classification;
use std::fmt::Display;

/// Table name used when a classification name has no alphanumeric characters.
pub const FALLBACK_TABLE_NAME: &str = "unnamed";

/// Truncate `s` to at most `max_bytes` bytes without splitting a character.
pub fn truncate_to_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Fit `base` into `limit` bytes by truncating and appending `_<digest>`.
///
/// The digest is taken over `seed`, which is `base` itself for the first
/// attempt and `base` plus a counter on collision retries.
pub fn shorten_with_digest(base: &str, seed: &str, limit: usize) -> String {
    let keep = limit.saturating_sub(SHORT_DIGEST_LEN + 1);
    let head = truncate_to_bytes(base, keep);
    let candidate = format!("{}_{}", head, short_digest(seed));
    truncate_to_bytes(&candidate, limit).to_string()
}

/// Bound `name` to `limit` bytes, leaving names that already fit untouched.
pub fn fit_identifier(name: &str, limit: usize) -> String {
    if name.len() <= limit {
        name.to_string()
    } else {
        shorten_with_digest(name, name, limit)
    }
}

/// Lower-case `raw`, turn runs of non-alphanumeric characters into a single
/// `_`, and strip leading/trailing underscores.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_underscore = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_underscore && !out.is_empty() {
                out.push('_');
            }
            pending_underscore = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_underscore = true;
        }
    }
    out
}

/// Derives schema, table and auxiliary identifiers under one [`NamingConfig`].
#[derive(Debug, Clone)]
pub struct IdentifierNormalizer {
    config: NamingConfig,
}

impl Default for IdentifierNormalizer {
    fn default() -> Self {
        Self::new(NamingConfig::default())
    }
}

impl IdentifierNormalizer {
    /// Create a normalizer for the given naming rules.
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    /// The naming rules in effect.
    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Identifier byte limit.
    pub fn limit(&self) -> usize {
        self.config.max_identifier_bytes
    }

    /// Table name for a raw classification name.
    ///
    /// `"Robot Specs"` becomes `robot_specs`, `"2024 Reports"` becomes
    /// `t_2024_reports`.
    pub fn table_name(&self, name: &str) -> TableName {
        let mut table = sanitize(name);
        if table.is_empty() {
            table = FALLBACK_TABLE_NAME.to_string();
        }
        if table.starts_with(|c: char| c.is_ascii_digit()) {
            table = format!("{}{}", self.config.digit_prefix, table);
        }
        TableName::new(fit_identifier(&table, self.limit()))
    }

    /// Table name for a classification.
    pub fn table_for(&self, classification: &Classification) -> TableName {
        self.table_name(&classification.name)
    }

    /// Schema name for a tenant, e.g. `tenant_7b21599b_3518_...`.
    pub fn schema_name(&self, tenant_id: impl Display) -> SchemaName {
        let raw = tenant_id.to_string().to_ascii_lowercase();
        let safe: String = raw
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let schema = format!("{}{}", self.config.schema_prefix, safe);
        SchemaName::new(fit_identifier(&schema, self.limit()))
    }

    /// Column holding a foreign key to `table`.
    pub fn fk_column(&self, table: &TableName) -> String {
        fit_identifier(&format!("{}_id", table), self.limit())
    }

    /// Join table for a many-to-many pair.
    pub fn join_table(&self, from: &TableName, to: &TableName) -> TableName {
        TableName::new(fit_identifier(
            &format!("{}_{}_join", from, to),
            self.limit(),
        ))
    }

    /// Join-table columns for a many-to-many pair.
    ///
    /// Self-referencing pairs get `from_`/`to_` prefixes so the two columns
    /// stay distinct.
    pub fn join_columns(&self, from: &TableName, to: &TableName) -> (String, String) {
        if from == to {
            (
                fit_identifier(&format!("from_{}_id", from), self.limit()),
                fit_identifier(&format!("to_{}_id", to), self.limit()),
            )
        } else {
            (self.fk_column(from), self.fk_column(to))
        }
    }
}

/// Build a Postgres URL whose session `search_path` is the tenant's schema.
///
/// With `include_public`, `public` follows the tenant schema so shared tables
/// stay visible.
pub fn tenant_connection_url(base_url: &str, schema: &SchemaName, include_public: bool) -> String {
    let search_path = if include_public {
        format!("{},public", schema)
    } else {
        schema.to_string()
    };
    let options = format!("-c search_path={}", search_path).replace(' ', "%20");
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}options={}", base_url, separator, options)
}

#[cfg(test)]
#[path = "naming_test.rs"]
mod tests;
