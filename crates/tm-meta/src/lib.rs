//! Migration log for tenant-migrate.
//!
//! Provides a DuckDB-backed, append-only store of every migration emitted for
//! every tenant, at `target/migrations.duckdb` by default. The log is the only
//! source of truth for what a tenant schema contains.

pub mod ddl;
pub mod error;
pub mod layout;
pub mod store;

pub use error::{MetaError, MetaResult};
pub use store::MigrationLog;
