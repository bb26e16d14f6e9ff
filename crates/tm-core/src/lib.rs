//! tm-core - Core library for tenant-migrate
//!
//! This crate turns a tenant's desired logical model (classifications and
//! relationships) plus its migration history into the next batch of
//! schema-altering migrations. It holds the identifier rules, the
//! migration-name grammar, history replay, the typed DDL builder and
//! configuration parsing. Nothing here touches a database.

pub mod checksum;
pub mod config;
pub mod constraint;
pub mod ddl;
pub mod document;
pub mod error;
pub mod history;
pub mod identifier;
pub mod migration_name;
pub mod model;
pub mod naming;
pub mod reconcile;
pub mod sql_utils;

pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, NamingConfig};
pub use constraint::ConstraintNamer;
pub use ddl::{Ddl, Ident, QualifiedName};
pub use document::DesiredModel;
pub use error::{CoreError, CoreResult};
pub use history::{HistoryView, Lifecycle, RelationshipKey};
pub use identifier::{SchemaName, TableName};
pub use migration_name::{MigrationName, NameKind};
pub use model::{
    Cardinality, Classification, MigrationRecord, NewMigration, Relationship, RelationshipType,
};
pub use naming::{tenant_connection_url, IdentifierNormalizer};
pub use reconcile::{reconcile, Reconciler};
