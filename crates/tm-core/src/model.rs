//! Inputs and outputs of migration reconciliation.
//!
//! [`Classification`] and [`Relationship`] are snapshots of the desired logical
//! model supplied by upstream services. [`MigrationRecord`] is an entry of the
//! append-only migration log; [`NewMigration`] is what reconciliation emits
//! before the log assigns an id and timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A discovered document category that maps to one physical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
}

impl Classification {
    /// Create a classification with a fresh id.
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
        }
    }
}

/// How two classification tables are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    /// All cardinalities, in grammar order.
    pub const ALL: [Cardinality; 3] = [
        Cardinality::OneToOne,
        Cardinality::OneToMany,
        Cardinality::ManyToMany,
    ];

    /// Token used inside migration names, e.g. `one_to_many`.
    pub fn token(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToMany => "many_to_many",
        }
    }

    /// Parse a migration-name token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }

    /// True for the shapes implemented as a foreign-key column.
    pub fn is_foreign_key(self) -> bool {
        !matches!(self, Cardinality::ManyToMany)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Relationship type as reported upstream, before direction is normalized.
///
/// Upstream also reports `many-to-one`, which is stored as `one-to-many` with
/// the endpoints swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationshipType {
    /// Normalized cardinality and whether the endpoints must be swapped.
    pub fn normalize(self) -> (Cardinality, bool) {
        match self {
            RelationshipType::OneToOne => (Cardinality::OneToOne, false),
            RelationshipType::OneToMany => (Cardinality::OneToMany, false),
            RelationshipType::ManyToOne => (Cardinality::OneToMany, true),
            RelationshipType::ManyToMany => (Cardinality::ManyToMany, false),
        }
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    /// Accepts `one-to-many`, `one_to_many` and `ONE_TO_MANY` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "one_to_one" => Ok(RelationshipType::OneToOne),
            "one_to_many" => Ok(RelationshipType::OneToMany),
            "many_to_one" => Ok(RelationshipType::ManyToOne),
            "many_to_many" => Ok(RelationshipType::ManyToMany),
            other => Err(format!("unknown relationship cardinality '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Cardinality {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.parse::<RelationshipType>() {
            Ok(RelationshipType::ManyToOne) => Err(serde::de::Error::custom(
                "many-to-one is only accepted on relationships, where it swaps endpoints",
            )),
            Ok(kind) => Ok(kind.normalize().0),
            Err(e) => Err(serde::de::Error::custom(e)),
        }
    }
}

/// A desired link between two classifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRelationship")]
pub struct Relationship {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub from_classification: Uuid,
    pub to_classification: Uuid,
    pub cardinality: Cardinality,
}

impl Relationship {
    /// Create a relationship with a fresh id, normalizing `many-to-one`.
    pub fn new(tenant_id: Uuid, from: Uuid, to: Uuid, kind: RelationshipType) -> Self {
        let (cardinality, swap) = kind.normalize();
        let (from_classification, to_classification) = if swap { (to, from) } else { (from, to) };
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            from_classification,
            to_classification,
            cardinality,
        }
    }
}

#[derive(Deserialize)]
struct RawRelationship {
    id: Uuid,
    tenant_id: Uuid,
    from_classification: Uuid,
    to_classification: Uuid,
    #[serde(alias = "type")]
    cardinality: String,
}

impl TryFrom<RawRelationship> for Relationship {
    type Error = String;

    fn try_from(raw: RawRelationship) -> Result<Self, Self::Error> {
        let kind: RelationshipType = raw.cardinality.parse()?;
        let mut rel = Relationship::new(
            raw.tenant_id,
            raw.from_classification,
            raw.to_classification,
            kind,
        );
        rel.id = raw.id;
        Ok(rel)
    }
}

/// An entry of the persistent migration log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub sql: String,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    /// Set once the statement has run successfully against the tenant database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationRecord {
    /// True once the executor has confirmed the statement.
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// A migration produced by reconciliation, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMigration {
    pub tenant_id: Uuid,
    pub name: String,
    pub sql: String,
    pub sequence: i64,
}

impl NewMigration {
    /// Materialize as a log record with a fresh id, created now.
    pub fn into_record(self) -> MigrationRecord {
        MigrationRecord {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            sql: self.sql,
            sequence: self.sequence,
            created_at: Utc::now(),
            applied_at: None,
        }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
