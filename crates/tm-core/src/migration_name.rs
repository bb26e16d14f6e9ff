//! Migration-name grammar.
//!
//! Names are the only thing the history reader looks at, so this grammar is a
//! storage format:
//!
//! ```text
//! create schema <schema>
//! create table <schema>_<table>
//! drop table <schema>_<table>
//! rel <cardinality> <schema>_<from_table>_<to_table>
//! drop rel <cardinality> <schema>_<from_table>_<to_table>
//! ```
//!
//! An object created or dropped for the n-th time (n >= 2) carries a ` #n`
//! suffix so that no name is ever emitted twice for a tenant.
//!
//! Logs written before this grammar used underscore-joined names
//! (`create_table_<schema>_<table>`, `rel_<cardinality>_<schema>_<pair>`, ...).
//! [`MigrationName::parse`] accepts those and canonicalizes them.

use crate::identifier::{SchemaName, TableName};
use crate::model::Cardinality;
use std::collections::BTreeSet;
use std::fmt;

/// What a migration does to which object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    CreateSchema,
    CreateTable,
    DropTable,
    CreateRelationship(Cardinality),
    DropRelationship(Cardinality),
}

/// A parsed migration name, scoped to one tenant schema.
///
/// `subject` is empty for schema creation, the table name for table
/// migrations, and the unsplit `<from>_<to>` pair for relationships.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationName {
    pub kind: NameKind,
    pub schema: SchemaName,
    pub subject: String,
    pub generation: u32,
}

impl MigrationName {
    pub fn create_schema(schema: &SchemaName) -> Self {
        Self {
            kind: NameKind::CreateSchema,
            schema: schema.clone(),
            subject: String::new(),
            generation: 1,
        }
    }

    pub fn create_table(schema: &SchemaName, table: &TableName, generation: u32) -> Self {
        Self::table(NameKind::CreateTable, schema, table, generation)
    }

    pub fn drop_table(schema: &SchemaName, table: &TableName, generation: u32) -> Self {
        Self::table(NameKind::DropTable, schema, table, generation)
    }

    pub fn create_relationship(
        cardinality: Cardinality,
        schema: &SchemaName,
        from: &TableName,
        to: &TableName,
        generation: u32,
    ) -> Self {
        Self::relationship(
            NameKind::CreateRelationship(cardinality),
            schema,
            from,
            to,
            generation,
        )
    }

    pub fn drop_relationship(
        cardinality: Cardinality,
        schema: &SchemaName,
        from: &TableName,
        to: &TableName,
        generation: u32,
    ) -> Self {
        Self::relationship(
            NameKind::DropRelationship(cardinality),
            schema,
            from,
            to,
            generation,
        )
    }

    fn table(kind: NameKind, schema: &SchemaName, table: &TableName, generation: u32) -> Self {
        Self {
            kind,
            schema: schema.clone(),
            subject: table.to_string(),
            generation: generation.max(1),
        }
    }

    fn relationship(
        kind: NameKind,
        schema: &SchemaName,
        from: &TableName,
        to: &TableName,
        generation: u32,
    ) -> Self {
        Self {
            kind,
            schema: schema.clone(),
            subject: format!("{}_{}", from, to),
            generation: generation.max(1),
        }
    }

    /// Parse a stored name belonging to `schema`.
    ///
    /// Returns `None` for names of other schemas and for strings outside both
    /// the current and the legacy grammar.
    pub fn parse(raw: &str, schema: &SchemaName) -> Option<Self> {
        Self::parse_current(raw, schema).or_else(|| Self::parse_legacy(raw, schema))
    }

    fn parse_current(raw: &str, schema: &SchemaName) -> Option<Self> {
        let (body, generation) = split_generation(raw)?;

        if let Some(rest) = body.strip_prefix("create schema ") {
            return (rest == schema.as_str() && generation == 1)
                .then(|| Self::create_schema(schema));
        }

        let (kind, scoped) = if let Some(rest) = body.strip_prefix("create table ") {
            (NameKind::CreateTable, rest)
        } else if let Some(rest) = body.strip_prefix("drop table ") {
            (NameKind::DropTable, rest)
        } else if let Some(rest) = body.strip_prefix("drop rel ") {
            let (token, scoped) = rest.split_once(' ')?;
            (NameKind::DropRelationship(Cardinality::from_token(token)?), scoped)
        } else if let Some(rest) = body.strip_prefix("rel ") {
            let (token, scoped) = rest.split_once(' ')?;
            (NameKind::CreateRelationship(Cardinality::from_token(token)?), scoped)
        } else {
            return None;
        };

        let subject = strip_schema(scoped, schema)?;
        Some(Self {
            kind,
            schema: schema.clone(),
            subject: subject.to_string(),
            generation,
        })
    }

    fn parse_legacy(raw: &str, schema: &SchemaName) -> Option<Self> {
        if raw.strip_prefix("create_schema_") == Some(schema.as_str()) {
            return Some(Self::create_schema(schema));
        }

        let (kind, scoped) = if let Some(rest) = raw.strip_prefix("create_table_") {
            (NameKind::CreateTable, rest)
        } else if let Some(rest) = raw.strip_prefix("drop_table_") {
            (NameKind::DropTable, rest)
        } else if let Some(rest) = raw.strip_prefix("rel_") {
            let (cardinality, scoped) = Cardinality::ALL.into_iter().find_map(|c| {
                rest.strip_prefix(c.token())
                    .and_then(|r| r.strip_prefix('_'))
                    .map(|r| (c, r))
            })?;
            (NameKind::CreateRelationship(cardinality), scoped)
        } else {
            return None;
        };

        let subject = strip_schema(scoped, schema)?;
        Some(Self {
            kind,
            schema: schema.clone(),
            subject: subject.to_string(),
            generation: 1,
        })
    }

    /// Canonicalize `raw` if it belongs to `schema`, otherwise return it as is.
    pub fn canonicalize(raw: &str, schema: &SchemaName) -> String {
        match Self::parse(raw, schema) {
            Some(name) => name.to_string(),
            None => raw.to_string(),
        }
    }

    /// Table named by a table migration.
    pub fn table_name(&self) -> Option<TableName> {
        match self.kind {
            NameKind::CreateTable | NameKind::DropTable => TableName::try_new(self.subject.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NameKind::CreateSchema => write!(f, "create schema {}", self.schema)?,
            NameKind::CreateTable => write!(f, "create table {}_{}", self.schema, self.subject)?,
            NameKind::DropTable => write!(f, "drop table {}_{}", self.schema, self.subject)?,
            NameKind::CreateRelationship(c) => {
                write!(f, "rel {} {}_{}", c, self.schema, self.subject)?
            }
            NameKind::DropRelationship(c) => {
                write!(f, "drop rel {} {}_{}", c, self.schema, self.subject)?
            }
        }
        if self.generation > 1 {
            write!(f, " #{}", self.generation)?;
        }
        Ok(())
    }
}

/// Split a trailing ` #n` generation marker. Bare names are generation 1.
fn split_generation(raw: &str) -> Option<(&str, u32)> {
    match raw.rsplit_once(" #") {
        Some((body, digits)) => {
            let generation: u32 = digits.parse().ok()?;
            (generation >= 2).then_some((body, generation))
        }
        None => Some((raw, 1)),
    }
}

fn strip_schema<'a>(scoped: &'a str, schema: &SchemaName) -> Option<&'a str> {
    scoped
        .strip_prefix(schema.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|rest| !rest.is_empty())
}

/// Split a relationship pair `<from>_<to>` using the set of known tables.
///
/// Table names may themselves contain underscores, so the split point is the
/// one where both halves are known tables. When several split points qualify
/// the leftmost wins.
pub fn split_pair(pair: &str, known: &BTreeSet<TableName>) -> Option<(TableName, TableName)> {
    let mut candidates = pair
        .match_indices('_')
        .map(|(i, _)| (&pair[..i], &pair[i + 1..]))
        .filter(|(from, to)| known.contains(*from) && known.contains(*to));

    let (from, to) = candidates.next()?;
    if candidates.next().is_some() {
        log::debug!(
            "Relationship pair '{}' splits more than one way; using {} -> {}",
            pair,
            from,
            to
        );
    }
    Some((TableName::try_new(from)?, TableName::try_new(to)?))
}

#[cfg(test)]
#[path = "migration_name_test.rs"]
mod tests;
