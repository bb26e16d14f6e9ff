//! Migration history replay.
//!
//! Reconstructs which tables and relationships currently exist in a tenant
//! schema from the names of previously emitted migrations. The `sql` payload
//! is never inspected.

use crate::identifier::{SchemaName, TableName};
use crate::migration_name::{split_pair, MigrationName, NameKind};
use crate::model::{Cardinality, MigrationRecord};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Identity of a relationship as the log records it: cardinality plus the
/// rendered `<from>_<to>` subject.
///
/// Two directed pairs can render the same subject (`order` + `line_item` and
/// `order_line` + `item`), so the subject is compared as a whole and never
/// split to decide whether a relationship exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipKey {
    pub cardinality: Cardinality,
    pub subject: String,
}

impl RelationshipKey {
    pub fn new(cardinality: Cardinality, subject: impl Into<String>) -> Self {
        Self {
            cardinality,
            subject: subject.into(),
        }
    }

    /// Key of the relationship `from -> to`.
    pub fn between(cardinality: Cardinality, from: &TableName, to: &TableName) -> Self {
        Self::new(cardinality, format!("{}_{}", from, to))
    }
}

/// Creation and drop counts for one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub created: u32,
    pub dropped: u32,
}

impl Lifecycle {
    /// Created more often than dropped.
    pub fn is_active(&self) -> bool {
        self.created > self.dropped
    }

    /// Generation number for the next creation record.
    pub fn next_create(&self) -> u32 {
        self.created + 1
    }

    /// Generation number for the next drop record.
    pub fn next_drop(&self) -> u32 {
        self.dropped + 1
    }
}

/// State of one tenant schema as implied by its migration log.
#[derive(Debug, Clone)]
pub struct HistoryView {
    schema: SchemaName,
    schema_created: bool,
    tables: BTreeMap<TableName, Lifecycle>,
    relationships: BTreeMap<RelationshipKey, Lifecycle>,
    names: HashSet<String>,
    known: BTreeSet<TableName>,
    max_sequence: i64,
}

impl HistoryView {
    /// Replay `records` for `schema`.
    ///
    /// `extra_known` lists tables that may appear in relationship names without
    /// a creation record of their own (typically the desired tables). They are
    /// only consulted by [`HistoryView::endpoints`].
    pub fn from_records<'a>(
        records: &[MigrationRecord],
        schema: &SchemaName,
        extra_known: impl IntoIterator<Item = &'a TableName>,
    ) -> Self {
        let mut view = Self {
            schema: schema.clone(),
            schema_created: false,
            tables: BTreeMap::new(),
            relationships: BTreeMap::new(),
            names: HashSet::with_capacity(records.len()),
            known: BTreeSet::new(),
            max_sequence: 0,
        };

        let parsed: Vec<Option<MigrationName>> = records
            .iter()
            .map(|r| MigrationName::parse(&r.name, schema))
            .collect();

        for (record, name) in records.iter().zip(&parsed) {
            view.max_sequence = view.max_sequence.max(record.sequence);
            match name {
                Some(name) => {
                    view.names.insert(name.to_string());
                }
                None => {
                    log::debug!("Ignoring migration name outside grammar: {}", record.name);
                    view.names.insert(record.name.clone());
                }
            }
        }

        for name in parsed.iter().flatten() {
            match name.kind {
                NameKind::CreateSchema => view.schema_created = true,
                NameKind::CreateTable | NameKind::DropTable => {
                    let Some(table) = name.table_name() else {
                        log::warn!("Migration names an invalid table: {}", name);
                        continue;
                    };
                    let entry = view.tables.entry(table).or_default();
                    if name.kind == NameKind::CreateTable {
                        entry.created += 1;
                    } else {
                        entry.dropped += 1;
                    }
                }
                _ => {}
            }
        }

        view.known = view.tables.keys().cloned().collect();
        view.known.extend(extra_known.into_iter().cloned());

        for name in parsed.iter().flatten() {
            let (cardinality, created) = match name.kind {
                NameKind::CreateRelationship(c) => (c, true),
                NameKind::DropRelationship(c) => (c, false),
                _ => continue,
            };
            let entry = view
                .relationships
                .entry(RelationshipKey::new(cardinality, name.subject.clone()))
                .or_default();
            if created {
                entry.created += 1;
            } else {
                entry.dropped += 1;
            }
        }

        view
    }

    pub fn schema(&self) -> &SchemaName {
        &self.schema
    }

    /// Whether a schema-creation record exists.
    pub fn schema_created(&self) -> bool {
        self.schema_created
    }

    /// Every table that has at least one creation record.
    pub fn created_tables(&self) -> BTreeSet<TableName> {
        self.tables
            .iter()
            .filter(|(_, l)| l.created > 0)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Every table that has at least one drop record.
    pub fn dropped_tables(&self) -> BTreeSet<TableName> {
        self.tables
            .iter()
            .filter(|(_, l)| l.dropped > 0)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Tables that currently exist: created more often than dropped.
    pub fn active_tables(&self) -> BTreeSet<TableName> {
        self.tables
            .iter()
            .filter(|(_, l)| l.is_active())
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn table_lifecycle(&self, table: &TableName) -> Lifecycle {
        self.tables.get(table).copied().unwrap_or_default()
    }

    pub fn created_relationships(&self) -> BTreeSet<RelationshipKey> {
        self.relationships
            .iter()
            .filter(|(_, l)| l.created > 0)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn dropped_relationships(&self) -> BTreeSet<RelationshipKey> {
        self.relationships
            .iter()
            .filter(|(_, l)| l.dropped > 0)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn active_relationships(&self) -> BTreeSet<RelationshipKey> {
        self.relationships
            .iter()
            .filter(|(_, l)| l.is_active())
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn relationship_lifecycle(&self, key: &RelationshipKey) -> Lifecycle {
        self.relationships.get(key).copied().unwrap_or_default()
    }

    /// Best-effort `(from, to)` tables of a recorded relationship.
    ///
    /// Tables with a record in this log are tried before the extra known
    /// tables, so a pair recorded before a look-alike table was desired still
    /// resolves to the tables it was created between.
    pub fn endpoints(&self, key: &RelationshipKey) -> Option<(TableName, TableName)> {
        let recorded: BTreeSet<TableName> = self.tables.keys().cloned().collect();
        split_pair(&key.subject, &recorded).or_else(|| split_pair(&key.subject, &self.known))
    }

    /// Names already in the log, canonicalized where they parse.
    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    /// Sequence number for the next record.
    pub fn next_sequence(&self) -> i64 {
        self.max_sequence + 1
    }
}

/// Tables with a creation record in `history` for `schema`.
pub fn created_tables(history: &[MigrationRecord], schema: &SchemaName) -> BTreeSet<TableName> {
    HistoryView::from_records(history, schema, std::iter::empty()).created_tables()
}

/// Tables with a drop record in `history` for `schema`.
pub fn dropped_tables(history: &[MigrationRecord], schema: &SchemaName) -> BTreeSet<TableName> {
    HistoryView::from_records(history, schema, std::iter::empty()).dropped_tables()
}

/// Tables that currently exist according to `history`.
pub fn active_tables(history: &[MigrationRecord], schema: &SchemaName) -> BTreeSet<TableName> {
    HistoryView::from_records(history, schema, std::iter::empty()).active_tables()
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
