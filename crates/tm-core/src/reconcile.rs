//! Reconciliation of a desired model against migration history.
//!
//! Given the classifications and relationships a tenant should have and the
//! migrations already recorded for it, compute the next batch of migrations.
//! The batch is ordered: schema, table drops, table creations, relationship
//! drops, relationship creations. Sequences continue from the history.

use crate::config::NamingConfig;
use crate::constraint::ConstraintNamer;
use crate::ddl::{Ddl, Ident, QualifiedName};
use crate::error::{CoreError, CoreResult};
use crate::history::{HistoryView, RelationshipKey};
use crate::identifier::{SchemaName, TableName};
use crate::migration_name::MigrationName;
use crate::model::{Cardinality, Classification, MigrationRecord, NewMigration, Relationship};
use crate::naming::IdentifierNormalizer;
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// Computes migration batches under one set of naming rules.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    normalizer: IdentifierNormalizer,
}

impl Reconciler {
    pub fn new(config: NamingConfig) -> Self {
        Self {
            normalizer: IdentifierNormalizer::new(config),
        }
    }

    pub fn normalizer(&self) -> &IdentifierNormalizer {
        &self.normalizer
    }

    /// Compute the migrations that bring the tenant from `history` to the
    /// desired `classifications` and `relationships`.
    ///
    /// Returns an empty batch when everything is already in place. Fails only
    /// on tenant integrity problems and constraint-name exhaustion.
    pub fn reconcile(
        &self,
        classifications: &[Classification],
        relationships: &[Relationship],
        history: &[MigrationRecord],
    ) -> CoreResult<Vec<NewMigration>> {
        let Some(tenant_id) = resolve_tenant(classifications, relationships, history)? else {
            return Ok(Vec::new());
        };
        let schema = self.normalizer.schema_name(tenant_id);

        // Desired tables in first-seen order.
        let mut table_by_class: HashMap<Uuid, TableName> = HashMap::new();
        let mut desired_tables: Vec<TableName> = Vec::new();
        let mut desired_set: BTreeSet<TableName> = BTreeSet::new();
        for class in classifications {
            let table = self.normalizer.table_for(class);
            if !desired_set.insert(table.clone()) {
                log::debug!(
                    "Classification '{}' normalizes to existing table {}; keeping the first",
                    class.name,
                    table
                );
            } else {
                desired_tables.push(table.clone());
            }
            table_by_class.insert(class.id, table);
        }

        // Desired relationships keyed the way the log records them. Pairs
        // that render the same name, and foreign keys that would share a
        // column, are the same physical object; the first one wins.
        let mut desired_rels: Vec<DesiredRelationship> = Vec::new();
        let mut desired_by_key: HashMap<RelationshipKey, usize> = HashMap::new();
        let mut fk_pairs: HashMap<(TableName, TableName), Cardinality> = HashMap::new();
        for rel in relationships {
            let (Some(from), Some(to)) = (
                table_by_class.get(&rel.from_classification),
                table_by_class.get(&rel.to_classification),
            ) else {
                log::debug!(
                    "Skipping relationship {}: endpoint is not a desired classification",
                    rel.id
                );
                continue;
            };
            let desired = DesiredRelationship {
                key: RelationshipKey::between(rel.cardinality, from, to),
                from: from.clone(),
                to: to.clone(),
            };

            if let Some(&index) = desired_by_key.get(&desired.key) {
                let first = &desired_rels[index];
                if (&first.from, &first.to) != (from, to) {
                    log::warn!(
                        "Relationship {} -> {} has the same name as {} -> {}; keeping the first",
                        from,
                        to,
                        first.from,
                        first.to
                    );
                }
                continue;
            }
            if rel.cardinality.is_foreign_key() {
                let pair = (from.clone(), to.clone());
                if let Some(existing) = fk_pairs.get(&pair) {
                    log::warn!(
                        "Relationship {} -> {} ({}) would share column {} with the {} one; keeping the first",
                        from,
                        to,
                        rel.cardinality,
                        self.normalizer.fk_column(from),
                        existing
                    );
                    continue;
                }
                fk_pairs.insert(pair, rel.cardinality);
            }
            desired_by_key.insert(desired.key.clone(), desired_rels.len());
            desired_rels.push(desired);
        }

        let view = HistoryView::from_records(history, &schema, &desired_set);
        let mut batch = Batch::new(tenant_id, &view);
        let mut namer = ConstraintNamer::from_config(self.normalizer.config());

        if !view.schema_created() {
            batch.push(
                MigrationName::create_schema(&schema),
                Ddl::CreateSchema {
                    schema: schema.clone(),
                },
            );
        }

        let active_tables = view.active_tables();
        for table in active_tables.difference(&desired_set) {
            let generation = view.table_lifecycle(table).next_drop();
            batch.push(
                MigrationName::drop_table(&schema, table, generation),
                Ddl::DropTable {
                    table: QualifiedName::new(&schema, table),
                },
            );
        }

        let mut created_tables: HashSet<TableName> = HashSet::new();
        for table in &desired_tables {
            if active_tables.contains(table) {
                continue;
            }
            let generation = view.table_lifecycle(table).next_create();
            batch.push(
                MigrationName::create_table(&schema, table, generation),
                Ddl::CreateTable {
                    table: QualifiedName::new(&schema, table),
                },
            );
            created_tables.insert(table.clone());
        }

        // A recorded relationship survives only if its name is still desired
        // and both of its tables existed before this batch.
        let mut live_rels: HashSet<RelationshipKey> = HashSet::new();
        for key in view.active_relationships() {
            let (from, to) = match desired_by_key.get(&key) {
                Some(&index) => {
                    let desired = &desired_rels[index];
                    let intact = !created_tables.contains(&desired.from)
                        && !created_tables.contains(&desired.to);
                    if intact {
                        live_rels.insert(key);
                        continue;
                    }
                    (desired.from.clone(), desired.to.clone())
                }
                None => match view.endpoints(&key) {
                    Some(endpoints) => endpoints,
                    None => {
                        log::warn!(
                            "Cannot resolve the tables of relationship {} {}; leaving it in place",
                            key.cardinality,
                            key.subject
                        );
                        continue;
                    }
                },
            };
            let generation = view.relationship_lifecycle(&key).next_drop();
            batch.push(
                MigrationName::drop_relationship(key.cardinality, &schema, &from, &to, generation),
                self.drop_relationship_ddl(&schema, key.cardinality, &from, &to),
            );
        }

        for desired in &desired_rels {
            if live_rels.contains(&desired.key) {
                continue;
            }
            let generation = view.relationship_lifecycle(&desired.key).next_create();
            let ddl = self.create_relationship_ddl(&schema, desired, &mut namer)?;
            batch.push(
                MigrationName::create_relationship(
                    desired.key.cardinality,
                    &schema,
                    &desired.from,
                    &desired.to,
                    generation,
                ),
                ddl,
            );
        }

        let migrations = batch.finish();
        log::debug!(
            "Reconciled {}: {} new migration(s)",
            schema,
            migrations.len()
        );
        Ok(migrations)
    }

    fn create_relationship_ddl(
        &self,
        schema: &SchemaName,
        rel: &DesiredRelationship,
        namer: &mut ConstraintNamer,
    ) -> CoreResult<Ddl> {
        let n = &self.normalizer;
        let (from, to) = (&rel.from, &rel.to);
        match rel.key.cardinality {
            Cardinality::OneToMany | Cardinality::OneToOne => {
                let column = n.fk_column(from);
                let constraint = namer.unique_name(&format!("fk_{}_{}", to, column))?;
                let unique = if rel.key.cardinality == Cardinality::OneToOne {
                    Some(Ident::new(
                        namer.unique_name(&format!("uq_{}_{}", to, column))?,
                    ))
                } else {
                    None
                };
                Ok(Ddl::AddForeignKey {
                    table: QualifiedName::new(schema, to),
                    column: Ident::new(column),
                    references: QualifiedName::new(schema, from),
                    constraint: Ident::new(constraint),
                    unique,
                })
            }
            Cardinality::ManyToMany => {
                let join = n.join_table(from, to);
                let (left_column, right_column) = n.join_columns(from, to);
                let primary_key = namer.unique_name(&format!("pk_{}", join))?;
                let left_fk = namer.unique_name(&format!("fk_{}_{}", join, left_column))?;
                let right_fk = namer.unique_name(&format!("fk_{}_{}", join, right_column))?;
                Ok(Ddl::CreateJoinTable {
                    table: QualifiedName::new(schema, &join),
                    left_column: Ident::new(left_column),
                    left: QualifiedName::new(schema, from),
                    right_column: Ident::new(right_column),
                    right: QualifiedName::new(schema, to),
                    primary_key: Ident::new(primary_key),
                    left_fk: Ident::new(left_fk),
                    right_fk: Ident::new(right_fk),
                })
            }
        }
    }

    fn drop_relationship_ddl(
        &self,
        schema: &SchemaName,
        cardinality: Cardinality,
        from: &TableName,
        to: &TableName,
    ) -> Ddl {
        let n = &self.normalizer;
        if cardinality.is_foreign_key() {
            Ddl::DropColumn {
                table: QualifiedName::new(schema, to),
                column: Ident::new(n.fk_column(from)),
            }
        } else {
            Ddl::DropTable {
                table: QualifiedName::new(schema, &n.join_table(from, to)),
            }
        }
    }
}

/// A desired relationship resolved to its tables.
struct DesiredRelationship {
    key: RelationshipKey,
    from: TableName,
    to: TableName,
}

/// Reconcile with the default naming rules.
pub fn reconcile(
    classifications: &[Classification],
    relationships: &[Relationship],
    history: &[MigrationRecord],
) -> CoreResult<Vec<NewMigration>> {
    Reconciler::default().reconcile(classifications, relationships, history)
}

/// Pick the tenant the inputs belong to and check they all agree.
fn resolve_tenant(
    classifications: &[Classification],
    relationships: &[Relationship],
    history: &[MigrationRecord],
) -> CoreResult<Option<Uuid>> {
    let Some(tenant_id) = classifications
        .first()
        .map(|c| c.tenant_id)
        .or_else(|| relationships.first().map(|r| r.tenant_id))
        .or_else(|| history.first().map(|m| m.tenant_id))
    else {
        return Ok(None);
    };

    if !classifications.is_empty() && tenant_id.is_nil() {
        return Err(CoreError::MissingTenant {
            count: classifications.len(),
        });
    }

    let mismatch = |input: String, found: Uuid| CoreError::TenantMismatch {
        input,
        expected: tenant_id.to_string(),
        found: found.to_string(),
    };
    if let Some(c) = classifications.iter().find(|c| c.tenant_id != tenant_id) {
        return Err(mismatch(format!("classification '{}'", c.name), c.tenant_id));
    }
    if let Some(r) = relationships.iter().find(|r| r.tenant_id != tenant_id) {
        return Err(mismatch(format!("relationship {}", r.id), r.tenant_id));
    }
    if let Some(m) = history.iter().find(|m| m.tenant_id != tenant_id) {
        return Err(mismatch(format!("migration '{}'", m.name), m.tenant_id));
    }

    Ok(Some(tenant_id))
}

/// Accumulates one batch, keeping names unique and sequences consecutive.
struct Batch {
    tenant_id: Uuid,
    names: HashSet<String>,
    next_sequence: i64,
    migrations: Vec<NewMigration>,
}

impl Batch {
    fn new(tenant_id: Uuid, view: &HistoryView) -> Self {
        Self {
            tenant_id,
            names: view.names().clone(),
            next_sequence: view.next_sequence(),
            migrations: Vec::new(),
        }
    }

    fn push(&mut self, mut name: MigrationName, ddl: Ddl) {
        let mut rendered = name.to_string();
        // A log with gaps in its generations can already hold the next one.
        while self.names.contains(&rendered) {
            name.generation += 1;
            rendered = name.to_string();
        }
        log::debug!("{:>4}  {}", self.next_sequence, rendered);
        self.names.insert(rendered.clone());
        self.migrations.push(NewMigration {
            tenant_id: self.tenant_id,
            name: rendered,
            sql: ddl.render(),
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    fn finish(self) -> Vec<NewMigration> {
        self.migrations
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
