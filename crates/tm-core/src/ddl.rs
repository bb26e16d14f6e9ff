//! Typed DDL builder.
//!
//! One variant per statement shape the reconciler emits. Identifiers only
//! ever reach the output through [`quote_ident`], and every statement is safe
//! to run twice: creates use `IF NOT EXISTS`, drops use `IF EXISTS`, and
//! constraints are added inside a `DO` block that checks `pg_constraint`
//! first.

use crate::identifier::{SchemaName, TableName};
use crate::sql_utils::{quote_ident, quote_literal};
use std::fmt;

/// A column or constraint identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form.
    pub fn render(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A schema-qualified table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: SchemaName,
    pub table: TableName,
}

impl QualifiedName {
    pub fn new(schema: &SchemaName, table: &TableName) -> Self {
        Self {
            schema: schema.clone(),
            table: table.clone(),
        }
    }

    /// `"schema"."table"`
    pub fn render(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One schema-altering statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ddl {
    CreateSchema {
        schema: SchemaName,
    },

    /// Classification table with the fixed column layout.
    CreateTable {
        table: QualifiedName,
    },

    DropTable {
        table: QualifiedName,
    },

    /// Nullable foreign-key column on `table` pointing at `references(id)`,
    /// optionally made unique for one-to-one relationships.
    AddForeignKey {
        table: QualifiedName,
        column: Ident,
        references: QualifiedName,
        constraint: Ident,
        unique: Option<Ident>,
    },

    /// Join table for a many-to-many relationship.
    CreateJoinTable {
        table: QualifiedName,
        left_column: Ident,
        left: QualifiedName,
        right_column: Ident,
        right: QualifiedName,
        primary_key: Ident,
        left_fk: Ident,
        right_fk: Ident,
    },

    DropColumn {
        table: QualifiedName,
        column: Ident,
    },
}

impl Ddl {
    /// Render as executable Postgres SQL.
    pub fn render(&self) -> String {
        match self {
            Ddl::CreateSchema { schema } => {
                format!("CREATE SCHEMA IF NOT EXISTS {};", quote_ident(schema))
            }
            Ddl::CreateTable { table } => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                 id UUID PRIMARY KEY DEFAULT gen_random_uuid(),\n    \
                 tenant_id UUID NOT NULL,\n    \
                 data JSONB NOT NULL,\n    \
                 created_at TIMESTAMPTZ DEFAULT now()\n);",
                table.render()
            ),
            Ddl::DropTable { table } => {
                format!("DROP TABLE IF EXISTS {} CASCADE;", table.render())
            }
            Ddl::AddForeignKey {
                table,
                column,
                references,
                constraint,
                unique,
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} UUID;\n",
                    table.render(),
                    column.render()
                );
                sql.push_str(&guarded_constraint(
                    table,
                    constraint,
                    &format!(
                        "FOREIGN KEY ({}) REFERENCES {} (id)",
                        column.render(),
                        references.render()
                    ),
                ));
                if let Some(unique) = unique {
                    sql.push('\n');
                    sql.push_str(&guarded_constraint(
                        table,
                        unique,
                        &format!("UNIQUE ({})", column.render()),
                    ));
                }
                sql
            }
            Ddl::CreateJoinTable {
                table,
                left_column,
                left,
                right_column,
                right,
                primary_key,
                left_fk,
                right_fk,
            } => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 {lc} UUID NOT NULL,\n    \
                 {rc} UUID NOT NULL,\n    \
                 CONSTRAINT {pk} PRIMARY KEY ({lc}, {rc}),\n    \
                 CONSTRAINT {lfk} FOREIGN KEY ({lc}) REFERENCES {left} (id) ON DELETE CASCADE,\n    \
                 CONSTRAINT {rfk} FOREIGN KEY ({rc}) REFERENCES {right} (id) ON DELETE CASCADE\n);",
                table = table.render(),
                lc = left_column.render(),
                rc = right_column.render(),
                pk = primary_key.render(),
                lfk = left_fk.render(),
                rfk = right_fk.render(),
                left = left.render(),
                right = right.render(),
            ),
            Ddl::DropColumn { table, column } => format!(
                "ALTER TABLE IF EXISTS {} DROP COLUMN IF EXISTS {} CASCADE;",
                table.render(),
                column.render()
            ),
        }
    }
}

impl fmt::Display for Ddl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// `ALTER TABLE ... ADD CONSTRAINT` that is skipped when the constraint exists.
fn guarded_constraint(table: &QualifiedName, name: &Ident, definition: &str) -> String {
    format!(
        "DO $$\nBEGIN\n    \
         IF NOT EXISTS (\n        \
         SELECT 1 FROM pg_constraint\n        \
         WHERE conname = {} AND conrelid = {}::regclass\n    \
         ) THEN\n        \
         ALTER TABLE {} ADD CONSTRAINT {} {};\n    \
         END IF;\nEND $$;",
        quote_literal(name.as_str()),
        quote_literal(&table.render()),
        table.render(),
        name.render(),
        definition
    )
}

#[cfg(test)]
#[path = "ddl_test.rs"]
mod tests;
