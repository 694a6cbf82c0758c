// ABOUTME: Column descriptors and idempotent table creation/removal
// ABOUTME: Renders CREATE TABLE IF NOT EXISTS with one definition clause per column, in declared order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::dialect::Dialect;
use super::errors::{DatabaseError, DatabaseResult, Operation};
use super::identifier::{validate_fragment, validate_identifier};
use super::value::SqlValue;
use super::ConnectionHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Declarative description of one table column
///
/// `sql_type` and `default` are copied into the DDL verbatim in the store's
/// own syntax; no translation between dialects happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, unique within the table
    pub name: String,
    /// Declared type, e.g. `VARCHAR(255)` or `JSON`
    pub sql_type: String,
    /// Allow NULL; columns are NOT NULL unless set
    #[serde(default)]
    pub nullable: bool,
    /// Auto-increment primary key
    #[serde(default)]
    pub primary_key: bool,
    /// UNIQUE constraint
    #[serde(default)]
    pub unique: bool,
    /// DEFAULT expression
    #[serde(default)]
    pub default: Option<String>,
}

impl ColumnSpec {
    /// NOT NULL column without constraints
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    /// Mark the column nullable
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the column unique
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the column as the auto-increment primary key
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the DEFAULT expression
    #[must_use]
    pub fn default_value(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    /// Definition clause for this column
    ///
    /// Primary keys get the dialect's auto-increment key suffix and nothing
    /// else. Other columns get NOT NULL (unless nullable), UNIQUE, then
    /// DEFAULT, in that order.
    #[must_use]
    pub fn definition(&self, dialect: Dialect) -> String {
        if self.primary_key {
            return dialect.primary_key_definition(&self.name, &self.sql_type);
        }
        let mut clause = format!("{} {}", self.name, self.sql_type);
        if !self.nullable {
            clause.push_str(" NOT NULL");
        }
        if self.unique {
            clause.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            clause.push_str(" DEFAULT ");
            clause.push_str(default);
        }
        clause
    }

    fn validate(&self) -> DatabaseResult<()> {
        validate_identifier(&self.name)?;
        validate_fragment(&self.sql_type)?;
        if let Some(default) = &self.default {
            validate_fragment(default)?;
        }
        Ok(())
    }
}

/// Render `CREATE TABLE IF NOT EXISTS` for a schema
///
/// # Errors
///
/// Returns a usage error if `columns` is empty, a name or fragment is
/// rejected, or a column name repeats
pub fn render_create_table(
    dialect: Dialect,
    table: &str,
    columns: &[ColumnSpec],
) -> DatabaseResult<String> {
    validate_identifier(table)?;
    if columns.is_empty() {
        return Err(DatabaseError::EmptyColumns {
            table: table.to_owned(),
        });
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        column.validate()?;
        if !seen.insert(column.name.as_str()) {
            return Err(DatabaseError::DuplicateColumn {
                table: table.to_owned(),
                column: column.name.clone(),
            });
        }
    }

    let definitions: Vec<String> = columns
        .iter()
        .map(|column| column.definition(dialect))
        .collect();
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n  {}\n)",
        definitions.join(",\n  ")
    ))
}

impl ConnectionHandle {
    /// Create the table if it does not exist yet
    ///
    /// Safe to call repeatedly with the same schema. An existing table is
    /// left untouched even if its columns differ.
    ///
    /// # Errors
    ///
    /// Returns a usage error before contacting the store (see
    /// [`render_create_table`]) or a store error tagged `CreateTable`
    pub async fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> DatabaseResult<()> {
        let sql = render_create_table(self.dialect(), table, columns)?;
        self.execute(Operation::CreateTable, &sql, &[]).await?;
        info!(table, columns = columns.len(), "Table ensured");
        Ok(())
    }

    /// Drop the table if it exists
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidIdentifier`] or a store error tagged `DropTable`
    pub async fn drop_table(&self, table: &str) -> DatabaseResult<()> {
        validate_identifier(table)?;
        self.execute(
            Operation::DropTable,
            &format!("DROP TABLE IF EXISTS {table}"),
            &[],
        )
        .await?;
        info!(table, "Table dropped");
        Ok(())
    }

    /// Whether a table with this name exists in the current schema
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidIdentifier`] or a store error tagged `TableLookup`
    pub async fn table_exists(&self, table: &str) -> DatabaseResult<bool> {
        validate_identifier(table)?;
        let row = self
            .fetch_optional(
                Operation::TableLookup,
                self.dialect().table_exists_sql(),
                &[SqlValue::from(table)],
            )
            .await?;
        match row {
            Some(row) => Ok(row.get_at::<i64>(0)? > 0),
            None => Ok(false),
        }
    }
}
