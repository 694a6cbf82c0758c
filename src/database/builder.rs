// ABOUTME: Deterministic SQL rendering for insert, update, delete, select and atomic increments
// ABOUTME: Field maps are emitted in sorted key order so SQL text and parameter order never vary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Query Builder
//!
//! Every statement is rendered into a [`Statement`] before anything is sent
//! to the store, so contract violations (empty payloads, missing filters,
//! bad identifiers) are reported without side effects. Predicates are
//! equality conjunctions only; ordering, limits, ranges and joins go
//! through the raw passthrough on [`ConnectionHandle`].

use super::errors::{DatabaseError, DatabaseResult, Operation};
use super::identifier::{validate_identifier, validate_identifiers};
use super::row::RowCursor;
use super::value::{FieldValueMap, SqlValue};
use super::ConnectionHandle;
use tracing::debug;

/// Rendered SQL with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text using `?` placeholders
    pub sql: String,
    /// Values for the placeholders, in order
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// `INSERT INTO t (a, b) VALUES (?, ?)`
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::EmptyFields`] if `fields` is empty or
    /// [`DatabaseError::InvalidIdentifier`] for a bad table or field name
    pub fn insert(table: &str, fields: &FieldValueMap) -> DatabaseResult<Self> {
        validate_identifier(table)?;
        if fields.is_empty() {
            return Err(DatabaseError::EmptyFields {
                operation: Operation::Insert,
                table: table.to_owned(),
            });
        }
        validate_identifiers(fields.keys())?;

        let columns: Vec<&str> = fields.keys().collect();
        let placeholders = vec!["?"; columns.len()];
        Ok(Self {
            sql: format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
            params: fields.values().cloned().collect(),
        })
    }

    /// `UPDATE t SET a = ?, b = ? WHERE k = ? AND ...`
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::MissingFilter`] if `filter` is empty,
    /// [`DatabaseError::EmptyFields`] if `fields` is empty, or
    /// [`DatabaseError::InvalidIdentifier`]
    pub fn update(
        table: &str,
        fields: &FieldValueMap,
        filter: &FieldValueMap,
    ) -> DatabaseResult<Self> {
        validate_identifier(table)?;
        require_filter(Operation::Update, table, filter)?;
        if fields.is_empty() {
            return Err(DatabaseError::EmptyFields {
                operation: Operation::Update,
                table: table.to_owned(),
            });
        }
        validate_identifiers(fields.keys())?;

        let assignments: Vec<String> = fields.keys().map(|key| format!("{key} = ?")).collect();
        let (predicate, filter_params) = where_clause(filter);
        let mut params: Vec<SqlValue> = fields.values().cloned().collect();
        params.extend(filter_params);
        Ok(Self {
            sql: format!(
                "UPDATE {table} SET {} WHERE {predicate}",
                assignments.join(", ")
            ),
            params,
        })
    }

    /// `UPDATE t SET c = c + ? WHERE ...`, applied atomically by the store
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::MissingFilter`] if `filter` is empty or
    /// [`DatabaseError::InvalidIdentifier`]
    pub fn increment(
        table: &str,
        column: &str,
        delta: i64,
        filter: &FieldValueMap,
    ) -> DatabaseResult<Self> {
        validate_identifier(table)?;
        validate_identifier(column)?;
        require_filter(Operation::Increment, table, filter)?;

        let (predicate, filter_params) = where_clause(filter);
        let mut params = vec![SqlValue::Integer(delta)];
        params.extend(filter_params);
        Ok(Self {
            sql: format!("UPDATE {table} SET {column} = {column} + ? WHERE {predicate}"),
            params,
        })
    }

    /// `DELETE FROM t WHERE ...`
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::MissingFilter`] if `filter` is empty or
    /// [`DatabaseError::InvalidIdentifier`]
    pub fn delete(table: &str, filter: &FieldValueMap) -> DatabaseResult<Self> {
        validate_identifier(table)?;
        require_filter(Operation::Delete, table, filter)?;

        let (predicate, params) = where_clause(filter);
        Ok(Self {
            sql: format!("DELETE FROM {table} WHERE {predicate}"),
            params,
        })
    }

    /// `SELECT cols FROM t [WHERE ...]`; no columns selects `*`
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidIdentifier`]
    pub fn select(table: &str, columns: &[&str], filter: &FieldValueMap) -> DatabaseResult<Self> {
        validate_identifier(table)?;
        validate_identifiers(columns.iter().copied())?;

        let projection = if columns.is_empty() {
            "*".to_owned()
        } else {
            columns.join(", ")
        };
        let mut sql = format!("SELECT {projection} FROM {table}");
        if filter.is_empty() {
            return Ok(Self {
                sql,
                params: Vec::new(),
            });
        }
        validate_identifiers(filter.keys())?;
        let (predicate, params) = where_clause(filter);
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);
        Ok(Self { sql, params })
    }
}

fn require_filter(operation: Operation, table: &str, filter: &FieldValueMap) -> DatabaseResult<()> {
    if filter.is_empty() {
        return Err(DatabaseError::MissingFilter {
            operation,
            table: table.to_owned(),
        });
    }
    validate_identifiers(filter.keys())
}

/// Equality conjunction over the filter in key order
fn where_clause(filter: &FieldValueMap) -> (String, Vec<SqlValue>) {
    let predicate = filter
        .keys()
        .map(|key| format!("{key} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");
    (predicate, filter.values().cloned().collect())
}

impl ConnectionHandle {
    /// Insert one row and return the store-generated identifier
    ///
    /// Tables without an auto-increment key report `0`.
    ///
    /// # Errors
    ///
    /// Returns a usage error without contacting the store (see
    /// [`Statement::insert`]) or a store error tagged `Insert`
    pub async fn insert(&self, table: &str, fields: &FieldValueMap) -> DatabaseResult<i64> {
        let statement = Statement::insert(table, fields)?;
        debug!(table, fields = fields.len(), "Inserting row");
        let result = self
            .execute(Operation::Insert, &statement.sql, &statement.params)
            .await?;
        Ok(result.last_insert_id.unwrap_or_default())
    }

    /// Update matching rows and return how many changed
    ///
    /// # Errors
    ///
    /// Returns a usage error without contacting the store (see
    /// [`Statement::update`]) or a store error tagged `Update`
    pub async fn update(
        &self,
        table: &str,
        fields: &FieldValueMap,
        filter: &FieldValueMap,
    ) -> DatabaseResult<u64> {
        let statement = Statement::update(table, fields, filter)?;
        let result = self
            .execute(Operation::Update, &statement.sql, &statement.params)
            .await?;
        Ok(result.rows_affected)
    }

    /// Add `delta` to a numeric column of matching rows in one statement
    ///
    /// # Errors
    ///
    /// Returns a usage error without contacting the store (see
    /// [`Statement::increment`]) or a store error tagged `Increment`
    pub async fn increment(
        &self,
        table: &str,
        column: &str,
        delta: i64,
        filter: &FieldValueMap,
    ) -> DatabaseResult<u64> {
        let statement = Statement::increment(table, column, delta, filter)?;
        let result = self
            .execute(Operation::Increment, &statement.sql, &statement.params)
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete matching rows and return how many were removed
    ///
    /// # Errors
    ///
    /// Returns a usage error without contacting the store (see
    /// [`Statement::delete`]) or a store error tagged `Delete`
    pub async fn delete(&self, table: &str, filter: &FieldValueMap) -> DatabaseResult<u64> {
        let statement = Statement::delete(table, filter)?;
        let result = self
            .execute(Operation::Delete, &statement.sql, &statement.params)
            .await?;
        Ok(result.rows_affected)
    }

    /// Select rows by equality filter and stream them
    ///
    /// An empty `columns` slice selects every column; an empty filter
    /// selects every row.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidIdentifier`] or a store error tagged `Select`
    pub async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &FieldValueMap,
    ) -> DatabaseResult<RowCursor> {
        let Statement { sql, params } = Statement::select(table, columns, filter)?;
        self.open_cursor(Operation::Select, sql, params).await
    }
}
