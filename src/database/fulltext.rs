// ABOUTME: Check-then-create provisioning of n-gram full-text indexes and relevance-ranked search SQL
// ABOUTME: MySQL uses a FULLTEXT index WITH PARSER ngram; SQLite an FTS5 trigram table kept in sync by triggers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Full-Text Indexes
//!
//! Provisioning is a catalog check followed by the creating DDL, which runs
//! as one transaction. On `SQLite` the index is an FTS5 table plus three
//! sync triggers, and it only counts as present when all four exist; a
//! partial set left by an older run is dropped and rebuilt.
//!
//! The check and the create are not atomic: two processes starting together
//! can both see the index missing. The loser's "already exists" failure is
//! logged and reported as [`IndexProvisioning::CreatedConcurrently`], since
//! the index is present either way.

use super::builder::Statement;
use super::dialect::Dialect;
use super::errors::{is_duplicate_object_error, DatabaseError, DatabaseResult, Operation};
use super::identifier::{validate_identifier, validate_identifiers};
use super::row::RowCursor;
use super::value::SqlValue;
use super::ConnectionHandle;
use crate::constants::naming::{
    FULLTEXT_INDEX_PREFIX, MYSQL_NGRAM_PARSER, SQLITE_TRIGRAM_TOKENIZER,
};
use tracing::{info, warn};

/// Full-text index over text columns of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullTextIndex {
    table: String,
    key_column: String,
    columns: Vec<String>,
}

/// Outcome of [`ConnectionHandle::ensure_fulltext_index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProvisioning {
    /// This call created the index
    Created,
    /// The catalog already listed the index; nothing was issued
    AlreadyPresent,
    /// Another process created the index between our check and our create
    CreatedConcurrently,
}

impl FullTextIndex {
    /// Index over `columns` of `table`, keyed by an integer `id` column
    #[must_use]
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            key_column: "id".to_owned(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Use a different integer key column (`SQLite` content rowid)
    #[must_use]
    pub fn with_key_column(mut self, key_column: impl Into<String>) -> Self {
        self.key_column = key_column.into();
        self
    }

    /// Indexed table
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Indexed columns
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Deterministic index name scoped to the table
    #[must_use]
    pub fn index_name(&self) -> String {
        format!("{FULLTEXT_INDEX_PREFIX}{}", self.table)
    }

    fn validate(&self) -> DatabaseResult<()> {
        validate_identifier(&self.table)?;
        validate_identifier(&self.key_column)?;
        if self.columns.is_empty() {
            return Err(DatabaseError::EmptyColumns {
                table: self.table.clone(),
            });
        }
        validate_identifiers(self.columns.iter().map(String::as_str))?;
        validate_identifier(&self.index_name())
    }

    fn sqlite_triggers(&self) -> [String; 3] {
        let index = self.index_name();
        ["ai", "ad", "au"].map(|suffix| format!("{index}_{suffix}"))
    }

    /// Catalog objects making up the index
    fn catalog_objects(&self, dialect: Dialect) -> Vec<String> {
        let mut objects = vec![self.index_name()];
        if dialect == Dialect::Sqlite {
            objects.extend(self.sqlite_triggers());
        }
        objects
    }

    /// Catalog query counting how many of the index's objects exist
    fn existence_check(&self, dialect: Dialect) -> Statement {
        match dialect {
            Dialect::MySql => Statement {
                sql: "SELECT COUNT(DISTINCT index_name) FROM information_schema.statistics \
                      WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?"
                    .to_owned(),
                params: vec![
                    SqlValue::from(self.table.as_str()),
                    SqlValue::from(self.index_name()),
                ],
            },
            Dialect::Sqlite => {
                let objects = self.catalog_objects(dialect);
                let placeholders = vec!["?"; objects.len()].join(", ");
                Statement {
                    sql: format!(
                        "SELECT COUNT(*) FROM sqlite_master \
                         WHERE type IN ('table', 'trigger') AND name IN ({placeholders})"
                    ),
                    params: objects.into_iter().map(SqlValue::from).collect(),
                }
            }
        }
    }

    /// DDL removing whatever part of a `SQLite` index exists
    fn cleanup_statements(&self) -> Vec<String> {
        let mut statements: Vec<String> = self
            .sqlite_triggers()
            .iter()
            .map(|trigger| format!("DROP TRIGGER IF EXISTS {trigger}"))
            .collect();
        statements.push(format!("DROP TABLE IF EXISTS {}", self.index_name()));
        statements
    }

    /// DDL creating the index, in execution order
    ///
    /// The first statement is the one that loses a creation race.
    #[must_use]
    pub fn creation_statements(&self, dialect: Dialect) -> Vec<String> {
        let index = self.index_name();
        let table = &self.table;
        let columns = self.columns.join(", ");
        match dialect {
            Dialect::MySql => vec![format!(
                "ALTER TABLE {table} ADD FULLTEXT INDEX {index} ({columns}) \
                 WITH PARSER {MYSQL_NGRAM_PARSER}"
            )],
            Dialect::Sqlite => {
                let key = &self.key_column;
                let [after_insert, after_delete, after_update] = self.sqlite_triggers();
                let new_values = self.prefixed_columns("new");
                let old_values = self.prefixed_columns("old");
                let insert_new = format!(
                    "INSERT INTO {index}(rowid, {columns}) VALUES (new.{key}, {new_values});"
                );
                let delete_old = format!(
                    "INSERT INTO {index}({index}, rowid, {columns}) \
                     VALUES ('delete', old.{key}, {old_values});"
                );
                vec![
                    format!(
                        "CREATE VIRTUAL TABLE {index} USING fts5({columns}, \
                         content='{table}', content_rowid='{key}', \
                         tokenize='{SQLITE_TRIGRAM_TOKENIZER}')"
                    ),
                    format!(
                        "CREATE TRIGGER {after_insert} AFTER INSERT ON {table} \
                         BEGIN {insert_new} END"
                    ),
                    format!(
                        "CREATE TRIGGER {after_delete} AFTER DELETE ON {table} \
                         BEGIN {delete_old} END"
                    ),
                    format!(
                        "CREATE TRIGGER {after_update} AFTER UPDATE OF {columns} ON {table} \
                         BEGIN {delete_old} {insert_new} END"
                    ),
                    format!("INSERT INTO {index}({index}) VALUES ('rebuild')"),
                ]
            }
        }
    }

    /// Relevance-ranked search returning full rows of the indexed table
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidIdentifier`] for a bad table or column name
    pub fn search_statement(
        &self,
        dialect: Dialect,
        query: &str,
        limit: i64,
    ) -> DatabaseResult<Statement> {
        self.validate()?;
        let table = &self.table;
        let statement = match dialect {
            Dialect::MySql => {
                let matcher = format!(
                    "MATCH({}) AGAINST(? IN NATURAL LANGUAGE MODE)",
                    self.columns.join(", ")
                );
                Statement {
                    sql: format!(
                        "SELECT * FROM {table} WHERE {matcher} ORDER BY {matcher} DESC LIMIT ?"
                    ),
                    params: vec![
                        SqlValue::from(query),
                        SqlValue::from(query),
                        SqlValue::Integer(limit),
                    ],
                }
            }
            Dialect::Sqlite => {
                let index = self.index_name();
                let key = &self.key_column;
                Statement {
                    sql: format!(
                        "SELECT {table}.* FROM {table} JOIN {index} ON {index}.rowid = {table}.{key} \
                         WHERE {index} MATCH ? ORDER BY {index}.rank LIMIT ?"
                    ),
                    params: vec![SqlValue::from(fts5_phrase(query)), SqlValue::Integer(limit)],
                }
            }
        };
        Ok(statement)
    }

    fn prefixed_columns(&self, prefix: &str) -> String {
        self.columns
            .iter()
            .map(|column| format!("{prefix}.{column}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Quote free text as a single FTS5 phrase so operators in user input are literal
fn fts5_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

impl ConnectionHandle {
    /// Create the full-text index unless the catalog already lists it
    ///
    /// # Errors
    ///
    /// Returns a usage error for invalid names or no columns, or a store
    /// error tagged `IndexProvisioning`. A duplicate-index failure from a
    /// concurrent creator is not an error.
    pub async fn ensure_fulltext_index(
        &self,
        index: &FullTextIndex,
    ) -> DatabaseResult<IndexProvisioning> {
        index.validate()?;
        let dialect = self.dialect();
        let name = index.index_name();

        let check = index.existence_check(dialect);
        let found = match self
            .fetch_optional(Operation::IndexProvisioning, &check.sql, &check.params)
            .await?
        {
            Some(row) => row.get_at::<i64>(0)?,
            None => 0,
        };
        let expected = i64::try_from(index.catalog_objects(dialect).len()).unwrap_or(i64::MAX);
        if found >= expected {
            return Ok(IndexProvisioning::AlreadyPresent);
        }

        let mut statements = Vec::new();
        if found > 0 && dialect == Dialect::Sqlite {
            warn!(
                table = index.table(),
                index = %name,
                found,
                expected,
                "Rebuilding incomplete full-text index"
            );
            statements.extend(index.cleanup_statements());
        }
        statements.extend(index.creation_statements(dialect));

        match self
            .execute_batch(Operation::IndexProvisioning, &statements)
            .await
        {
            Ok(()) => {}
            Err(DatabaseError::Store { source, .. }) if is_duplicate_object_error(&source) => {
                warn!(
                    table = index.table(),
                    index = %name,
                    error = %source,
                    "Full-text index was created concurrently"
                );
                return Ok(IndexProvisioning::CreatedConcurrently);
            }
            Err(e) => return Err(e),
        }

        info!(table = index.table(), index = %name, backend = %dialect, "Full-text index created");
        Ok(IndexProvisioning::Created)
    }

    /// Run a relevance-ranked full-text search
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidIdentifier`] or a store error tagged `Search`
    pub async fn search(
        &self,
        index: &FullTextIndex,
        query: &str,
        limit: i64,
    ) -> DatabaseResult<RowCursor> {
        let Statement { sql, params } = index.search_statement(self.dialect(), query, limit)?;
        self.open_cursor(Operation::Search, sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles_index() -> FullTextIndex {
        FullTextIndex::new("articles", ["title", "excerpt"])
    }

    #[test]
    fn test_index_name_is_table_scoped() {
        assert_eq!(articles_index().index_name(), "idx_fulltext_articles");
    }

    #[test]
    fn test_mysql_creation_uses_ngram_parser() {
        assert_eq!(
            articles_index().creation_statements(Dialect::MySql),
            vec![
                "ALTER TABLE articles ADD FULLTEXT INDEX idx_fulltext_articles (title, excerpt) \
                 WITH PARSER ngram"
                    .to_owned()
            ]
        );
    }

    #[test]
    fn test_sqlite_creation_builds_trigram_table_and_triggers() {
        let statements = articles_index().creation_statements(Dialect::Sqlite);
        assert_eq!(statements.len(), 5);
        assert!(statements[0].starts_with("CREATE VIRTUAL TABLE idx_fulltext_articles USING fts5("));
        assert!(statements[0].contains("tokenize='trigram'"));
        assert!(statements[3].contains("AFTER UPDATE OF title, excerpt ON articles"));
        assert!(statements[4].contains("'rebuild'"));
    }

    #[test]
    fn test_sqlite_presence_requires_table_and_triggers() {
        let check = articles_index().existence_check(Dialect::Sqlite);
        assert!(check.sql.contains("name IN (?, ?, ?, ?)"));
        assert_eq!(
            check.params,
            vec![
                SqlValue::from("idx_fulltext_articles"),
                SqlValue::from("idx_fulltext_articles_ai"),
                SqlValue::from("idx_fulltext_articles_ad"),
                SqlValue::from("idx_fulltext_articles_au"),
            ]
        );
        assert_eq!(articles_index().catalog_objects(Dialect::MySql).len(), 1);
    }

    #[test]
    fn test_cleanup_drops_triggers_before_table() {
        assert_eq!(
            articles_index().cleanup_statements(),
            vec![
                "DROP TRIGGER IF EXISTS idx_fulltext_articles_ai".to_owned(),
                "DROP TRIGGER IF EXISTS idx_fulltext_articles_ad".to_owned(),
                "DROP TRIGGER IF EXISTS idx_fulltext_articles_au".to_owned(),
                "DROP TABLE IF EXISTS idx_fulltext_articles".to_owned(),
            ]
        );
    }

    #[test]
    fn test_custom_key_column_is_content_rowid() {
        let index = FullTextIndex::new("notes", ["body"]).with_key_column("note_id");
        let statements = index.creation_statements(Dialect::Sqlite);
        assert!(statements[0].contains("content_rowid='note_id'"));
        assert!(statements[1].contains("VALUES (new.note_id, new.body)"));

        let search = index.search_statement(Dialect::Sqlite, "x", 1).ok();
        assert!(search.is_some_and(|s| s
            .sql
            .contains("ON idx_fulltext_notes.rowid = notes.note_id")));
    }

    #[test]
    fn test_mysql_search_binds_query_twice() {
        let statement = articles_index()
            .search_statement(Dialect::MySql, "rust", 10)
            .ok();
        assert_eq!(
            statement.map(|s| s.params),
            Some(vec![
                SqlValue::from("rust"),
                SqlValue::from("rust"),
                SqlValue::Integer(10)
            ])
        );
    }

    #[test]
    fn test_sqlite_search_quotes_phrase() {
        let statement = articles_index()
            .search_statement(Dialect::Sqlite, "say \"hi\" OR x", 5)
            .ok();
        assert_eq!(
            statement.map(|s| s.params[0].clone()),
            Some(SqlValue::from("\"say \"\"hi\"\" OR x\""))
        );
    }

    #[test]
    fn test_index_without_columns_is_usage_error() {
        let index = FullTextIndex::new("articles", Vec::<String>::new());
        assert!(matches!(
            index.search_statement(Dialect::MySql, "x", 1),
            Err(DatabaseError::EmptyColumns { .. })
        ));
    }
}
