// ABOUTME: Pooled connection handle to the relational store plus raw passthrough execution
// ABOUTME: Declares the schema, builder, full-text, row and error modules of the data layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Access Layer
//!
//! A [`ConnectionHandle`] owns a bounded `sqlx` pool for one store. Table
//! provisioning lives in [`schema`] and [`fulltext`]; parameterized CRUD in
//! [`builder`]. Anything the builder cannot express goes through
//! [`ConnectionHandle::exec`], [`ConnectionHandle::query`] and
//! [`ConnectionHandle::query_row`].

/// Parameterized insert/update/delete/select/increment rendering
pub mod builder;
/// SQL dialect differences between the supported stores
pub mod dialect;
/// Error types and duplicate-key classification
pub mod errors;
/// Full-text index provisioning and search statements
pub mod fulltext;
/// Identifier and fragment allow-list
pub mod identifier;
/// Result rows and cursors
pub mod row;
/// Idempotent table provisioning
pub mod schema;
/// Bindable values and field maps
pub mod value;

pub use builder::Statement;
pub use dialect::Dialect;
pub use errors::{is_duplicate_error, DatabaseError, DatabaseResult, Operation};
pub use fulltext::{FullTextIndex, IndexProvisioning};
pub use row::{FromStoreRow, RowCursor, StoreDecode, StoreRow};
pub use schema::ColumnSpec;
pub use value::{FieldValueMap, SqlValue};

use crate::config::database::{DatabaseConfig, DatabaseUrl, PoolConfig};
use crate::constants::pool::UNBOUNDED_ACQUIRE_TIMEOUT_SECS;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use row::RowStream;
#[cfg(feature = "mysql")]
use sqlx::mysql::{MySqlConnectOptions, MySqlPool};
use sqlx::pool::PoolOptions;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::{ConnectOptions, Connection, Database, Encode, Type};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone)]
enum StorePool {
    Sqlite(SqlitePool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
}

impl StorePool {
    fn is_closed(&self) -> bool {
        match self {
            Self::Sqlite(pool) => pool.is_closed(),
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => pool.is_closed(),
        }
    }
}

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted
    pub rows_affected: u64,
    /// Identifier generated by the last insert on the connection, if any
    pub last_insert_id: Option<i64>,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections currently open (idle or in use)
    pub size: u32,
    /// Connections sitting idle in the pool
    pub idle: usize,
    /// Configured ceiling
    pub max_connections: u32,
}

/// Pooled handle to the relational store
///
/// The handle is either open or closed. Every operation other than
/// [`ConnectionHandle::close`] fails with [`DatabaseError::Closed`] once the
/// handle is closed; there is no reconnect. Clones share the same pool, so
/// closing any clone closes all of them.
#[derive(Clone)]
pub struct ConnectionHandle {
    pool: StorePool,
    dialect: Dialect,
    max_connections: u32,
}

impl ConnectionHandle {
    /// Open a pool for the configured store and verify it is reachable
    ///
    /// The liveness probe uses a dedicated connection, so an unreachable
    /// store fails here rather than on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Store`] tagged `Connect` or `Ping` if the
    /// store cannot be reached, [`DatabaseError::Config`] if the URL cannot
    /// be turned into connect options, or [`DatabaseError::Unsupported`]
    /// for a backend not compiled into this build
    pub async fn open(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let dialect = config.url.dialect();
        let mut pool_config = config.pool.clone();
        pool_config
            .validate()
            .map_err(|e| DatabaseError::Config(e.message))?;

        let pool = match &config.url {
            DatabaseUrl::Memory => {
                // The shared in-memory database disappears with its last connection
                pool_config.min_connections = pool_config.min_connections.max(1);
                pool_config.idle_timeout_secs = None;
                pool_config.max_lifetime_secs = None;
                let options = SqliteConnectOptions::from_str("sqlite::memory:")
                    .map_err(|e| DatabaseError::Config(e.to_string()))?;
                probe(&options).await?;
                StorePool::Sqlite(pool_options(&pool_config).connect_lazy_with(options))
            }
            DatabaseUrl::SQLite { path } => {
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal);
                probe(&options).await?;
                StorePool::Sqlite(pool_options(&pool_config).connect_lazy_with(options))
            }
            #[cfg(feature = "mysql")]
            DatabaseUrl::MySql { .. } => {
                let options = MySqlConnectOptions::from_str(&config.url.to_connection_string())
                    .map_err(|e| DatabaseError::Config(e.to_string()))?;
                probe(&options).await?;
                StorePool::MySql(pool_options(&pool_config).connect_lazy_with(options))
            }
            #[cfg(not(feature = "mysql"))]
            DatabaseUrl::MySql { .. } => {
                return Err(DatabaseError::Unsupported(
                    "MySQL support requires the `mysql` feature".to_owned(),
                ));
            }
        };

        info!(
            backend = %dialect,
            url = %config.url,
            max_connections = pool_config.max_connections,
            min_connections = pool_config.min_connections,
            "Database pool opened"
        );

        Ok(Self {
            pool,
            dialect,
            max_connections: pool_config.max_connections,
        })
    }

    /// Close the pool; closing an already-closed handle is a no-op
    ///
    /// Waits until every checked-out connection is returned. A [`RowCursor`]
    /// holds its connection until it is drained, closed or dropped, so any
    /// undrained cursor must be released first or this call does not
    /// complete.
    pub async fn close(&self) {
        if self.is_closed() {
            return;
        }
        match &self.pool {
            StorePool::Sqlite(pool) => pool.close().await,
            #[cfg(feature = "mysql")]
            StorePool::MySql(pool) => pool.close().await,
        }
        info!(backend = %self.dialect, "Database pool closed");
    }

    /// Whether [`ConnectionHandle::close`] has been called on this pool
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Dialect of the connected store
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Current pool occupancy
    #[must_use]
    pub fn pool_status(&self) -> PoolStatus {
        let (size, idle) = match &self.pool {
            StorePool::Sqlite(pool) => (pool.size(), pool.num_idle()),
            #[cfg(feature = "mysql")]
            StorePool::MySql(pool) => (pool.size(), pool.num_idle()),
        };
        PoolStatus {
            size,
            idle,
            max_connections: self.max_connections,
        }
    }

    pub(crate) fn ensure_open(&self) -> DatabaseResult<()> {
        if self.is_closed() {
            Err(DatabaseError::Closed)
        } else {
            Ok(())
        }
    }

    /// Execute caller-authored SQL that returns no rows
    ///
    /// Parameters bind to `?` placeholders in order. The statement bypasses
    /// every builder check.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Closed`] on a closed handle or a store error
    /// tagged `Exec`
    pub async fn exec(&self, sql: &str, params: &[SqlValue]) -> DatabaseResult<ExecResult> {
        self.execute(Operation::Exec, sql, params).await
    }

    /// Run caller-authored SQL and stream its rows
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Closed`] on a closed handle or a store error
    /// tagged `Query`, including errors in the statement itself
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> DatabaseResult<RowCursor> {
        self.open_cursor(Operation::Query, sql.to_owned(), params.to_vec())
            .await
    }

    /// Run caller-authored SQL and return its first row, if any
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Closed`] on a closed handle or a store error
    /// tagged `QueryRow`
    pub async fn query_row(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> DatabaseResult<Option<StoreRow>> {
        self.fetch_optional(Operation::QueryRow, sql, params).await
    }

    pub(crate) async fn execute(
        &self,
        operation: Operation,
        sql: &str,
        params: &[SqlValue],
    ) -> DatabaseResult<ExecResult> {
        self.ensure_open()?;
        debug!(%operation, params = params.len(), sql, "Executing statement");

        let result = match &self.pool {
            StorePool::Sqlite(pool) => bind_values(sqlx::query(sql), params)
                .execute(pool)
                .await
                .map(|done| ExecResult {
                    rows_affected: done.rows_affected(),
                    last_insert_id: Some(done.last_insert_rowid()).filter(|id| *id > 0),
                }),
            #[cfg(feature = "mysql")]
            StorePool::MySql(pool) => bind_values(sqlx::query(sql), params)
                .execute(pool)
                .await
                .map(|done| ExecResult {
                    rows_affected: done.rows_affected(),
                    last_insert_id: i64::try_from(done.last_insert_id())
                        .ok()
                        .filter(|id| *id > 0),
                }),
        };
        result.map_err(|source| DatabaseError::store(operation, source))
    }

    /// Run `statements` in order inside one transaction
    ///
    /// The first failure rolls back everything the batch already did.
    pub(crate) async fn execute_batch(
        &self,
        operation: Operation,
        statements: &[String],
    ) -> DatabaseResult<()> {
        self.ensure_open()?;
        debug!(%operation, statements = statements.len(), "Executing statement batch");

        let result = match &self.pool {
            StorePool::Sqlite(pool) => async {
                let mut tx = pool.begin().await?;
                for sql in statements {
                    if let Err(e) = sqlx::query(sql.as_str()).execute(&mut *tx).await {
                        if let Err(rollback) = tx.rollback().await {
                            warn!(%operation, error = %rollback, "Batch rollback failed");
                        }
                        return Err(e);
                    }
                }
                tx.commit().await
            }
            .await,
            #[cfg(feature = "mysql")]
            StorePool::MySql(pool) => async {
                let mut tx = pool.begin().await?;
                for sql in statements {
                    if let Err(e) = sqlx::query(sql.as_str()).execute(&mut *tx).await {
                        if let Err(rollback) = tx.rollback().await {
                            warn!(%operation, error = %rollback, "Batch rollback failed");
                        }
                        return Err(e);
                    }
                }
                tx.commit().await
            }
            .await,
        };
        result.map_err(|source| DatabaseError::store(operation, source))
    }

    pub(crate) async fn fetch_optional(
        &self,
        operation: Operation,
        sql: &str,
        params: &[SqlValue],
    ) -> DatabaseResult<Option<StoreRow>> {
        self.ensure_open()?;
        debug!(%operation, params = params.len(), sql, "Fetching single row");

        let result = match &self.pool {
            StorePool::Sqlite(pool) => bind_values(sqlx::query(sql), params)
                .fetch_optional(pool)
                .await
                .map(|row| row.map(StoreRow::Sqlite)),
            #[cfg(feature = "mysql")]
            StorePool::MySql(pool) => bind_values(sqlx::query(sql), params)
                .fetch_optional(pool)
                .await
                .map(|row| row.map(StoreRow::MySql)),
        };
        result.map_err(|source| DatabaseError::store(operation, source))
    }

    /// Acquire a connection and hand it to a row stream that owns it
    pub(crate) async fn open_cursor(
        &self,
        operation: Operation,
        sql: String,
        params: Vec<SqlValue>,
    ) -> DatabaseResult<RowCursor> {
        self.ensure_open()?;
        debug!(%operation, params = params.len(), sql = %sql, "Opening row cursor");

        let stream: RowStream = match &self.pool {
            StorePool::Sqlite(pool) => {
                let mut conn = pool
                    .acquire()
                    .await
                    .map_err(|source| DatabaseError::store(operation, source))?;
                Box::pin(async_stream::stream! {
                    let mut rows = bind_values(sqlx::query(&sql), &params).fetch(&mut *conn);
                    while let Some(item) = rows.next().await {
                        yield item.map(StoreRow::Sqlite);
                    }
                })
            }
            #[cfg(feature = "mysql")]
            StorePool::MySql(pool) => {
                let mut conn = pool
                    .acquire()
                    .await
                    .map_err(|source| DatabaseError::store(operation, source))?;
                Box::pin(async_stream::stream! {
                    let mut rows = bind_values(sqlx::query(&sql), &params).fetch(&mut *conn);
                    while let Some(item) = rows.next().await {
                        yield item.map(StoreRow::MySql);
                    }
                })
            }
        };
        RowCursor::open(operation, stream).await
    }
}

fn pool_options<DB: Database>(config: &PoolConfig) -> PoolOptions<DB> {
    let acquire_timeout = config
        .acquire_timeout_secs
        .unwrap_or(UNBOUNDED_ACQUIRE_TIMEOUT_SECS);
    PoolOptions::<DB>::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .idle_timeout(config.idle_timeout_secs.map(Duration::from_secs))
        .max_lifetime(config.max_lifetime_secs.map(Duration::from_secs))
        .acquire_timeout(Duration::from_secs(acquire_timeout))
        .test_before_acquire(config.test_before_acquire)
}

/// Open one connection outside the pool, ping it and close it
async fn probe<O>(options: &O) -> DatabaseResult<()>
where
    O: ConnectOptions,
    O::Connection: Sized,
{
    let mut conn = options
        .connect()
        .await
        .map_err(|source| DatabaseError::store(Operation::Connect, source))?;
    conn.ping()
        .await
        .map_err(|source| DatabaseError::store(Operation::Ping, source))?;
    conn.close()
        .await
        .map_err(|source| DatabaseError::store(Operation::Connect, source))
}

/// Bind values to `?` placeholders in order
fn bind_values<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    i64: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    DateTime<Utc>: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    for value in params {
        query = match value {
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Boolean(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(v.to_string()),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}
