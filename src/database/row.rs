// ABOUTME: Backend-neutral result rows and the forward-only cursor that owns a pooled connection
// ABOUTME: The connection goes back to the pool on exhaustion, error, close, or drop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::errors::{DatabaseError, DatabaseResult, Operation};
use futures_util::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
#[cfg(feature = "mysql")]
use sqlx::mysql::{MySql, MySqlRow};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::types::Json;
use sqlx::{Decode, Row, Type};
use std::fmt;

/// Values decodable from every compiled backend
#[cfg(not(feature = "mysql"))]
pub trait StoreDecode: for<'r> Decode<'r, Sqlite> + Type<Sqlite> {}

#[cfg(not(feature = "mysql"))]
impl<T> StoreDecode for T where T: for<'r> Decode<'r, Sqlite> + Type<Sqlite> {}

/// Values decodable from every compiled backend
#[cfg(feature = "mysql")]
pub trait StoreDecode:
    for<'r> Decode<'r, Sqlite> + Type<Sqlite> + for<'r> Decode<'r, MySql> + Type<MySql>
{
}

#[cfg(feature = "mysql")]
impl<T> StoreDecode for T where
    T: for<'r> Decode<'r, Sqlite> + Type<Sqlite> + for<'r> Decode<'r, MySql> + Type<MySql>
{
}

/// One row returned by the store
pub enum StoreRow {
    /// Row from a `SQLite` pool
    Sqlite(SqliteRow),
    /// Row from a `MySQL` pool
    #[cfg(feature = "mysql")]
    MySql(MySqlRow),
}

impl fmt::Debug for StoreRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self {
            Self::Sqlite(_) => "SQLite",
            #[cfg(feature = "mysql")]
            Self::MySql(_) => "MySQL",
        };
        f.debug_struct("StoreRow")
            .field("backend", &backend)
            .field("columns", &self.len())
            .finish()
    }
}

impl StoreRow {
    /// Decode a column by name
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Decode`] if the column is missing or its
    /// value is not compatible with `T`
    pub fn get<T: StoreDecode>(&self, column: &str) -> DatabaseResult<T> {
        let decoded = match self {
            Self::Sqlite(row) => row.try_get::<T, _>(column),
            #[cfg(feature = "mysql")]
            Self::MySql(row) => row.try_get::<T, _>(column),
        };
        decoded.map_err(|source| DatabaseError::Decode {
            column: column.to_owned(),
            source,
        })
    }

    /// Decode a column by zero-based position
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Decode`] if the index is out of range or the
    /// value is not compatible with `T`
    pub fn get_at<T: StoreDecode>(&self, index: usize) -> DatabaseResult<T> {
        let decoded = match self {
            Self::Sqlite(row) => row.try_get::<T, _>(index),
            #[cfg(feature = "mysql")]
            Self::MySql(row) => row.try_get::<T, _>(index),
        };
        decoded.map_err(|source| DatabaseError::Decode {
            column: format!("#{index}"),
            source,
        })
    }

    /// Decode a JSON (or JSON text) column; SQL NULL yields `None`
    ///
    /// # Errors
    ///
    /// Returns an error if the column cannot be read as text or the text is not valid JSON for `T`
    pub fn get_json<T: DeserializeOwned>(&self, column: &str) -> DatabaseResult<Option<T>> {
        self.get::<Option<Json<Value>>>(column)?
            .map(|Json(value)| serde_json::from_value(value))
            .transpose()
            .map_err(DatabaseError::from)
    }

    /// Number of columns in the row
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sqlite(row) => row.len(),
            #[cfg(feature = "mysql")]
            Self::MySql(row) => row.len(),
        }
    }

    /// Whether the row has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Conversion from a store row into a caller-owned record
pub trait FromStoreRow: Sized {
    /// Build the record from one row
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing or cannot be decoded
    fn from_store_row(row: &StoreRow) -> DatabaseResult<Self>;
}

pub(crate) type RowStream = BoxStream<'static, Result<StoreRow, sqlx::Error>>;

/// Forward-only, finite sequence of rows
///
/// The cursor owns the pooled connection that produced it. The connection is
/// returned as soon as the last row has been read, an error is hit,
/// [`RowCursor::close`] is called, or the cursor is dropped. Not meant to be
/// shared between tasks.
pub struct RowCursor {
    operation: Operation,
    peeked: Option<StoreRow>,
    stream: Option<RowStream>,
}

impl RowCursor {
    /// Start the stream and pull the first row so statement errors surface here
    pub(crate) async fn open(operation: Operation, mut stream: RowStream) -> DatabaseResult<Self> {
        let first = stream
            .next()
            .await
            .transpose()
            .map_err(|source| DatabaseError::store(operation, source))?;
        let stream = first.is_some().then_some(stream);
        Ok(Self {
            operation,
            peeked: first,
            stream,
        })
    }

    /// Next row, or `None` once the cursor is exhausted
    ///
    /// # Errors
    ///
    /// Returns the store error that interrupted the stream; the cursor is
    /// released and yields `None` afterwards
    pub async fn next_row(&mut self) -> DatabaseResult<Option<StoreRow>> {
        if let Some(row) = self.peeked.take() {
            return Ok(Some(row));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(source)) => {
                self.stream = None;
                Err(DatabaseError::store(self.operation, source))
            }
            None => {
                self.stream = None;
                Ok(None)
            }
        }
    }

    /// Next row converted into a record
    ///
    /// # Errors
    ///
    /// Returns a store error or the record's decode error
    pub async fn next_as<T: FromStoreRow>(&mut self) -> DatabaseResult<Option<T>> {
        match self.next_row().await? {
            Some(row) => T::from_store_row(&row).map(Some),
            None => Ok(None),
        }
    }

    /// Drain the cursor into records
    ///
    /// # Errors
    ///
    /// Returns the first store or decode error; the connection is released either way
    pub async fn collect_as<T: FromStoreRow>(mut self) -> DatabaseResult<Vec<T>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_as::<T>().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Read at most `limit` records, then release the connection
    ///
    /// # Errors
    ///
    /// Returns the first store or decode error
    pub async fn take_as<T: FromStoreRow>(mut self, limit: usize) -> DatabaseResult<Vec<T>> {
        let mut records = Vec::with_capacity(limit.min(64));
        while records.len() < limit {
            match self.next_as::<T>().await? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        self.close();
        Ok(records)
    }

    /// Drain the cursor, returning the raw rows
    ///
    /// # Errors
    ///
    /// Returns the store error that interrupted the stream
    pub async fn collect_rows(mut self) -> DatabaseResult<Vec<StoreRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Whether the cursor still holds its connection
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the underlying connection without reading further rows
    pub fn close(mut self) {
        self.peeked = None;
        self.stream = None;
    }
}
