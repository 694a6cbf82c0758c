// ABOUTME: Structured error types for datastore operations and duplicate-key classification
// ABOUTME: Separates usage/contract errors from wrapped store errors that keep their sqlx source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Datastore Errors
//!
//! Two classes of failure leave this layer:
//!
//! - **usage errors** are detected before any statement is sent (empty
//!   payloads, missing filters, invalid identifiers, closed handle);
//! - **store errors** wrap the `sqlx::Error` returned by the driver with the
//!   [`Operation`] that failed.
//!
//! [`is_duplicate_error`] classifies unique-constraint violations anywhere in
//! an error's source chain.

use crate::constants::markers;
use pierre_datastore_core::errors::{AppError, ErrorCode};
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Operation that was running when a store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Opening the pool
    Connect,
    /// Liveness probe right after opening
    Ping,
    /// `CREATE TABLE IF NOT EXISTS`
    CreateTable,
    /// `DROP TABLE IF EXISTS`
    DropTable,
    /// Catalog lookup for a table
    TableLookup,
    /// Builder insert
    Insert,
    /// Builder update
    Update,
    /// Builder delete
    Delete,
    /// Builder select
    Select,
    /// Builder atomic increment
    Increment,
    /// Raw passthrough statement
    Exec,
    /// Raw passthrough multi-row query
    Query,
    /// Raw passthrough single-row query
    QueryRow,
    /// Full-text index check or creation
    IndexProvisioning,
    /// Full-text search
    Search,
}

impl Operation {
    /// Static message naming the operation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "database connection",
            Self::Ping => "database liveness probe",
            Self::CreateTable => "table creation",
            Self::DropTable => "table removal",
            Self::TableLookup => "table lookup",
            Self::Insert => "insertion",
            Self::Update => "update",
            Self::Delete => "deletion",
            Self::Select => "selection",
            Self::Increment => "counter increment",
            Self::Exec => "statement execution",
            Self::Query => "query",
            Self::QueryRow => "single-row query",
            Self::IndexProvisioning => "full-text index provisioning",
            Self::Search => "search",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the datastore layer
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatabaseError {
    /// `create_table` called without columns
    #[error("no columns supplied for table `{table}`")]
    EmptyColumns {
        /// Target table
        table: String,
    },

    /// Insert/update called without fields
    #[error("no fields supplied for {operation} on `{table}`")]
    EmptyFields {
        /// Operation that was refused
        operation: Operation,
        /// Target table
        table: String,
    },

    /// Update/delete called without a filter
    #[error("refusing {operation} on `{table}` without a filter")]
    MissingFilter {
        /// Operation that was refused
        operation: Operation,
        /// Target table
        table: String,
    },

    /// Table or column name outside the identifier allow-list
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// Type string or default expression carrying a statement separator or comment
    #[error("rejected SQL fragment `{0}`")]
    InvalidFragment(String),

    /// Column declared twice in one schema
    #[error("column `{column}` declared more than once for table `{table}`")]
    DuplicateColumn {
        /// Target table
        table: String,
        /// Repeated column
        column: String,
    },

    /// Operation attempted after `close()`
    #[error("connection handle is closed")]
    Closed,

    /// Failure reported by the store
    #[error("{operation} failed")]
    Store {
        /// Operation that failed
        operation: Operation,
        /// Driver error
        #[source]
        source: sqlx::Error,
    },

    /// Row value could not be decoded into the requested type
    #[error("failed to decode column `{column}`")]
    Decode {
        /// Column being read
        column: String,
        /// Driver error
        #[source]
        source: sqlx::Error,
    },

    /// JSON value could not be (de)serialized
    #[error("JSON conversion failed")]
    Json(#[from] serde_json::Error),

    /// Backend not compiled into this build
    #[error("unsupported database backend: {0}")]
    Unsupported(String),

    /// Connection settings could not be assembled
    #[error("invalid database configuration: {0}")]
    Config(String),
}

impl DatabaseError {
    /// Wrap a driver error with the operation that produced it
    #[must_use]
    pub const fn store(operation: Operation, source: sqlx::Error) -> Self {
        Self::Store { operation, source }
    }

    /// Whether the error was detected before any statement reached the store
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::EmptyColumns { .. }
                | Self::EmptyFields { .. }
                | Self::MissingFilter { .. }
                | Self::InvalidIdentifier(_)
                | Self::InvalidFragment(_)
                | Self::DuplicateColumn { .. }
                | Self::Closed
        )
    }

    /// Whether the store rejected the statement for violating a uniqueness constraint
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        is_duplicate_error(Some(self))
    }

    /// Operation tag of a store error
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Store { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Result alias for datastore operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Check whether an error is a unique-constraint violation
///
/// Returns `false` for `None`. Otherwise every link of the `source()` chain
/// is inspected: `sqlx` database errors are asked directly, and any link
/// whose text carries a vendor duplicate-entry signature also matches.
#[must_use]
pub fn is_duplicate_error<E>(err: Option<&E>) -> bool
where
    E: StdError + 'static,
{
    let Some(err) = err else {
        return false;
    };

    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(link) = current {
        if let Some(sqlx::Error::Database(db_err)) = link.downcast_ref::<sqlx::Error>() {
            if db_err.is_unique_violation()
                || mysql_error_number(&**db_err) == Some(markers::MYSQL_DUPLICATE_ENTRY_CODE)
            {
                return true;
            }
        }
        let text = link.to_string();
        if markers::UNIQUE_VIOLATION_MARKERS
            .iter()
            .any(|marker| text.contains(marker))
        {
            return true;
        }
        current = link.source();
    }
    false
}

/// Check whether a DDL failure means the object already exists
///
/// Used to recognize the losing side of a concurrent full-text index creation.
#[must_use]
pub(crate) fn is_duplicate_object_error(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if mysql_error_number(&**db_err) == Some(markers::MYSQL_DUPLICATE_KEY_NAME_CODE) {
            return true;
        }
    }
    let text = err.to_string();
    markers::DUPLICATE_OBJECT_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

/// Vendor error number of a `MySQL` server error
#[cfg(feature = "mysql")]
fn mysql_error_number(err: &dyn sqlx::error::DatabaseError) -> Option<u16> {
    err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
        .map(sqlx::mysql::MySqlDatabaseError::number)
}

#[cfg(not(feature = "mysql"))]
const fn mysql_error_number(_err: &dyn sqlx::error::DatabaseError) -> Option<u16> {
    None
}

impl From<DatabaseError> for AppError {
    fn from(error: DatabaseError) -> Self {
        let code = if error.is_usage() {
            ErrorCode::InvalidInput
        } else if error.is_duplicate() {
            ErrorCode::ResourceAlreadyExists
        } else {
            match &error {
                DatabaseError::Json(_) => ErrorCode::SerializationError,
                DatabaseError::Config(_) | DatabaseError::Unsupported(_) => ErrorCode::ConfigError,
                _ => ErrorCode::DatabaseError,
            }
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}
