// ABOUTME: Main library entry point for the Pierre datastore
// ABOUTME: Generic relational data access with idempotent schema provisioning and guarded CRUD
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Datastore
//!
//! A small data-access layer over `sqlx` pools. Callers declare a table as
//! a list of [`database::ColumnSpec`], provision it idempotently, then
//! insert, update, delete and select through field/value maps without
//! writing SQL per entity.
//!
//! ## Guarantees
//!
//! - **Deterministic SQL**: field maps render in sorted key order, so the
//!   same map always yields the same text and parameter order.
//! - **Guarded mutation**: update and delete refuse an empty filter before
//!   anything reaches the store.
//! - **Allow-listed identifiers**: table and column names are validated
//!   before they are interpolated.
//! - **Released cursors**: a [`database::RowCursor`] returns its pooled
//!   connection on exhaustion, error, close or drop.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pierre_datastore::config::{DatabaseConfig, DatabaseUrl};
//! use pierre_datastore::database::{ColumnSpec, ConnectionHandle, FieldValueMap};
//!
//! # async fn run() -> Result<(), pierre_datastore::database::DatabaseError> {
//! let handle = ConnectionHandle::open(&DatabaseConfig::new(DatabaseUrl::Memory)).await?;
//! handle
//!     .create_table(
//!         "notes",
//!         &[
//!             ColumnSpec::new("id", "INTEGER").primary_key(),
//!             ColumnSpec::new("body", "TEXT"),
//!         ],
//!     )
//!     .await?;
//! let id = handle
//!     .insert("notes", &FieldValueMap::new().with("body", "hello"))
//!     .await?;
//! let rows = handle
//!     .select("notes", &[], &FieldValueMap::new().with("id", id))
//!     .await?
//!     .collect_rows()
//!     .await?;
//! assert_eq!(rows.len(), 1);
//! handle.close().await;
//! # Ok(())
//! # }
//! ```

/// Blog article repository built on the data layer
pub mod articles;

/// Store connection settings
pub mod config;

/// Connection handle, schema provisioning, query builder and error classification
pub mod database;

/// Structured logging setup
pub mod logging;

/// Constants shared with the core crate
pub use pierre_datastore_core::constants;

/// Application error types shared with the core crate
pub use pierre_datastore_core::errors;
