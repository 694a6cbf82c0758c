// ABOUTME: Configuration module for resolving store connection settings
// ABOUTME: Environment-first, with the config.yaml `database` section as an alternative source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the datastore
//!
//! The data layer itself never reads files or environment variables; it is
//! handed a resolved [`DatabaseConfig`] built here.

/// Database URL, credentials and pool bounds
pub mod database;

pub use database::{DatabaseConfig, DatabaseUrl, PoolConfig};
