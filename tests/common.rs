// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging plus in-memory and file-backed store handles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::wildcard_in_or_patterns,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `pierre_datastore`

use anyhow::Result;
use pierre_datastore::{
    articles::NewArticle,
    config::{DatabaseConfig, DatabaseUrl, PoolConfig},
    database::ConnectionHandle,
};
use std::sync::Once;
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Single-connection in-memory store
///
/// One connection keeps the shared-cache database free of table locks.
pub async fn memory_handle() -> Result<ConnectionHandle> {
    init_test_logging();
    let config = DatabaseConfig::new(DatabaseUrl::Memory).with_pool(PoolConfig {
        max_connections: 1,
        ..PoolConfig::default()
    });
    Ok(ConnectionHandle::open(&config).await?)
}

/// File-backed store inside `dir`
pub async fn file_handle(dir: &TempDir, max_connections: u32) -> Result<ConnectionHandle> {
    init_test_logging();
    let path = dir.path().join("datastore.db");
    let config = DatabaseConfig::new(DatabaseUrl::SQLite { path }).with_pool(PoolConfig {
        max_connections,
        ..PoolConfig::default()
    });
    Ok(ConnectionHandle::open(&config).await?)
}

/// Article fixture with the given title and category
pub fn sample_article(title: &str, category: &str) -> NewArticle {
    NewArticle {
        title: title.to_owned(),
        excerpt: format!("{title} excerpt"),
        author: "bob".to_owned(),
        date: None,
        read_time: 5,
        category: category.to_owned(),
        tags: vec!["rust".to_owned()],
        featured: false,
    }
}
