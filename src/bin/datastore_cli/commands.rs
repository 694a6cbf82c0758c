// ABOUTME: Subcommand implementations for datastore-cli
// ABOUTME: Provision, check and search, printing results to stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_datastore::{
    articles::{ArticleStore, ARTICLES_TABLE},
    database::ConnectionHandle,
    errors::AppResult,
};
use tracing::info;

/// Create the articles table and full-text index
pub async fn provision(handle: &ConnectionHandle) -> AppResult<()> {
    let store = ArticleStore::open(handle).await?;
    let outcome = store.provision_index().await?;
    info!(?outcome, "Provisioning complete");
    println!("articles: ready (search index: {outcome:?})");
    Ok(())
}

/// Report store reachability, pool occupancy and table presence
pub async fn check(handle: &ConnectionHandle) -> AppResult<()> {
    let status = handle.pool_status();
    println!("backend: {}", handle.dialect());
    println!(
        "pool: {} open, {} idle, {} max",
        status.size, status.idle, status.max_connections
    );
    let present = handle.table_exists(ARTICLES_TABLE).await?;
    println!(
        "{ARTICLES_TABLE}: {}",
        if present { "present" } else { "missing" }
    );
    Ok(())
}

/// Print matching articles as JSON lines
pub async fn search(handle: &ConnectionHandle, query: &str, limit: i64) -> AppResult<()> {
    let store = ArticleStore::open(handle).await?;
    let articles = store.search(query, limit).await?;
    info!(query, hits = articles.len(), "Search complete");
    for article in &articles {
        println!("{}", serde_json::to_string(article)?);
    }
    Ok(())
}
