// ABOUTME: Tests for row cursor lifetime and pooled connection release
// ABOUTME: Verifies that open cursors hold a connection until drained, closed or dropped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use pierre_datastore::database::{ColumnSpec, ConnectionHandle, DatabaseError, FieldValueMap, Operation};
use std::time::Duration;
use tokio::time::timeout;

const BLOCKED: Duration = Duration::from_millis(200);

async fn seeded(rows: i64) -> Result<ConnectionHandle> {
    let handle = common::memory_handle().await?;
    handle
        .create_table(
            "items",
            &[
                ColumnSpec::new("id", "INT").primary_key(),
                ColumnSpec::new("label", "TEXT"),
            ],
        )
        .await?;
    for n in 0..rows {
        handle
            .insert("items", &FieldValueMap::new().with("label", format!("item-{n}")))
            .await?;
    }
    Ok(handle)
}

async fn pool_is_free(handle: &ConnectionHandle) -> bool {
    timeout(BLOCKED, handle.query_row("SELECT 1 AS one", &[]))
        .await
        .is_ok()
}

#[tokio::test]
async fn test_undrained_cursor_holds_its_connection() -> Result<()> {
    let handle = seeded(3).await?;

    let mut cursor = handle
        .select("items", &[], &FieldValueMap::new())
        .await?;
    assert!(cursor.is_open());
    assert!(cursor.next_row().await?.is_some());

    // The only connection belongs to the cursor
    assert!(!pool_is_free(&handle).await);

    drop(cursor);
    assert!(pool_is_free(&handle).await);

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_close_and_drain_release_the_connection() -> Result<()> {
    let handle = seeded(3).await?;

    let cursor = handle.query("SELECT * FROM items", &[]).await?;
    cursor.close();
    assert!(pool_is_free(&handle).await);

    let mut cursor = handle.query("SELECT label FROM items ORDER BY id", &[]).await?;
    let mut labels = Vec::new();
    while let Some(row) = cursor.next_row().await? {
        labels.push(row.get::<String>("label")?);
    }
    assert_eq!(labels, ["item-0", "item-1", "item-2"]);
    assert!(!cursor.is_open());
    assert!(pool_is_free(&handle).await);
    assert!(cursor.next_row().await?.is_none());

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_empty_result_releases_immediately() -> Result<()> {
    let handle = seeded(0).await?;

    let cursor = handle
        .select("items", &[], &FieldValueMap::new().with("id", 1))
        .await?;
    assert!(!cursor.is_open());
    assert!(pool_is_free(&handle).await);
    assert!(cursor.collect_rows().await?.is_empty());

    assert!(handle
        .query_row("SELECT * FROM items WHERE id = ?", &[1.into()])
        .await?
        .is_none());

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_statement_errors_surface_when_opening() -> Result<()> {
    let handle = seeded(1).await?;

    let err = handle
        .query("SELECT missing_column FROM items", &[])
        .await
        .err()
        .expect("bad column is reported by query");
    assert_eq!(err.operation(), Some(Operation::Query));
    assert!(pool_is_free(&handle).await);

    let err = handle
        .select("nowhere", &[], &FieldValueMap::new())
        .await
        .err()
        .expect("missing table is reported by select");
    assert!(matches!(
        err,
        DatabaseError::Store {
            operation: Operation::Select,
            ..
        }
    ));

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_decode_errors_name_the_column() -> Result<()> {
    let handle = seeded(1).await?;
    let row = handle
        .query_row("SELECT label FROM items", &[])
        .await?
        .unwrap();

    assert!(matches!(
        row.get::<String>("nope"),
        Err(DatabaseError::Decode { ref column, .. }) if column == "nope"
    ));
    assert!(matches!(
        row.get_at::<String>(5),
        Err(DatabaseError::Decode { ref column, .. }) if column == "#5"
    ));
    assert_eq!(
        format!("{row:?}"),
        r#"StoreRow { backend: "SQLite", columns: 1 }"#
    );

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_close_waits_for_open_cursor() -> Result<()> {
    let handle = seeded(3).await?;
    let cursor = handle.query("SELECT * FROM items", &[]).await?;
    assert!(cursor.is_open());

    let mut closing = tokio::spawn({
        let handle = handle.clone();
        async move { handle.close().await }
    });
    assert!(timeout(BLOCKED, &mut closing).await.is_err());

    drop(cursor);
    timeout(Duration::from_secs(5), closing).await??;
    assert!(handle.is_closed());
    Ok(())
}
