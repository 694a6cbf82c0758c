// ABOUTME: Integration tests for idempotent table provisioning
// ABOUTME: Exercises create/drop/exists against SQLite and the refusal of malformed schemas
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use pierre_datastore::database::{ColumnSpec, DatabaseError, FieldValueMap};

fn tag_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", "INT").primary_key(),
        ColumnSpec::new("name", "VARCHAR(64)").unique(),
        ColumnSpec::new("note", "TEXT").nullable(),
        ColumnSpec::new("weight", "INT").default_value("1"),
    ]
}

#[tokio::test]
async fn test_create_table_is_idempotent() -> Result<()> {
    let handle = common::memory_handle().await?;
    assert!(!handle.table_exists("tags").await?);

    handle.create_table("tags", &tag_columns()).await?;
    handle
        .insert("tags", &FieldValueMap::new().with("name", "rust"))
        .await?;

    // Second run leaves the existing table and its rows alone
    handle.create_table("tags", &tag_columns()).await?;
    assert!(handle.table_exists("tags").await?);

    let row = handle
        .query_row("SELECT note, weight FROM tags WHERE name = ?", &["rust".into()])
        .await?
        .expect("row survives a second create_table");
    assert_eq!(row.get::<Option<String>>("note")?, None);
    assert_eq!(row.get::<i64>("weight")?, 1);

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_drop_table() -> Result<()> {
    let handle = common::memory_handle().await?;
    handle.create_table("tags", &tag_columns()).await?;
    assert!(handle.table_exists("tags").await?);

    handle.drop_table("tags").await?;
    assert!(!handle.table_exists("tags").await?);

    // Dropping a missing table is not an error
    handle.drop_table("tags").await?;

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_schemas_are_refused() -> Result<()> {
    let handle = common::memory_handle().await?;

    let err = handle.create_table("tags", &[]).await.unwrap_err();
    assert!(matches!(err, DatabaseError::EmptyColumns { .. }));

    let err = handle
        .create_table(
            "tags",
            &[
                ColumnSpec::new("name", "TEXT"),
                ColumnSpec::new("name", "TEXT"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateColumn { .. }));

    let err = handle
        .create_table("tags", &[ColumnSpec::new("name", "TEXT; DROP TABLE x")])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidFragment(_)));

    let err = handle
        .create_table("bad name", &[ColumnSpec::new("name", "TEXT")])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidIdentifier(_)));

    assert!(!handle.table_exists("tags").await?);
    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_unique_column_rejects_duplicates() -> Result<()> {
    let handle = common::memory_handle().await?;
    handle.create_table("tags", &tag_columns()).await?;

    let fields = FieldValueMap::new().with("name", "rust");
    handle.insert("tags", &fields).await?;
    let err = handle.insert("tags", &fields).await.unwrap_err();
    assert!(err.is_duplicate());

    handle.close().await;
    Ok(())
}
