// ABOUTME: Tests for duplicate-key classification of store errors
// ABOUTME: Uses real SQLite constraint failures alongside wrapped and absent errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use pierre_datastore::database::{
    is_duplicate_error, ColumnSpec, DatabaseError, FieldValueMap, Operation,
};
use pierre_datastore::errors::{AppError, ErrorCode};

#[test]
fn test_absent_error_is_not_duplicate() {
    assert!(!is_duplicate_error(None::<&DatabaseError>));
    assert!(!is_duplicate_error(None::<&AppError>));
}

#[tokio::test]
async fn test_unique_violation_is_duplicate_through_every_layer() -> Result<()> {
    let handle = common::memory_handle().await?;
    handle
        .create_table(
            "users",
            &[
                ColumnSpec::new("id", "INT").primary_key(),
                ColumnSpec::new("email", "VARCHAR(255)").unique(),
            ],
        )
        .await?;

    let fields = FieldValueMap::new().with("email", "bob@example.com");
    handle.insert("users", &fields).await?;
    let err = handle.insert("users", &fields).await.unwrap_err();

    assert_eq!(err.operation(), Some(Operation::Insert));
    assert!(err.is_duplicate());
    assert!(is_duplicate_error(Some(&err)));

    // Still recognized once wrapped in the application error
    let app: AppError = err.into();
    assert_eq!(app.code, ErrorCode::ResourceAlreadyExists);
    assert!(is_duplicate_error(Some(&app)));

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_other_constraint_failures_are_not_duplicates() -> Result<()> {
    let handle = common::memory_handle().await?;
    handle
        .create_table(
            "users",
            &[
                ColumnSpec::new("id", "INT").primary_key(),
                ColumnSpec::new("email", "VARCHAR(255)"),
            ],
        )
        .await?;

    // email is NOT NULL
    let err = handle
        .insert("users", &FieldValueMap::new().with("id", 7))
        .await
        .unwrap_err();
    assert!(!err.is_duplicate());

    let app: AppError = err.into();
    assert_eq!(app.code, ErrorCode::DatabaseError);

    let err = handle.exec("SELEC 1", &[]).await.unwrap_err();
    assert!(!is_duplicate_error(Some(&err)));

    handle.close().await;
    Ok(())
}
