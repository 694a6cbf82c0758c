// ABOUTME: Constants module with domain-separated organization for the datastore
// ABOUTME: Pool defaults, identifier limits, index naming, and vendor error markers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Pure data constants grouped by the concern that consumes them.

/// Connection pool defaults
pub mod pool {
    /// Maximum simultaneously open connections
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;
    /// Connections kept warm even when idle
    pub const DEFAULT_MIN_CONNECTIONS: u32 = 0;
    /// Idle connections above the minimum are reaped after this many seconds
    pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
    /// Maximum lifetime of a pooled connection in seconds
    pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 300;
    /// Wait ceiling used when no acquire timeout is configured (one year)
    pub const UNBOUNDED_ACQUIRE_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;
}

/// Network ports
pub mod ports {
    /// Default `MySQL` port
    pub const DEFAULT_MYSQL_PORT: u16 = 3306;
}

/// Limits applied to caller-supplied SQL text
pub mod limits {
    /// Longest accepted table or column identifier (the `MySQL` ceiling)
    pub const MAX_IDENTIFIER_LEN: usize = 64;
}

/// Naming of store objects created by the layer
pub mod naming {
    /// Prefix of the per-table full-text index
    pub const FULLTEXT_INDEX_PREFIX: &str = "idx_fulltext_";
    /// Tokenizer used by the `MySQL` full-text index
    pub const MYSQL_NGRAM_PARSER: &str = "ngram";
    /// Tokenizer used by the `SQLite` FTS5 table
    pub const SQLITE_TRIGRAM_TOKENIZER: &str = "trigram";
}

/// Vendor signatures recognized in store errors
pub mod markers {
    /// `MySQL` `ER_DUP_ENTRY`
    pub const MYSQL_DUPLICATE_ENTRY_CODE: u16 = 1062;
    /// `MySQL` `ER_DUP_KEYNAME`
    pub const MYSQL_DUPLICATE_KEY_NAME_CODE: u16 = 1061;
    /// Textual unique-violation signatures, matched case-sensitively
    pub const UNIQUE_VIOLATION_MARKERS: &[&str] = &[
        "Error 1062",
        "Duplicate entry",
        "UNIQUE constraint failed",
    ];
    /// Textual signatures of "object already exists" DDL failures
    pub const DUPLICATE_OBJECT_MARKERS: &[&str] =
        &["Error 1061", "Duplicate key name", "already exists"];
}

/// Service names for structured logging
pub mod service_names {
    /// Datastore service name
    pub const PIERRE_DATASTORE: &str = "pierre-datastore";
}
