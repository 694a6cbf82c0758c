// ABOUTME: Store dialects and the handful of SQL fragments that differ between them
// ABOUTME: MySQL is the reference store; SQLite backs embedded use and the test-suite
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

/// Integer column types, with an optional display width and `UNSIGNED`
static INTEGER_TYPE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(INT|INTEGER|BIGINT|SMALLINT|TINYINT|MEDIUMINT)\s*(\(\s*\d+\s*\))?(\s+UNSIGNED)?\s*$",
    )
    .ok()
});

/// SQL dialect spoken by the connected store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// Embedded `SQLite`
    Sqlite,
    /// `MySQL` 5.7+/8.x
    MySql,
}

impl Dialect {
    /// Column definition for an auto-increment primary key
    ///
    /// `SQLite` only auto-increments a rowid alias, which must be declared
    /// exactly `INTEGER PRIMARY KEY`; any integer key type is mapped onto it.
    #[must_use]
    pub fn primary_key_definition(self, name: &str, sql_type: &str) -> String {
        match self {
            Self::MySql => format!("{name} {sql_type} AUTO_INCREMENT PRIMARY KEY"),
            Self::Sqlite if is_integer_type(sql_type) => {
                format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT")
            }
            Self::Sqlite => format!("{name} {sql_type} PRIMARY KEY"),
        }
    }

    /// Catalog query counting tables with the bound name in the current schema
    #[must_use]
    pub const fn table_exists_sql(self) -> &'static str {
        match self {
            Self::MySql => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
            Self::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        }
    }

    /// Predicate testing whether the JSON array in `column` contains the bound value
    #[must_use]
    pub fn json_array_contains(self, column: &str) -> String {
        match self {
            Self::MySql => format!("JSON_CONTAINS({column}, JSON_ARRAY(?))"),
            Self::Sqlite => {
                format!("EXISTS (SELECT 1 FROM json_each({column}) WHERE json_each.value = ?)")
            }
        }
    }

    /// Human-readable backend name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::MySql => "MySQL",
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_integer_type(sql_type: &str) -> bool {
    INTEGER_TYPE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(sql_type))
}
