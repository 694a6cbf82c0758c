// ABOUTME: Tagged SQL values and the sorted field/value map used for payloads and filters
// ABOUTME: Key ordering is lexicographic so rendered SQL never depends on caller insertion order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};

/// A single bindable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    /// Signed 64-bit integer
    Integer(i64),
    /// UTF-8 text
    Text(String),
    /// Boolean (stored as TINYINT/INTEGER by both stores)
    Boolean(bool),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// JSON document, bound as its compact text rendering
    Json(Value),
    /// SQL NULL
    Null,
}

impl SqlValue {
    /// Whether this is SQL NULL
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Serialize any value into a JSON variant
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Field name to value mapping used for insert payloads, update payloads and
/// equality filters
///
/// Keys are unique and always iterated in ascending byte order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValueMap(BTreeMap<String, SqlValue>);

impl FieldValueMap {
    /// Create an empty map
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> Option<SqlValue> {
        self.0.insert(field.into(), value.into())
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.0.get(field)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Values in field-name order
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.0.values()
    }

    /// Field/value pairs in sorted order
    pub fn iter(&self) -> btree_map::Iter<'_, String, SqlValue> {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldValueMap
where
    K: Into<String>,
    V: Into<SqlValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a FieldValueMap {
    type Item = (&'a String, &'a SqlValue);
    type IntoIter = btree_map::Iter<'a, String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
