// ABOUTME: Allow-list validation for table/column names and verbatim DDL fragments
// ABOUTME: Identifiers are interpolated into SQL text, so anything outside the pattern is refused
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Identifier guard
//!
//! Table names, column names and column types cannot be bound as statement
//! parameters. They must come from code-controlled strings; this module
//! refuses anything that does not look like one.

use super::errors::{DatabaseError, DatabaseResult};
use crate::constants::limits::MAX_IDENTIFIER_LEN;
use regex::Regex;
use std::sync::LazyLock;

/// Letters, digits and underscore, not starting with a digit
static IDENTIFIER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Character sequences that would end a statement or start a comment
const FORBIDDEN_FRAGMENT_SEQUENCES: &[&str] = &[";", "--", "/*"];

/// Validate a table or column name
///
/// # Errors
///
/// Returns [`DatabaseError::InvalidIdentifier`] if the name is empty, longer
/// than the store's identifier limit, or outside `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> DatabaseResult<()> {
    let matches = IDENTIFIER_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name));
    if matches && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_owned()))
    }
}

/// Validate every name in a list
///
/// # Errors
///
/// Returns the first [`DatabaseError::InvalidIdentifier`] encountered
pub fn validate_identifiers<'a, I>(names: I) -> DatabaseResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().try_for_each(validate_identifier)
}

/// Validate a column type or default expression that is copied verbatim
///
/// # Errors
///
/// Returns [`DatabaseError::InvalidFragment`] if the fragment is blank or
/// carries a statement separator or comment marker.
pub fn validate_fragment(fragment: &str) -> DatabaseResult<()> {
    let blank = fragment.trim().is_empty();
    let forbidden = FORBIDDEN_FRAGMENT_SEQUENCES
        .iter()
        .any(|sequence| fragment.contains(sequence));
    if blank || forbidden {
        Err(DatabaseError::InvalidFragment(fragment.to_owned()))
    } else {
        Ok(())
    }
}
