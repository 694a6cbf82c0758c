// ABOUTME: Core types and constants for the Pierre relational datastore layer
// ABOUTME: Foundation crate with application error handling and store constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Datastore Core
//!
//! Foundation crate providing the application error type and the constants
//! shared by the datastore library and its command-line tooling. It carries
//! no database driver so that callers can depend on the error vocabulary
//! without pulling in `sqlx`.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Pool defaults, identifier limits, and vendor error markers

/// Unified error handling system with standard error codes
pub mod errors;

/// Store constants organized by domain
pub mod constants;
