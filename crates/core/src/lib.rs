// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for benchmark history.
//!
//! This crate holds everything the store, the regression engine and the
//! wrappers share:
//!
//! - [`entry`] - [`BenchmarkEntry`] and its commit and measurement parts
//! - [`document`] - the persisted root object and its `data.js` form
//! - [`validation`] - the record validator
//! - [`config`] - layered runtime settings
//! - [`logging`] - tracing subscriber setup
//!
//! # Quick Start
//!
//! ```
//! use bench_history_core::validation::validate_entry;
//!
//! let payload = serde_json::json!({
//!     "commit": {
//!         "author": {"email": "a@example.com", "name": "A"},
//!         "committer": {"email": "a@example.com", "name": "A"},
//!         "id": "0123456789abcdef0123456789abcdef01234567",
//!         "message": "bench",
//!         "timestamp": "2024-01-01T00:00:00Z",
//!         "url": "https://example.com/commit/0123456789abcdef0123456789abcdef01234567"
//!     },
//!     "date": 1704067200000u64,
//!     "tool": "customSmallerIsBetter",
//!     "benches": [{"name": "Sent to peers", "value": 12.5, "unit": "KiB"}]
//! });
//!
//! let entry = validate_entry(&payload).unwrap();
//! assert_eq!(entry.bench("Sent to peers").unwrap().value, 12.5);
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod document;
pub mod entry;
pub mod error;
pub mod logging;
pub mod validation;

pub use crate::config::Settings;
pub use crate::document::HistoryDocument;
pub use crate::entry::{Bench, BenchmarkEntry, Commit, CommitUser, Direction, Tool};
pub use crate::error::{Error, Result};
pub use crate::validation::{validate_document, validate_entry, ValidationErrors, Violation, ViolationCode};

/// Current time in epoch milliseconds.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
