// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only benchmark history storage.
//!
//! - [`store`] - the in-memory [`HistoryStore`], partitioned by suite
//! - [`backend`] - the [`HistoryBackend`] persistence seam and its file and
//!   in-memory implementations
//! - [`file_backed`] - [`FileBackedStore`], a store persisted after each append
//!
//! # Example
//!
//! ```
//! use bench_history_storage::{FileBackedStore, InMemoryBackend};
//!
//! let store = FileBackedStore::open(Box::new(InMemoryBackend::new()), "https://github.com/org/repo")?;
//! assert!(store.store().latest("statement-distribution-regression-bench", 10).is_empty());
//! # Ok::<(), bench_history_storage::StoreError>(())
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod file_backed;
pub mod store;

pub use backend::{FileFormat, HistoryBackend, InMemoryBackend, JsonFileBackend};
pub use error::{Result, StorageError, StoreError};
pub use file_backed::FileBackedStore;
pub use store::{AppendOutcome, EntryRange, HistoryStore, RangeIter};
