// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the storage crate.

use std::io;
use thiserror::Error;

/// Failure of the persistence medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the medium failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted document could not be decoded or encoded.
    #[error("Document error: {0}")]
    Document(#[from] bench_history_core::Error),
}

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entry is dated before the latest entry of its suite.
    #[error("Entry for suite `{suite}` dated {date} precedes the latest recorded date {latest}")]
    OutOfOrder {
        /// Suite name.
        suite: String,
        /// Date of the rejected entry.
        date: u64,
        /// Date of the suite's latest entry.
        latest: u64,
    },

    /// Persisting a change failed; the caller should retry with backoff.
    #[error("Storage failure during {operation} of suite `{suite}`: {source}")]
    Storage {
        /// Suite the operation targeted.
        suite: String,
        /// Operation name.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: StorageError,
    },

    /// Loading the persisted history failed.
    #[error("Failed to load history from {location}: {source}")]
    Load {
        /// Backend description.
        location: String,
        /// Underlying failure.
        #[source]
        source: StorageError,
    },
}

impl StoreError {
    /// Whether the failure lies in the persistence layer rather than the input.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Load { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
