// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! A [`HistoryStore`] that persists every change through a backend.

use crate::backend::HistoryBackend;
use crate::error::{Result, StoreError};
use crate::store::{AppendOutcome, HistoryStore};
use bench_history_core::{now_millis, BenchmarkEntry, HistoryDocument};
use parking_lot::Mutex;
use tracing::{error, info};

/// History store persisted after each append.
///
/// Appends and saves are serialized by a writer mutex; queries go straight to
/// the in-memory store and never wait on I/O.
///
/// An entry becomes visible to readers only after the document containing
/// it has been saved. When a save fails the store is left unchanged and the
/// error is returned, so callers can simply retry with backoff.
pub struct FileBackedStore {
    store: HistoryStore,
    backend: Box<dyn HistoryBackend>,
    writer: Mutex<()>,
}

impl FileBackedStore {
    /// Load the history from `backend`, or start an empty one for `repo_url`
    /// when nothing has been persisted yet.
    pub fn open(backend: Box<dyn HistoryBackend>, repo_url: &str) -> Result<Self> {
        let location = backend.describe();
        let loaded = backend.load().map_err(|source| StoreError::Load {
            location: location.clone(),
            source,
        })?;

        let store = match loaded {
            Some(document) => HistoryStore::from_document(document)?,
            None => {
                info!(location = %location, "No history found, starting empty");
                HistoryStore::new(repo_url)
            }
        };
        info!(
            location = %location,
            suites = store.suites().len(),
            entries = store.total_len(),
            "History opened"
        );

        Ok(Self {
            store,
            backend,
            writer: Mutex::new(()),
        })
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Where the history is persisted.
    pub fn location(&self) -> String {
        self.backend.describe()
    }

    /// Persist the document with `entry` appended, then append it in memory.
    ///
    /// Duplicates and out-of-order entries are answered without touching the
    /// backend.
    pub fn append(&self, suite: &str, entry: BenchmarkEntry) -> Result<AppendOutcome> {
        let _writer = self.writer.lock();
        if let Some(outcome) = self.store.preview_append(suite, &entry)? {
            return Ok(outcome);
        }

        let mut document = self.store.to_document();
        document.last_update = document.last_update.max(now_millis());
        document
            .entries
            .entry(suite.to_string())
            .or_default()
            .push(entry.clone());
        self.persist(suite, "append", &document)?;

        // Appends go through the writer lock, so the preview still holds.
        self.store.append(suite, entry)
    }

    /// Persist the current state without appending.
    pub fn flush(&self) -> Result<()> {
        let _writer = self.writer.lock();
        self.persist("*", "flush", &self.store.to_document())
    }

    fn persist(&self, suite: &str, operation: &'static str, document: &HistoryDocument) -> Result<()> {
        self.backend
            .save(document)
            .map_err(|source| {
                error!(suite = %suite, operation, error = %source, "Failed to persist history");
                StoreError::Storage {
                    suite: suite.to_string(),
                    operation,
                    source,
                }
            })
    }
}

impl std::fmt::Debug for FileBackedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackedStore")
            .field("location", &self.backend.describe())
            .field("store", &self.store)
            .finish()
    }
}
