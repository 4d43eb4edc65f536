// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory history store.
//!
//! Entries are partitioned by suite. Each suite is an append-only log behind
//! its own reader/writer lock, so one writer per suite can append while any
//! number of readers query. A reader never observes a partially written
//! entry: entries are pushed as complete `Arc`s under the write lock.
//!
//! Because logs only ever grow and are ordered by date, a range query can
//! fix its index bounds once and hand out a lazy, restartable view.

use crate::error::{Result, StoreError};
use bench_history_core::{now_millis, BenchmarkEntry, HistoryDocument};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

type SuiteLog = Arc<RwLock<Vec<Arc<BenchmarkEntry>>>>;

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppendOutcome {
    /// The entry was added at `index`.
    Appended {
        /// Position within the suite.
        index: usize,
    },
    /// The suite already ends with this exact record; nothing was added.
    DuplicateExactRecord {
        /// Position of the existing record.
        index: usize,
    },
}

impl AppendOutcome {
    /// Position of the entry within its suite.
    pub fn index(&self) -> usize {
        match self {
            Self::Appended { index } | Self::DuplicateExactRecord { index } => *index,
        }
    }

    /// Whether the append was acknowledged as a re-post.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateExactRecord { .. })
    }
}

/// Append-only benchmark history, keyed by suite.
#[derive(Debug, Default)]
pub struct HistoryStore {
    repo_url: String,
    last_update: AtomicU64,
    suites: DashMap<String, SuiteLog>,
}

impl HistoryStore {
    /// An empty store for the given repository.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            last_update: AtomicU64::new(0),
            suites: DashMap::new(),
        }
    }

    /// Restore a store from a persisted document.
    ///
    /// Entries are restored verbatim, including adjacent identical records;
    /// only the date ordering of each suite is enforced.
    pub fn from_document(document: HistoryDocument) -> Result<Self> {
        let store = Self::new(document.repo_url);
        store.last_update.store(document.last_update, Ordering::Relaxed);

        for (suite, entries) in document.entries {
            let mut log = Vec::with_capacity(entries.len());
            let mut latest = 0;
            for entry in entries {
                if entry.date < latest {
                    return Err(StoreError::OutOfOrder {
                        suite,
                        date: entry.date,
                        latest,
                    });
                }
                latest = entry.date;
                log.push(Arc::new(entry));
            }
            debug!(suite = %suite, entries = log.len(), "Suite restored");
            store.suites.insert(suite, Arc::new(RwLock::new(log)));
        }
        Ok(store)
    }

    /// Snapshot the store as a persistable document.
    pub fn to_document(&self) -> HistoryDocument {
        let mut document = HistoryDocument::new(self.repo_url.clone());
        document.last_update = self.last_update();
        for suite in self.suites.iter() {
            let entries = suite
                .value()
                .read()
                .iter()
                .map(|entry| BenchmarkEntry::clone(entry))
                .collect();
            document.entries.insert(suite.key().clone(), entries);
        }
        document
    }

    /// Repository the history belongs to.
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Epoch milliseconds of the last successful append.
    pub fn last_update(&self) -> u64 {
        self.last_update.load(Ordering::Relaxed)
    }

    /// Append a validated entry to the end of a suite.
    ///
    /// Re-posting the record the suite already ends with (same commit id,
    /// date and measurements) is acknowledged as
    /// [`AppendOutcome::DuplicateExactRecord`] without adding anything.
    /// Re-runs of the same commit with other values are new samples.
    pub fn append(&self, suite: &str, entry: BenchmarkEntry) -> Result<AppendOutcome> {
        let log = self.log_for_write(suite);
        let mut entries = log.write();

        if let Some(outcome) = check_tail(suite, &entries, &entry)? {
            return Ok(outcome);
        }

        let date = entry.date;
        let commit = entry.commit.short_id().to_string();
        entries.push(Arc::new(entry));
        let index = entries.len() - 1;
        drop(entries);

        self.last_update.fetch_max(now_millis(), Ordering::Relaxed);
        info!(suite = %suite, index, date, commit = %commit, "Entry appended");
        Ok(AppendOutcome::Appended { index })
    }

    /// Entries with `from <= date <= to`, ascending by date.
    ///
    /// The returned range is fixed at call time and can be iterated any
    /// number of times; entries appended later are not included.
    pub fn query_range(&self, suite: &str, from: u64, to: u64) -> EntryRange {
        let Some(log) = self.log(suite) else {
            return EntryRange::empty();
        };
        let entries = log.read();
        let start = entries.partition_point(|e| e.date < from);
        let end = entries.partition_point(|e| e.date <= to).max(start);
        drop(entries);
        EntryRange {
            log: Some(log),
            start,
            end,
        }
    }

    /// All entries recorded for a commit, in insertion order.
    pub fn query_by_commit(&self, suite: &str, commit_id: &str) -> Vec<Arc<BenchmarkEntry>> {
        self.log(suite)
            .map(|log| {
                log.read()
                    .iter()
                    .filter(|e| e.commit.id.eq_ignore_ascii_case(commit_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The most recent `n` entries (fewer if the suite is shorter), oldest first.
    pub fn latest(&self, suite: &str, n: usize) -> Vec<Arc<BenchmarkEntry>> {
        self.log(suite)
            .map(|log| {
                let entries = log.read();
                entries[entries.len().saturating_sub(n)..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Suite names, sorted.
    pub fn suites(&self) -> Vec<String> {
        let mut names: Vec<String> = self.suites.iter().map(|s| s.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of entries in a suite; zero for unknown suites.
    pub fn len(&self, suite: &str) -> usize {
        self.log(suite).map_or(0, |log| log.read().len())
    }

    /// Number of entries across all suites.
    pub fn total_len(&self) -> usize {
        self.suites.iter().map(|s| s.value().read().len()).sum()
    }

    /// Whether the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// What [`append`](Self::append) would do with `entry`: `Some` for a
    /// duplicate, `None` when it would be appended. Changes nothing.
    pub(crate) fn preview_append(&self, suite: &str, entry: &BenchmarkEntry) -> Result<Option<AppendOutcome>> {
        match self.log(suite) {
            Some(log) => check_tail(suite, &log.read(), entry),
            None => Ok(None),
        }
    }

    fn log(&self, suite: &str) -> Option<SuiteLog> {
        self.suites.get(suite).map(|log| Arc::clone(log.value()))
    }

    fn log_for_write(&self, suite: &str) -> SuiteLog {
        if let Some(log) = self.log(suite) {
            return log;
        }
        Arc::clone(self.suites.entry(suite.to_string()).or_default().value())
    }
}

fn check_tail(suite: &str, entries: &[Arc<BenchmarkEntry>], entry: &BenchmarkEntry) -> Result<Option<AppendOutcome>> {
    let Some(tail) = entries.last() else {
        return Ok(None);
    };
    if tail.is_same_record(entry) {
        let index = entries.len() - 1;
        debug!(suite = %suite, index, commit = %entry.commit.id, "Duplicate record acknowledged");
        return Ok(Some(AppendOutcome::DuplicateExactRecord { index }));
    }
    if entry.date < tail.date {
        return Err(StoreError::OutOfOrder {
            suite: suite.to_string(),
            date: entry.date,
            latest: tail.date,
        });
    }
    Ok(None)
}

/// A date-bounded view over one suite.
#[derive(Debug, Clone)]
pub struct EntryRange {
    log: Option<SuiteLog>,
    start: usize,
    end: usize,
}

impl EntryRange {
    fn empty() -> Self {
        Self {
            log: None,
            start: 0,
            end: 0,
        }
    }

    /// Number of entries in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Iterate the range lazily.
    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter {
            range: self,
            next: self.start,
        }
    }

    /// Collect the range under a single read lock.
    pub fn to_vec(&self) -> Vec<Arc<BenchmarkEntry>> {
        match &self.log {
            Some(log) => log.read()[self.start..self.end].to_vec(),
            None => Vec::new(),
        }
    }
}

impl<'a> IntoIterator for &'a EntryRange {
    type Item = Arc<BenchmarkEntry>;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over an [`EntryRange`].
#[derive(Debug)]
pub struct RangeIter<'a> {
    range: &'a EntryRange,
    next: usize,
}

impl Iterator for RangeIter<'_> {
    type Item = Arc<BenchmarkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.range.end {
            return None;
        }
        let entry = self.range.log.as_ref()?.read().get(self.next).cloned();
        self.next += 1;
        entry
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.range.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RangeIter<'_> {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bench_history_core::{Bench, Commit, CommitUser, Tool};
    use std::collections::BTreeMap;

    pub(crate) fn entry(commit_id: &str, date: u64, value: f64) -> BenchmarkEntry {
        let user = CommitUser {
            email: "dev@example.com".to_string(),
            name: "Dev".to_string(),
            username: Some("dev".to_string()),
        };
        BenchmarkEntry {
            commit: Commit {
                author: user.clone(),
                committer: user,
                distinct: None,
                id: commit_id.to_string(),
                message: "bench".to_string(),
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                tree_id: None,
                url: format!("https://example.com/commit/{commit_id}"),
                extra: BTreeMap::new(),
            },
            date,
            tool: Tool::CustomSmallerIsBetter,
            benches: vec![Bench::new("x", value, "KiB")],
        }
    }

    pub(crate) fn id(n: u8) -> String {
        format!("{:040x}", n)
    }

    #[test]
    fn test_append_then_query_by_commit() {
        let store = HistoryStore::new("https://github.com/example/project");
        let e = entry(&id(1), 100, 10.0);
        let outcome = store.append("bench-A", e.clone()).unwrap();
        assert_eq!(outcome, AppendOutcome::Appended { index: 0 });

        let found = store.query_by_commit("bench-A", &id(1));
        assert_eq!(found.len(), 1);
        assert_eq!(*found[0], e);
        assert!(store.last_update() > 0);
    }

    #[test]
    fn test_same_commit_reruns_are_distinct_samples() {
        let store = HistoryStore::default();
        store.append("bench-A", entry(&id(1), 100, 10.0)).unwrap();
        store.append("bench-A", entry(&id(2), 150, 11.0)).unwrap();
        store.append("bench-A", entry(&id(1), 200, 12.0)).unwrap();
        store.append("bench-A", entry(&id(1), 200, 13.0)).unwrap();

        let found = store.query_by_commit("bench-A", &id(1));
        let values: Vec<f64> = found.iter().map(|e| e.benches[0].value).collect();
        assert_eq!(values, vec![10.0, 12.0, 13.0]);
    }

    #[test]
    fn test_identical_repost_is_acknowledged() {
        let store = HistoryStore::default();
        store.append("bench-A", entry(&id(1), 100, 10.0)).unwrap();
        let outcome = store.append("bench-A", entry(&id(1), 100, 10.0)).unwrap();
        assert_eq!(outcome, AppendOutcome::DuplicateExactRecord { index: 0 });
        assert!(outcome.is_duplicate());
        assert_eq!(store.len("bench-A"), 1);
    }

    #[test]
    fn test_identical_record_not_at_tail_is_kept() {
        let store = HistoryStore::default();
        store.append("bench-A", entry(&id(1), 100, 10.0)).unwrap();
        store.append("bench-A", entry(&id(2), 100, 10.0)).unwrap();
        let outcome = store.append("bench-A", entry(&id(1), 100, 10.0)).unwrap();
        assert_eq!(outcome, AppendOutcome::Appended { index: 2 });
    }

    #[test]
    fn test_out_of_order_append_is_rejected() {
        let store = HistoryStore::default();
        store.append("bench-A", entry(&id(1), 200, 10.0)).unwrap();
        let err = store.append("bench-A", entry(&id(2), 100, 10.0)).unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrder { date: 100, latest: 200, .. }));
        assert!(!err.is_storage());

        // Equal dates are allowed.
        store.append("bench-A", entry(&id(3), 200, 11.0)).unwrap();
        assert_eq!(store.len("bench-A"), 2);
    }

    #[test]
    fn test_query_range_is_inclusive_ordered_and_restartable() {
        let store = HistoryStore::default();
        for (i, date) in [100, 200, 200, 300, 400].into_iter().enumerate() {
            store.append("bench-A", entry(&id(i as u8), date, i as f64)).unwrap();
        }

        let range = store.query_range("bench-A", 200, 300);
        assert_eq!(range.len(), 3);
        let first: Vec<u64> = range.iter().map(|e| e.date).collect();
        assert_eq!(first, vec![200, 200, 300]);
        assert!(first.windows(2).all(|w| w[0] <= w[1]));

        let second: Vec<u64> = (&range).into_iter().map(|e| e.date).collect();
        assert_eq!(first, second);
        assert_eq!(range.to_vec().len(), 3);

        store.append("bench-A", entry(&id(9), 450, 9.0)).unwrap();
        assert_eq!(range.iter().count(), 3);
        assert_eq!(store.query_range("bench-A", 200, 450).len(), 5);
    }

    #[test]
    fn test_query_range_edges() {
        let store = HistoryStore::default();
        store.append("bench-A", entry(&id(1), 100, 1.0)).unwrap();
        assert!(store.query_range("bench-A", 300, 200).is_empty());
        assert!(store.query_range("bench-A", 101, 200).is_empty());
        assert_eq!(store.query_range("bench-A", 0, u64::MAX).len(), 1);
        assert!(store.query_range("unknown", 0, u64::MAX).is_empty());
        assert_eq!(store.query_range("unknown", 0, u64::MAX).iter().count(), 0);
    }

    #[test]
    fn test_latest() {
        let store = HistoryStore::default();
        for i in 0..5u8 {
            store.append("bench-A", entry(&id(i), 100 * u64::from(i), f64::from(i))).unwrap();
        }
        let latest: Vec<u64> = store.latest("bench-A", 2).iter().map(|e| e.date).collect();
        assert_eq!(latest, vec![300, 400]);
        assert_eq!(store.latest("bench-A", 50).len(), 5);
        assert!(store.latest("bench-A", 0).is_empty());
        assert!(store.latest("unknown", 3).is_empty());
    }

    #[test]
    fn test_unknown_suite_is_empty_not_an_error() {
        let store = HistoryStore::default();
        assert!(store.query_by_commit("missing", &id(1)).is_empty());
        assert_eq!(store.len("missing"), 0);
        assert!(store.is_empty());
        assert!(store.suites().is_empty());
    }

    #[test]
    fn test_document_round_trip_keeps_adjacent_duplicates() {
        let mut document = HistoryDocument::new("https://github.com/example/project");
        document.last_update = 42;
        document.entries.insert(
            "bench-A".to_string(),
            vec![entry(&id(1), 100, 10.0), entry(&id(1), 100, 10.0)],
        );
        document
            .entries
            .insert("bench-B".to_string(), vec![entry(&id(2), 50, 1.0)]);

        let store = HistoryStore::from_document(document.clone()).unwrap();
        assert_eq!(store.len("bench-A"), 2);
        assert_eq!(store.suites(), vec!["bench-A".to_string(), "bench-B".to_string()]);
        assert_eq!(store.to_document(), document);
    }

    #[test]
    fn test_from_document_rejects_unordered_suite() {
        let mut document = HistoryDocument::new("r");
        document.entries.insert(
            "bench-A".to_string(),
            vec![entry(&id(1), 200, 10.0), entry(&id(2), 100, 10.0)],
        );
        assert!(matches!(
            HistoryStore::from_document(document),
            Err(StoreError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let store = HistoryStore::default();
        std::thread::scope(|scope| {
            for w in 0..4u8 {
                let store = &store;
                scope.spawn(move || {
                    let suite = format!("suite-{}", w % 2);
                    for i in 0..50u64 {
                        // Dates only need to be non-decreasing per suite; use a
                        // shared date so interleaved writers never go backwards.
                        store.append(&suite, entry(&id(w), 1_000, i as f64)).unwrap();
                    }
                });
            }
            for _ in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..50 {
                        let range = store.query_range("suite-0", 0, u64::MAX);
                        assert_eq!(range.iter().count(), range.len());
                    }
                });
            }
        });
        assert_eq!(store.total_len(), 200);
        assert_eq!(store.len("suite-0"), 100);
    }
}
