// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Regression detection over recent history.
//!
//! The engine reads the most recent entries of a suite, summarizes one
//! measurement over that window and compares a candidate value against it.
//! A value is a regression when it lies more than `threshold_stddevs`
//! standard deviations from the window mean. Windows without spread never
//! flag, so perfectly stable metrics produce no false positives.
//!
//! # Example
//!
//! ```
//! use bench_history_analysis::RegressionEngine;
//! use bench_history_storage::HistoryStore;
//!
//! let store = HistoryStore::new("https://github.com/org/repo");
//! let engine = RegressionEngine::new(&store);
//! let stats = engine.stats_for("statement-distribution-regression-bench", "Sent to peers", 10);
//! assert_eq!(stats.sample_count, 0);
//! ```

use crate::stats::WindowStats;
use bench_history_core::{BenchmarkEntry, Direction};
use bench_history_storage::HistoryStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Direction of a value relative to the window mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Moved in the direction the tool considers worse.
    Worse,
    /// Moved in the direction the tool considers better.
    Better,
    /// Equal to the mean, or no history to compare with.
    Unchanged,
}

impl Trend {
    fn of(value: f64, stats: &WindowStats, direction: Direction) -> Self {
        if !stats.has_data() || value == stats.mean {
            return Self::Unchanged;
        }
        let increased = value > stats.mean;
        match (direction, increased) {
            (Direction::SmallerIsBetter, true) | (Direction::BiggerIsBetter, false) => Self::Worse,
            _ => Self::Better,
        }
    }
}

/// How far a flagged value lies from the window mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Not a regression.
    None,
    /// Up to 2 standard deviations.
    Low,
    /// Up to 3 standard deviations.
    Medium,
    /// Up to 5 standard deviations.
    High,
    /// More than 5 standard deviations.
    Critical,
}

impl Severity {
    /// Grade a deviation expressed in standard deviations.
    pub fn from_sigma(sigma: f64) -> Self {
        let sigma = sigma.abs();
        if sigma > 5.0 {
            Self::Critical
        } else if sigma > 3.0 {
            Self::High
        } else if sigma > 2.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// Outcome of comparing one measurement of a candidate entry with history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionCheck {
    /// Measurement name.
    pub bench: String,
    /// Candidate value.
    pub value: f64,
    /// Unit of the candidate value.
    pub unit: String,
    /// Commit of the candidate entry.
    pub commit_id: String,
    /// Statistics of the comparison window.
    pub stats: WindowStats,
    /// Signed distance from the mean in standard deviations.
    pub deviation_sigma: Option<f64>,
    /// Comparison semantics of the entry's tool.
    pub direction: Direction,
    /// Whether the value moved in the better or worse direction.
    pub trend: Trend,
    /// Severity grade; [`Severity::None`] unless flagged.
    pub severity: Severity,
    /// Whether the deviation exceeds the threshold.
    pub is_regression: bool,
}

/// Statistics and regression queries over a [`HistoryStore`].
#[derive(Debug, Clone, Copy)]
pub struct RegressionEngine<'a> {
    store: &'a HistoryStore,
}

impl<'a> RegressionEngine<'a> {
    /// Engine reading from `store`.
    pub fn new(store: &'a HistoryStore) -> Self {
        Self { store }
    }

    /// Statistics of `bench` over the most recent `window_size` entries.
    ///
    /// Entries without that measurement are skipped rather than counted as
    /// zero, so `sample_count` may be smaller than the window.
    pub fn stats_for(&self, suite: &str, bench: &str, window_size: usize) -> WindowStats {
        let values: Vec<f64> = self
            .store
            .latest(suite, window_size)
            .iter()
            .filter_map(|entry| entry.bench(bench).map(|b| b.value))
            .collect();
        let stats = WindowStats::from_values(&values);
        debug!(suite = %suite, bench = %bench, window_size, samples = stats.sample_count, "Window statistics computed");
        stats
    }

    /// Whether `new_entry`'s value for `bench` is a regression against the
    /// most recent `window_size` entries. An entry without that measurement
    /// is never a regression.
    pub fn is_regression(
        &self,
        suite: &str,
        bench: &str,
        new_entry: &BenchmarkEntry,
        window_size: usize,
        threshold_stddevs: f64,
    ) -> bool {
        match new_entry.bench(bench) {
            Some(b) => self
                .stats_for(suite, bench, window_size)
                .is_outlier(b.value, threshold_stddevs),
            None => false,
        }
    }

    /// Detailed comparison of one measurement; `None` when the entry does not
    /// carry it.
    pub fn check(
        &self,
        suite: &str,
        bench: &str,
        entry: &BenchmarkEntry,
        window_size: usize,
        threshold_stddevs: f64,
    ) -> Option<RegressionCheck> {
        let measurement = entry.bench(bench)?;
        let stats = self.stats_for(suite, bench, window_size);
        let check = evaluate(entry, measurement.value, &measurement.unit, bench, stats, threshold_stddevs);
        if check.is_regression {
            warn!(
                suite = %suite,
                bench = %bench,
                value = check.value,
                mean = check.stats.mean,
                stddev = check.stats.stddev,
                severity = %check.severity,
                commit = %entry.commit.short_id(),
                "Regression detected"
            );
        }
        Some(check)
    }

    /// Compare every measurement of `entry` with history.
    pub fn check_entry(
        &self,
        suite: &str,
        entry: &BenchmarkEntry,
        window_size: usize,
        threshold_stddevs: f64,
    ) -> Vec<RegressionCheck> {
        entry
            .benches
            .iter()
            .filter_map(|b| self.check(suite, &b.name, entry, window_size, threshold_stddevs))
            .collect()
    }
}

fn evaluate(
    entry: &BenchmarkEntry,
    value: f64,
    unit: &str,
    bench: &str,
    stats: WindowStats,
    threshold_stddevs: f64,
) -> RegressionCheck {
    let direction = entry.tool.direction();
    let deviation_sigma = stats.deviation_sigma(value);
    let is_regression = stats.is_outlier(value, threshold_stddevs);
    let severity = match (is_regression, deviation_sigma) {
        (true, Some(sigma)) => Severity::from_sigma(sigma),
        _ => Severity::None,
    };
    RegressionCheck {
        bench: bench.to_string(),
        value,
        unit: unit.to_string(),
        commit_id: entry.commit.id.clone(),
        stats,
        deviation_sigma,
        direction,
        trend: Trend::of(value, &stats, direction),
        severity,
        is_regression,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bench_history_core::{Bench, Commit, CommitUser, Tool};
    use std::collections::BTreeMap;

    pub(crate) fn entry(n: u8, date: u64, benches: &[(&str, f64)]) -> BenchmarkEntry {
        let user = CommitUser {
            email: "ci@example.com".to_string(),
            name: "CI".to_string(),
            username: None,
        };
        let id = format!("{:040x}", n);
        BenchmarkEntry {
            commit: Commit {
                author: user.clone(),
                committer: user,
                distinct: Some(true),
                id: id.clone(),
                message: "bench run".to_string(),
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                tree_id: None,
                url: format!("https://example.com/commit/{id}"),
                extra: BTreeMap::new(),
            },
            date,
            tool: Tool::CustomSmallerIsBetter,
            benches: benches
                .iter()
                .map(|(name, value)| Bench::new(*name, *value, "KiB"))
                .collect(),
        }
    }

    pub(crate) fn bench_a() -> HistoryStore {
        let store = HistoryStore::new("https://example.com/repo");
        store.append("bench-A", entry(1, 100, &[("x", 10.0)])).unwrap();
        store.append("bench-A", entry(2, 200, &[("x", 10.0)])).unwrap();
        store.append("bench-A", entry(3, 300, &[("x", 30.0)])).unwrap();
        store
    }

    #[test]
    fn test_stats_for_window() {
        let store = bench_a();
        let stats = RegressionEngine::new(&store).stats_for("bench-A", "x", 3);
        assert!((stats.mean - 16.667).abs() < 0.01);
        assert!((stats.stddev - 9.43).abs() < 0.01);
        assert_eq!(stats.sample_count, 3);
    }

    #[test]
    fn test_stats_for_uses_most_recent_entries() {
        let store = bench_a();
        let stats = RegressionEngine::new(&store).stats_for("bench-A", "x", 2);
        assert_eq!(stats.sample_count, 2);
        assert_eq!(stats.mean, 20.0);
        assert_eq!(stats.stddev, 10.0);
    }

    #[test]
    fn test_stats_for_skips_entries_without_the_bench() {
        let store = bench_a();
        store.append("bench-A", entry(4, 400, &[("y", 1.0)])).unwrap();
        let stats = RegressionEngine::new(&store).stats_for("bench-A", "x", 4);
        assert_eq!(stats.sample_count, 3);
        assert!((stats.mean - 16.667).abs() < 0.01);
    }

    #[test]
    fn test_stats_for_empty_window() {
        let store = bench_a();
        let engine = RegressionEngine::new(&store);
        assert_eq!(engine.stats_for("unknown", "x", 3).sample_count, 0);
        assert_eq!(engine.stats_for("bench-A", "missing", 3).sample_count, 0);
        assert_eq!(engine.stats_for("bench-A", "x", 0), WindowStats::NO_DATA);
    }

    #[test]
    fn test_is_regression() {
        let store = bench_a();
        let engine = RegressionEngine::new(&store);
        let near = entry(5, 400, &[("x", 10.0)]);
        let far = entry(6, 400, &[("x", 100.0)]);
        assert!(!engine.is_regression("bench-A", "x", &near, 3, 1.0));
        assert!(engine.is_regression("bench-A", "x", &far, 3, 1.0));
        assert!(!engine.is_regression("bench-A", "other", &far, 3, 1.0));
    }

    #[test]
    fn test_zero_variance_window_never_flags() {
        let store = HistoryStore::default();
        for i in 0..5u8 {
            store.append("stable", entry(i, u64::from(i), &[("x", 7.0)])).unwrap();
        }
        let engine = RegressionEngine::new(&store);
        let wild = entry(9, 10, &[("x", 7_000_000.0)]);
        assert!(!engine.is_regression("stable", "x", &wild, 5, 0.0));
        assert!(!engine.is_regression("stable", "x", &wild, 5, 3.0));
    }

    #[test]
    fn test_check_reports_trend_and_severity() {
        let store = bench_a();
        let engine = RegressionEngine::new(&store);

        let worse = engine
            .check("bench-A", "x", &entry(7, 400, &[("x", 100.0)]), 3, 1.0)
            .unwrap();
        assert!(worse.is_regression);
        assert_eq!(worse.trend, Trend::Worse);
        assert_eq!(worse.severity, Severity::Critical);
        assert_eq!(worse.direction, Direction::SmallerIsBetter);
        assert!((worse.deviation_sigma.unwrap() - 8.84).abs() < 0.01);

        let mut faster = entry(8, 400, &[("x", 12.0)]);
        faster.tool = Tool::CustomBiggerIsBetter;
        let check = engine.check("bench-A", "x", &faster, 3, 1.0).unwrap();
        assert!(!check.is_regression);
        assert_eq!(check.trend, Trend::Worse);
        assert_eq!(check.severity, Severity::None);
    }

    #[test]
    fn test_check_entry_covers_every_bench() {
        let store = bench_a();
        let engine = RegressionEngine::new(&store);
        let candidate = entry(9, 400, &[("x", 11.0), ("new-metric", 3.0)]);
        let checks = engine.check_entry("bench-A", &candidate, 10, 2.0);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[1].stats.sample_count, 0);
        assert_eq!(checks[1].trend, Trend::Unchanged);
        assert!(checks.iter().all(|c| !c.is_regression));
    }

    #[test]
    fn test_severity_grades() {
        assert_eq!(Severity::from_sigma(1.5), Severity::Low);
        assert_eq!(Severity::from_sigma(-2.5), Severity::Medium);
        assert_eq!(Severity::from_sigma(4.0), Severity::High);
        assert_eq!(Severity::from_sigma(6.0), Severity::Critical);
    }
}
