//! Markdown output for regression checks.
//!
//! This module renders regression checks and store overviews as markdown,
//! for CI job summaries and pull request comments.

use crate::regression::{RegressionCheck, Trend};
use bench_history_storage::HistoryStore;
use std::fmt::Write;

/// Render a regression report for one candidate entry of `suite`.
pub fn regression_report(suite: &str, checks: &[RegressionCheck], threshold_stddevs: f64) -> String {
    let mut output = String::new();
    let flagged = checks.iter().filter(|c| c.is_regression).count();

    writeln!(output, "# Regression Report: {}", suite).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339()).unwrap();
    if let Some(commit) = checks.first().map(|c| c.commit_id.as_str()) {
        writeln!(output, "Commit: `{}`", commit).unwrap();
    }
    writeln!(output, "Threshold: {} standard deviation(s)", threshold_stddevs).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Benchmark | Value | Mean | Std Dev | Samples | Deviation | Trend | Status |").unwrap();
    writeln!(output, "|-----------|-------|------|---------|---------|-----------|-------|--------|").unwrap();

    for check in checks {
        let deviation = check
            .deviation_sigma
            .map(|sigma| format!("{:+.2}σ", sigma))
            .unwrap_or_else(|| "-".to_string());
        let trend = match check.trend {
            Trend::Worse => "worse",
            Trend::Better => "better",
            Trend::Unchanged => "unchanged",
        };
        let status = if check.is_regression {
            format!("**regression** ({})", check.severity)
        } else {
            "ok".to_string()
        };
        writeln!(
            output,
            "| {} | {} {} | {:.3} | {:.3} | {} | {} | {} | {} |",
            check.bench,
            check.value,
            check.unit,
            check.stats.mean,
            check.stats.stddev,
            check.stats.sample_count,
            deviation,
            trend,
            status
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Regressions: {} of {} benchmarks", flagged, checks.len()).unwrap();

    output
}

/// Render an overview of every suite in the store.
pub fn history_summary(store: &HistoryStore) -> String {
    let mut output = String::new();

    writeln!(output, "# Benchmark History").unwrap();
    writeln!(output).unwrap();
    if !store.repo_url().is_empty() {
        writeln!(output, "Repository: {}", store.repo_url()).unwrap();
    }
    writeln!(output, "Last update: {}", format_millis(store.last_update())).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Suite | Entries | Latest Commit | Recorded |").unwrap();
    writeln!(output, "|-------|---------|---------------|----------|").unwrap();

    for suite in store.suites() {
        let latest = store.latest(&suite, 1);
        let (commit, recorded) = match latest.first() {
            Some(entry) => (entry.commit.short_id().to_string(), format_millis(entry.date)),
            None => ("-".to_string(), "-".to_string()),
        };
        writeln!(output, "| {} | {} | {} | {} |", suite, store.len(&suite), commit, recorded).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total entries: {}", store.total_len()).unwrap();

    output
}

fn format_millis(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::tests::{bench_a, entry};
    use crate::RegressionEngine;

    #[test]
    fn test_regression_report_marks_flagged_benches() {
        let store = bench_a();
        let candidate = entry(9, 400, &[("x", 100.0), ("fresh", 1.0)]);
        let checks = RegressionEngine::new(&store).check_entry("bench-A", &candidate, 3, 1.0);

        let report = regression_report("bench-A", &checks, 1.0);
        assert!(report.starts_with("# Regression Report: bench-A"));
        assert!(report.contains("| x | 100 KiB | 16.667 | 9.428 | 3 | +8.84σ | worse | **regression** (Critical) |"));
        assert!(report.contains("| fresh | 1 KiB | 0.000 | 0.000 | 0 | - | unchanged | ok |"));
        assert!(report.contains("Regressions: 1 of 2 benchmarks"));
    }

    #[test]
    fn test_history_summary_lists_suites() {
        let store = bench_a();
        let summary = history_summary(&store);
        assert!(summary.contains("Repository: https://example.com/repo"));
        assert!(summary.contains("| bench-A | 3 | 0000000 | 1970-01-01 00:00:00 UTC |"));
        assert!(summary.contains("Total entries: 3"));
    }
}
