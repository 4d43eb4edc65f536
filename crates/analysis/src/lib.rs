//! Regression queries over benchmark history.
//!
//! This crate summarizes recent history per measurement and flags values
//! that deviate from it, for alerting and charting collaborators.
//!
//! # Quick Start
//!
//! ```
//! use bench_history_analysis::RegressionEngine;
//! use bench_history_storage::HistoryStore;
//!
//! let store = HistoryStore::new("https://github.com/org/repo");
//! let engine = RegressionEngine::new(&store);
//!
//! // No history yet: a defined "no data" result, not an error.
//! let stats = engine.stats_for("statement-distribution-regression-bench", "Sent to peers", 10);
//! assert!(!stats.has_data());
//! ```
//!
//! # Modules
//!
//! - [`stats`] - [`WindowStats`], population statistics over a window
//! - [`regression`] - [`RegressionEngine`] and per-measurement checks
//! - [`markdown`] - Markdown regression reports

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod markdown;
pub mod regression;
pub mod stats;

pub use regression::{RegressionCheck, RegressionEngine, Severity, Trend};
pub use stats::WindowStats;
