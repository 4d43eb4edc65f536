// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The persisted history document.
//!
//! The dashboard stores every suite of a repository in one root object:
//!
//! ```text
//! { "lastUpdate": <epoch-ms>, "repoUrl": "...", "entries": { "<suite>": [ <entry>, ... ] } }
//! ```
//!
//! On disk it is either plain JSON or a `data.js` script assigning the object
//! to `window.BENCHMARK_DATA`. Both forms are read and written here; the
//! document itself is always an explicit value, never ambient state.

use crate::entry::BenchmarkEntry;
use crate::validation::validate_document;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assignment written in front of the JSON body of a `data.js` file.
pub const DATA_JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Root object of the benchmark history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDocument {
    /// Epoch milliseconds of the last successful append.
    pub last_update: u64,
    /// Repository the history belongs to.
    pub repo_url: String,
    /// Entries per suite, in append order.
    pub entries: BTreeMap<String, Vec<BenchmarkEntry>>,
}

impl HistoryDocument {
    /// An empty document.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Total number of entries across all suites.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Parse and validate a plain JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Ok(validate_document(&value)?)
    }

    /// Parse and validate a `data.js` document.
    pub fn from_data_js(text: &str) -> Result<Self> {
        Self::from_json_str(strip_data_js(text)?)
    }

    /// Pretty JSON, as the dashboard writes it.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `data.js` rendering of the document.
    pub fn to_data_js(&self) -> Result<String> {
        Ok(format!("{DATA_JS_PREFIX}{}\n", self.to_json_string()?))
    }
}

/// Extract the JSON body from a `data.js` script.
pub fn strip_data_js(text: &str) -> Result<&str> {
    let body = text
        .trim_start_matches('\u{feff}')
        .trim()
        .strip_prefix(DATA_JS_PREFIX.trim_end())
        .ok_or_else(|| Error::Format(format!("expected a script starting with `{}`", DATA_JS_PREFIX.trim_end())))?;
    let body = body.trim();
    Ok(body.strip_suffix(';').unwrap_or(body).trim_end())
}
