// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Record validation.
//!
//! Candidate entries arrive as untyped JSON from CI jobs. Validation walks the
//! whole value and collects every violation it finds so that the caller can
//! report all problems of a payload at once. Only a payload without any
//! violation is converted into a [`BenchmarkEntry`].
//!
//! # Example
//!
//! ```
//! use bench_history_core::validation::validate_entry;
//!
//! let payload = serde_json::json!({"date": -1, "tool": "", "benches": []});
//! let errors = validate_entry(&payload).unwrap_err();
//! assert!(errors.len() >= 4);
//! ```

use crate::document::HistoryDocument;
use crate::entry::BenchmarkEntry;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

static COMMIT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9a-fA-F]{40}|[0-9a-fA-F]{64})$").expect("valid regex"));

/// Machine-readable violation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    /// A required field is absent.
    MissingField,
    /// A field has the wrong JSON type.
    WrongType,
    /// A string field that must carry content is empty.
    EmptyString,
    /// A measurement value is NaN or infinite.
    NonFinite,
    /// A number that must be non-negative is negative.
    Negative,
    /// A number that must be an integer has a fractional part.
    NotInteger,
    /// Two measurements in one entry share a name.
    DuplicateName,
    /// An entry carries no measurements.
    EmptyBenches,
    /// The commit id is not a content hash.
    InvalidCommitId,
    /// The commit timestamp is not ISO-8601.
    InvalidTimestamp,
    /// An entry is dated before its predecessor in the same suite.
    DateOutOfOrder,
    /// The payload is not JSON at all.
    MalformedJson,
}

impl ViolationCode {
    /// Stable code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "MISSING_FIELD",
            Self::WrongType => "WRONG_TYPE",
            Self::EmptyString => "EMPTY_STRING",
            Self::NonFinite => "NON_FINITE",
            Self::Negative => "NEGATIVE",
            Self::NotInteger => "NOT_INTEGER",
            Self::DuplicateName => "DUPLICATE_NAME",
            Self::EmptyBenches => "EMPTY_BENCHES",
            Self::InvalidCommitId => "INVALID_COMMIT_ID",
            Self::InvalidTimestamp => "INVALID_TIMESTAMP",
            Self::DateOutOfOrder => "DATE_OUT_OF_ORDER",
            Self::MalformedJson => "MALFORMED_JSON",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Path to the offending field, e.g. `benches[2].value`.
    pub field_path: String,
    /// Violation kind.
    pub code: ViolationCode,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(field_path: impl Into<String>, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field_path.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "{}: [{}] {}", self.field_path, self.code, self.message)
        }
    }
}

/// Every violation found in a rejected payload.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{} validation error(s): {}", .violations.len(), summarize(.violations))]
pub struct ValidationErrors {
    /// Violations in document order.
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Rejection of a payload that could not be parsed.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation::new("", ViolationCode::MalformedJson, message)],
        }
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Always false for errors produced by this module.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether any violation has the given code.
    pub fn has(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// Whether any violation points at the given path.
    pub fn has_path(&self, field_path: &str) -> bool {
        self.violations.iter().any(|v| v.field_path == field_path)
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a candidate entry and convert it into a [`BenchmarkEntry`].
pub fn validate_entry(input: &Value) -> Result<BenchmarkEntry, ValidationErrors> {
    let mut checker = Checker::default();
    checker.entry(input, "");
    checker.finish()?;
    convert(input)
}

/// Validate a whole persisted history document.
///
/// Every entry of every suite is checked, and consecutive entries within a
/// suite must have non-decreasing dates.
pub fn validate_document(input: &Value) -> Result<HistoryDocument, ValidationErrors> {
    let mut checker = Checker::default();
    checker.document(input);
    checker.finish()?;
    convert(input)
}

fn convert<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, ValidationErrors> {
    serde_json::from_value(input.clone()).map_err(|e| ValidationErrors {
        violations: vec![Violation::new("", ViolationCode::WrongType, e.to_string())],
    })
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, code: ViolationCode, message: impl Into<String>) {
        self.violations.push(Violation::new(path, code, message));
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                violations: self.violations,
            })
        }
    }

    fn wrong_type(&mut self, path: String, expected: &str, found: &Value) {
        let message = format!("expected {expected}, found {}", type_name(found));
        self.push(path, ViolationCode::WrongType, message);
    }

    fn required<'a>(&mut self, obj: &'a Map<String, Value>, prefix: &str, key: &str) -> Option<&'a Value> {
        let value = obj.get(key);
        if value.is_none() {
            self.push(join(prefix, key), ViolationCode::MissingField, format!("`{key}` is required"));
        }
        value
    }

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value.as_object() {
            Some(obj) => Some(obj),
            None => {
                self.wrong_type(path.to_string(), "an object", value);
                None
            }
        }
    }

    fn string<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        prefix: &str,
        key: &str,
        non_empty: bool,
    ) -> Option<&'a str> {
        let path = join(prefix, key);
        match self.required(obj, prefix, key)? {
            Value::String(s) if non_empty && s.trim().is_empty() => {
                self.push(path, ViolationCode::EmptyString, format!("`{key}` must not be empty"));
                None
            }
            Value::String(s) => Some(s),
            other => {
                self.wrong_type(path, "a string", other);
                None
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, prefix: &str, key: &str) {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => self.wrong_type(join(prefix, key), "a string", other),
        }
    }

    fn epoch_millis(&mut self, obj: &Map<String, Value>, prefix: &str, key: &str) -> Option<u64> {
        let path = join(prefix, key);
        match self.required(obj, prefix, key)? {
            Value::Number(n) => {
                if let Some(ms) = n.as_u64() {
                    Some(ms)
                } else if n.as_f64().map_or(false, |f| f < 0.0) {
                    self.push(path, ViolationCode::Negative, format!("`{key}` must not be negative, got {n}"));
                    None
                } else {
                    self.push(path, ViolationCode::NotInteger, format!("`{key}` must be an integer, got {n}"));
                    None
                }
            }
            other => {
                self.wrong_type(path, "an integer", other);
                None
            }
        }
    }

    fn document(&mut self, input: &Value) {
        let Some(root) = self.object(input, "") else {
            return;
        };
        self.epoch_millis(root, "", "lastUpdate");
        self.string(root, "", "repoUrl", false);

        let Some(entries) = self.required(root, "", "entries") else {
            return;
        };
        let Some(suites) = self.object(entries, "entries") else {
            return;
        };
        for (suite, log) in suites {
            let suite_path = join("entries", suite);
            let Some(log) = log.as_array() else {
                self.wrong_type(suite_path, "an array", log);
                continue;
            };
            let mut previous: Option<u64> = None;
            for (i, entry) in log.iter().enumerate() {
                let path = format!("{suite_path}[{i}]");
                let date = self.entry(entry, &path);
                if let (Some(prev), Some(date)) = (previous, date) {
                    if date < prev {
                        self.push(
                            join(&path, "date"),
                            ViolationCode::DateOutOfOrder,
                            format!("date {date} is earlier than the preceding entry's {prev}"),
                        );
                    }
                }
                if date.is_some() {
                    previous = date;
                }
            }
        }
    }

    /// Checks one entry and returns its date when that field was valid.
    fn entry(&mut self, input: &Value, prefix: &str) -> Option<u64> {
        let obj = self.object(input, prefix)?;

        if let Some(commit) = self.required(obj, prefix, "commit") {
            self.commit(commit, &join(prefix, "commit"));
        }
        let date = self.epoch_millis(obj, prefix, "date");
        self.string(obj, prefix, "tool", true);
        if let Some(benches) = self.required(obj, prefix, "benches") {
            self.benches(benches, &join(prefix, "benches"));
        }
        date
    }

    fn commit(&mut self, input: &Value, prefix: &str) {
        let Some(obj) = self.object(input, prefix) else {
            return;
        };
        for role in ["author", "committer"] {
            if let Some(user) = self.required(obj, prefix, role) {
                self.user(user, &join(prefix, role));
            }
        }

        if let Some(id) = self.string(obj, prefix, "id", true) {
            if !COMMIT_ID.is_match(id) {
                self.push(
                    join(prefix, "id"),
                    ViolationCode::InvalidCommitId,
                    format!("`{id}` is not a 40 or 64 character hex hash"),
                );
            }
        }
        self.string(obj, prefix, "message", false);
        if let Some(timestamp) = self.string(obj, prefix, "timestamp", true) {
            if DateTime::parse_from_rfc3339(timestamp).is_err() {
                self.push(
                    join(prefix, "timestamp"),
                    ViolationCode::InvalidTimestamp,
                    format!("`{timestamp}` is not an ISO-8601 timestamp"),
                );
            }
        }
        self.string(obj, prefix, "url", true);

        match obj.get("distinct") {
            None | Some(Value::Null) | Some(Value::Bool(_)) => {}
            Some(other) => self.wrong_type(join(prefix, "distinct"), "a boolean", other),
        }
        self.optional_string(obj, prefix, "tree_id");
    }

    fn user(&mut self, input: &Value, prefix: &str) {
        let Some(obj) = self.object(input, prefix) else {
            return;
        };
        self.string(obj, prefix, "name", true);
        self.string(obj, prefix, "email", true);
        self.optional_string(obj, prefix, "username");
    }

    fn benches(&mut self, input: &Value, prefix: &str) {
        let Some(benches) = input.as_array() else {
            self.wrong_type(prefix.to_string(), "an array", input);
            return;
        };
        if benches.is_empty() {
            self.push(prefix, ViolationCode::EmptyBenches, "at least one measurement is required");
            return;
        }

        let mut seen = HashSet::new();
        for (i, bench) in benches.iter().enumerate() {
            let path = format!("{prefix}[{i}]");
            let Some(obj) = self.object(bench, &path) else {
                continue;
            };
            if let Some(name) = self.string(obj, &path, "name", true) {
                if !seen.insert(name) {
                    self.push(
                        join(&path, "name"),
                        ViolationCode::DuplicateName,
                        format!("measurement `{name}` appears more than once"),
                    );
                }
            }
            if let Some(value) = self.required(obj, &path, "value") {
                self.measurement(value, &join(&path, "value"));
            }
            self.string(obj, &path, "unit", true);
            self.optional_string(obj, &path, "range");
            self.optional_string(obj, &path, "extra");
        }
    }

    fn measurement(&mut self, value: &Value, path: &str) {
        match value {
            Value::Number(n) if n.as_f64().map_or(false, f64::is_finite) => {}
            Value::Number(n) => {
                self.push(path, ViolationCode::NonFinite, format!("{n} is not a finite number"));
            }
            // JSON.stringify writes NaN and Infinity as null.
            Value::Null => {
                self.push(path, ViolationCode::NonFinite, "null is not a finite number (NaN or Infinity upstream)");
            }
            Value::String(s) if s.parse::<f64>().map_or(false, |f| !f.is_finite()) => {
                self.push(path, ViolationCode::NonFinite, format!("`{s}` is not a finite number"));
            }
            other => self.wrong_type(path.to_string(), "a number", other),
        }
    }
}
