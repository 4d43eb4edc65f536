// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark entry types.
//!
//! A [`BenchmarkEntry`] is one run of a benchmark suite recorded by CI: the
//! commit it measured, when it was recorded, the tool that produced it and
//! the named measurements. Entries are write-once records; nothing in this
//! workspace mutates an entry after it has been validated.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Author or committer of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitUser {
    /// E-mail address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Forge username, absent for users without a forge account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Commit attribution data attached to an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit author.
    pub author: CommitUser,
    /// Commit committer.
    pub committer: CommitUser,
    /// Whether the commit was distinct in the push that triggered the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    /// Content hash of the commit (hex).
    pub id: String,
    /// Commit message, free text.
    pub message: String,
    /// ISO-8601 commit timestamp, kept verbatim.
    pub timestamp: String,
    /// Tree hash, when the forge reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    /// Link to the commit.
    pub url: String,
    /// Any other keys present in the source document.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Commit {
    /// Parse the commit timestamp.
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Abbreviated commit id for display.
    pub fn short_id(&self) -> &str {
        self.id.get(..7).unwrap_or(&self.id)
    }
}

/// A single named measurement within an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bench {
    /// Measurement name, unique within its entry.
    pub name: String,
    /// Measured value.
    #[serde(with = "number")]
    pub value: f64,
    /// Spread reported by the benchmarking tool (e.g. `± 1.2%`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Unit of measure (`KiB`, `seconds`, `ns/iter`, ...).
    pub unit: String,
    /// Free-form extra information from the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Any other keys present in the source document.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl Bench {
    /// Create a measurement without range or extra information.
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            range: None,
            unit: unit.into(),
            extra: None,
            other: BTreeMap::new(),
        }
    }
}

/// Whether smaller or bigger values are an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Smaller values are better (timings, sizes, bytes on the wire).
    SmallerIsBetter,
    /// Bigger values are better (throughput).
    BiggerIsBetter,
}

/// Tool identifier naming the comparison semantics of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tool {
    /// `cargo bench` output.
    Cargo,
    /// `go test -bench` output.
    Go,
    /// benchmark.js output.
    BenchmarkJs,
    /// Luau benchmark output.
    BenchmarkLuau,
    /// pytest-benchmark output.
    Pytest,
    /// Google C++ benchmark output.
    GoogleCpp,
    /// Catch2 benchmark output.
    Catch2,
    /// BenchmarkTools.jl output.
    Julia,
    /// JMH output.
    Jmh,
    /// BenchmarkDotNet output.
    BenchmarkDotNet,
    /// Custom measurements where bigger is better.
    CustomBiggerIsBetter,
    /// Custom measurements where smaller is better.
    CustomSmallerIsBetter,
    /// Any other identifier, preserved verbatim.
    Other(String),
}

impl Tool {
    /// The identifier as written in the history document.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cargo => "cargo",
            Self::Go => "go",
            Self::BenchmarkJs => "benchmarkjs",
            Self::BenchmarkLuau => "benchmarkluau",
            Self::Pytest => "pytest",
            Self::GoogleCpp => "googlecpp",
            Self::Catch2 => "catch2",
            Self::Julia => "julia",
            Self::Jmh => "jmh",
            Self::BenchmarkDotNet => "benchmarkdotnet",
            Self::CustomBiggerIsBetter => "customBiggerIsBetter",
            Self::CustomSmallerIsBetter => "customSmallerIsBetter",
            Self::Other(other) => other,
        }
    }

    /// Comparison semantics for values produced by this tool.
    pub fn direction(&self) -> Direction {
        match self {
            Self::CustomBiggerIsBetter => Direction::BiggerIsBetter,
            _ => Direction::SmallerIsBetter,
        }
    }
}

impl From<String> for Tool {
    fn from(value: String) -> Self {
        match value.as_str() {
            "cargo" => Self::Cargo,
            "go" => Self::Go,
            "benchmarkjs" => Self::BenchmarkJs,
            "benchmarkluau" => Self::BenchmarkLuau,
            "pytest" => Self::Pytest,
            "googlecpp" => Self::GoogleCpp,
            "catch2" => Self::Catch2,
            "julia" => Self::Julia,
            "jmh" => Self::Jmh,
            "benchmarkdotnet" => Self::BenchmarkDotNet,
            "customBiggerIsBetter" => Self::CustomBiggerIsBetter,
            "customSmallerIsBetter" => Self::CustomSmallerIsBetter,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Tool {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Tool> for String {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    /// The commit that was measured.
    pub commit: Commit,
    /// Epoch milliseconds at which the run was recorded.
    pub date: u64,
    /// Tool that produced the measurements.
    pub tool: Tool,
    /// Measurements, in the order the tool reported them.
    pub benches: Vec<Bench>,
}

impl BenchmarkEntry {
    /// Look up a measurement by name.
    pub fn bench(&self, name: &str) -> Option<&Bench> {
        self.benches.iter().find(|b| b.name == name)
    }

    /// Recording time as a UTC timestamp.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.date)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Whether `other` is the same CI post: same commit, same recording time
    /// and the same measurements.
    pub fn is_same_record(&self, other: &BenchmarkEntry) -> bool {
        self.commit.id == other.commit.id
            && self.date == other.date
            && self.benches == other.benches
    }
}

/// Writes integral values without a fractional part so that documents keep
/// the shape the dashboard produced (`"value": 1234` rather than `1234.0`).
mod number {
    use serde::{Deserialize, Deserializer, Serializer};

    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        // -0.0 keeps its sign only as a float.
        let negative_zero = *value == 0.0 && value.is_sign_negative();
        if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT && !negative_zero {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        f64::deserialize(deserializer)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_round_trips_known_and_unknown_identifiers() {
        for raw in ["cargo", "customSmallerIsBetter", "customBiggerIsBetter", "hyperfine"] {
            let tool = Tool::from(raw);
            assert_eq!(tool.as_str(), raw);
            assert_eq!(String::from(tool), raw);
        }
        assert_eq!(Tool::from("hyperfine"), Tool::Other("hyperfine".to_string()));
    }

    #[test]
    fn test_tool_direction() {
        assert_eq!(Tool::CustomBiggerIsBetter.direction(), Direction::BiggerIsBetter);
        assert_eq!(Tool::CustomSmallerIsBetter.direction(), Direction::SmallerIsBetter);
        assert_eq!(Tool::Cargo.direction(), Direction::SmallerIsBetter);
    }

    #[test]
    fn test_integral_values_serialize_without_fraction() {
        let bench = Bench::new("Sent to peers", 1234.0, "KiB");
        let value = serde_json::to_value(&bench).unwrap();
        assert_eq!(value["value"], json!(1234));

        let bench = Bench::new("Test environment", 3.25, "seconds");
        let value = serde_json::to_value(&bench).unwrap();
        assert_eq!(value["value"], json!(3.25));
    }

    #[test]
    fn test_negative_zero_keeps_its_sign() {
        let bench = Bench::new("x", -0.0, "KiB");
        let text = serde_json::to_string(&bench).unwrap();
        let parsed: Bench = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.value, 0.0);
        assert!(parsed.value.is_sign_negative());

        let value = serde_json::to_value(Bench::new("x", 0.0, "KiB")).unwrap();
        assert_eq!(value["value"], json!(0));
    }

    #[test]
    fn test_unknown_bench_keys_are_preserved() {
        let value = json!({
            "name": "Sent to peers",
            "value": 127.31,
            "range": "± 0.4%",
            "unit": "KiB",
            "extra": "3 samples",
            "biggerIsBetter": false,
            "samples": [127.1, 127.5]
        });
        let parsed: Bench = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(parsed.extra.as_deref(), Some("3 samples"));
        assert_eq!(parsed.other.get("samples"), Some(&json!([127.1, 127.5])));
        assert!(!parsed.other.contains_key("unit"));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), value);
    }

    #[test]
    fn test_unknown_commit_keys_are_preserved() {
        let mut value = serde_json::to_value(commit(COMMIT_ID)).unwrap();
        value["verification"] = json!({"verified": true});

        let parsed: Commit = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(parsed.extra.get("verification"), Some(&json!({"verified": true})));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), value);
    }

    #[test]
    fn test_bench_lookup_and_record_identity() {
        let a = entry(100, vec![Bench::new("x", 10.0, "KiB"), Bench::new("y", 2.0, "s")]);
        assert_eq!(a.bench("y").map(|b| b.value), Some(2.0));
        assert!(a.bench("z").is_none());

        let mut b = a.clone();
        b.commit.message = "different message, same record".to_string();
        assert!(a.is_same_record(&b));

        b.benches[0].value = 11.0;
        assert!(!a.is_same_record(&b));
    }

    #[test]
    fn test_timestamps() {
        let e = entry(1_700_000_000_000, vec![Bench::new("x", 1.0, "s")]);
        assert_eq!(e.recorded_at().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(e.commit.authored_at().unwrap().to_rfc3339(), "2024-03-01T09:15:00+00:00");
        assert_eq!(e.commit.short_id(), "1b2c3d4");
    }
}
