// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistence backends for the history document.
//!
//! The store itself is storage-agnostic; a [`HistoryBackend`] loads and saves
//! the whole [`HistoryDocument`]. The file backend writes either plain JSON
//! or the dashboard's `data.js` script, chosen by file extension.

use crate::error::StorageError;
use bench_history_core::HistoryDocument;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads and saves the persisted history document.
#[cfg_attr(test, mockall::automock)]
pub trait HistoryBackend: Send + Sync {
    /// Load the document; `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<HistoryDocument>, StorageError>;

    /// Replace the persisted document.
    fn save(&self, document: &HistoryDocument) -> Result<(), StorageError>;

    /// Human-readable location for logs and errors.
    fn describe(&self) -> String;
}

/// On-disk representation of a history file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Plain JSON document.
    Json,
    /// `window.BENCHMARK_DATA = {...}` script.
    DataJs,
}

impl FileFormat {
    /// Pick the format from the file extension: `.js` is a `data.js` script,
    /// anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("js") => Self::DataJs,
            _ => Self::Json,
        }
    }
}

/// History stored in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    format: FileFormat,
}

impl JsonFileBackend {
    /// Backend for `path`, format chosen by extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self { path, format }
    }

    /// Backend for `path` with an explicit format.
    pub fn with_format(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// File location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File format.
    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HistoryBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<HistoryDocument>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document = match self.format {
            FileFormat::Json => HistoryDocument::from_json_str(&text)?,
            FileFormat::DataJs => HistoryDocument::from_data_js(&text)?,
        };
        debug!(path = %self.path.display(), entries = document.entry_count(), "History loaded");
        Ok(Some(document))
    }

    fn save(&self, document: &HistoryDocument) -> Result<(), StorageError> {
        let body = match self.format {
            FileFormat::Json => document.to_json_string()?,
            FileFormat::DataJs => document.to_data_js()?,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target and rename so readers never see a torn file.
        let temp = self.temp_path();
        fs::write(&temp, body)?;
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), entries = document.entry_count(), "History saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Backend that keeps the document in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    document: Mutex<Option<HistoryDocument>>,
}

impl InMemoryBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with a document.
    pub fn with_document(document: HistoryDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }

    /// Last saved document.
    pub fn snapshot(&self) -> Option<HistoryDocument> {
        self.document.lock().clone()
    }
}

impl HistoryBackend for InMemoryBackend {
    fn load(&self) -> Result<Option<HistoryDocument>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, document: &HistoryDocument) -> Result<(), StorageError> {
        *self.document.lock() = Some(document.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{entry, id};

    fn temp_file(ext: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bench-history-{}", uuid::Uuid::new_v4()))
            .join(format!("data.{ext}"))
    }

    fn document() -> HistoryDocument {
        let mut document = HistoryDocument::new("https://github.com/example/project");
        document.last_update = 1_000;
        document.entries.insert(
            "statement-distribution-regression-bench".to_string(),
            vec![entry(&id(1), 100, 10.5), entry(&id(1), 100, 10.5), entry(&id(2), 200, 12.0)],
        );
        document
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("dev/bench/data.js")), FileFormat::DataJs);
        assert_eq!(FileFormat::from_path(Path::new("history.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("history")), FileFormat::Json);
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let backend = JsonFileBackend::new(temp_file("json"));
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn test_file_round_trip_in_both_formats() {
        for ext in ["json", "js"] {
            let path = temp_file(ext);
            let backend = JsonFileBackend::new(&path);
            backend.save(&document()).unwrap();

            let text = fs::read_to_string(&path).unwrap();
            assert_eq!(text.starts_with("window.BENCHMARK_DATA = "), ext == "js");
            assert!(!backend.temp_path().exists());

            assert_eq!(backend.load().unwrap(), Some(document()));
            fs::remove_dir_all(path.parent().unwrap()).unwrap();
        }
    }

    #[test]
    fn test_corrupt_file_is_a_document_error() {
        let path = temp_file("json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileBackend::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Document(_)));
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_in_memory_backend() {
        let backend = InMemoryBackend::new();
        assert!(backend.load().unwrap().is_none());
        backend.save(&document()).unwrap();
        assert_eq!(backend.load().unwrap(), Some(document()));
    }
}
