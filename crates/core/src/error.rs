// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the core crate.

use crate::validation::ValidationErrors;
use thiserror::Error;

/// Errors raised while reading documents or settings.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The document wrapper is malformed.
    #[error("Malformed history document: {0}")]
    Format(String),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration sources could not be read or merged.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration was read but holds unusable values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
