// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file, then environment variables prefixed with `BENCH_HISTORY` using `__`
//! as the section separator:
//!
//! ```text
//! BENCH_HISTORY__STORE__PATH=gh-pages/dev/bench/data.js
//! BENCH_HISTORY__REGRESSION__WINDOW_SIZE=20
//! ```

use crate::{Error, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory when no explicit
/// path is given (any extension supported by `config`).
pub const DEFAULT_CONFIG_NAME: &str = "bench-history";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BENCH_HISTORY";

/// All settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// History persistence.
    pub store: StoreSettings,
    /// Regression detection defaults.
    pub regression: RegressionSettings,
    /// HTTP service.
    pub server: ServerSettings,
    /// Logging.
    pub log: LogSettings,
}

/// History persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// History file; `.js` selects the `data.js` wrapper, anything else JSON.
    pub path: PathBuf,
    /// Repository URL written into new documents.
    #[serde(default)]
    pub repo_url: String,
}

/// Regression detection defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSettings {
    /// Number of most recent entries the statistics are computed over.
    pub window_size: usize,
    /// Deviation from the mean, in standard deviations, that flags a regression.
    pub threshold_stddevs: f64,
}

/// HTTP service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                path: PathBuf::from("data.js"),
                repo_url: String::new(),
            },
            regression: RegressionSettings {
                window_size: 10,
                threshold_stddevs: 2.0,
            },
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            log: LogSettings {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    ///
    /// With `path == None` a `bench-history.*` file in the working directory
    /// is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("store.path", defaults.store.path.to_string_lossy().into_owned())?
            .set_default("store.repo_url", defaults.store.repo_url)?
            .set_default("regression.window_size", defaults.regression.window_size as u64)?
            .set_default("regression.threshold_stddevs", defaults.regression.threshold_stddevs)?
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", u64::from(defaults.server.port))?
            .set_default("log.level", defaults.log.level)?
            .set_default("log.json", defaults.log.json)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        tracing::debug!(?settings, "Settings loaded");
        Ok(settings)
    }

    /// Reject settings the store and engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("store.path must not be empty".to_string()));
        }
        if self.regression.window_size == 0 {
            return Err(Error::InvalidConfig(
                "regression.window_size must be at least 1".to_string(),
            ));
        }
        let threshold = self.regression.threshold_stddevs;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "regression.threshold_stddevs must be a non-negative number, got {threshold}"
            )));
        }
        Ok(())
    }
}
