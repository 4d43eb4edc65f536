// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP API for benchmark history.
//!
//! A thin wrapper over [`FileBackedStore`]: CI jobs post entries, dashboards
//! and bots query ranges, commits and window statistics, and candidate
//! entries can be checked for regressions before they are stored. Appends
//! are serialized by the store's writer lock; queries run concurrently.

#![deny(unsafe_code)]

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use bench_history_core::Settings;
use bench_history_storage::FileBackedStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Shared state of the service.
#[derive(Debug)]
pub struct AppState {
    /// Persisted history.
    pub store: Arc<FileBackedStore>,
    /// Loaded settings; regression defaults come from here.
    pub settings: Settings,
}

impl AppState {
    /// Create the service state.
    pub fn new(store: FileBackedStore, settings: Settings) -> Self {
        Self {
            store: Arc::new(store),
            settings,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_span))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}
