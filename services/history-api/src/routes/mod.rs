// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP routes.

pub mod entries;
pub mod health;
pub mod stats;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{body::Bytes, Json, Router};
use bench_history_core::{validate_entry, BenchmarkEntry, ValidationErrors};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// All API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(entries::routes())
        .merge(stats::routes())
}

/// Wrap a payload in the `data`/`meta` envelope.
pub(crate) fn envelope<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "data": data,
        "meta": {
            "timestamp": Utc::now().to_rfc3339(),
        }
    }))
}

/// Parse and validate a request body as a benchmark entry.
pub(crate) fn parse_entry(body: &Bytes) -> ApiResult<BenchmarkEntry> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| ValidationErrors::malformed(e.to_string()))?;
    Ok(validate_entry(&payload)?)
}

/// Reject window sizes and thresholds the engine cannot use.
pub(crate) fn check_params(window: usize, threshold: f64) -> ApiResult<()> {
    if window == 0 {
        return Err(ApiError::BadRequest("window must be at least 1".to_string()));
    }
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(ApiError::BadRequest(format!(
            "threshold must be a finite, non-negative number, got {threshold}"
        )));
    }
    Ok(())
}
