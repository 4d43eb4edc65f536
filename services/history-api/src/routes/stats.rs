use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use bench_history_analysis::RegressionEngine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{check_params, envelope, parse_entry};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub window: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub window: Option<usize>,
    pub threshold: Option<f64>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/suites/:suite/benches/:bench/stats", get(bench_stats))
        .route("/api/v1/suites/:suite/check", post(check_entry))
}

async fn bench_stats(
    State(state): State<Arc<AppState>>,
    Path((suite, bench)): Path<(String, String)>,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let window = params.window.unwrap_or(state.settings.regression.window_size);
    check_params(window, state.settings.regression.threshold_stddevs)?;

    let stats = RegressionEngine::new(state.store.store()).stats_for(&suite, &bench, window);
    Ok(envelope(json!({
        "suite": suite,
        "bench": bench,
        "window_size": window,
        "stats": stats,
    })))
}

async fn check_entry(
    State(state): State<Arc<AppState>>,
    Path(suite): Path<String>,
    params: Result<Query<CheckParams>, QueryRejection>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let window = params.window.unwrap_or(state.settings.regression.window_size);
    let threshold = params
        .threshold
        .unwrap_or(state.settings.regression.threshold_stddevs);
    check_params(window, threshold)?;

    let entry = parse_entry(&body)?;
    let checks = RegressionEngine::new(state.store.store()).check_entry(&suite, &entry, window, threshold);
    let regressions = checks.iter().filter(|c| c.is_regression).count();
    Ok(envelope(json!({
        "suite": suite,
        "window_size": window,
        "threshold_stddevs": threshold,
        "regressions": regressions,
        "checks": checks,
    })))
}
