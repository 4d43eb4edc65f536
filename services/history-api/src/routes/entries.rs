use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bench_history_core::BenchmarkEntry;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{envelope, parse_entry};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_LATEST: usize = 10;

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub n: Option<usize>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/suites", get(list_suites))
        .route(
            "/api/v1/suites/:suite/entries",
            get(query_range).post(append_entry),
        )
        .route("/api/v1/suites/:suite/commits/:id", get(query_by_commit))
        .route("/api/v1/suites/:suite/latest", get(latest))
}

async fn list_suites(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.store();
    let suites: Vec<Value> = store
        .suites()
        .into_iter()
        .map(|name| {
            let entries = store.len(&name);
            json!({ "suite": name, "entries": entries })
        })
        .collect();
    envelope(suites)
}

async fn append_entry(
    State(state): State<Arc<AppState>>,
    Path(suite): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let entry = parse_entry(&body)?;
    let commit = entry.commit.short_id().to_string();

    // Saving rewrites the whole document; keep it off the async workers.
    let store = Arc::clone(&state.store);
    let target = suite.clone();
    let outcome = tokio::task::spawn_blocking(move || store.append(&target, entry))
        .await
        .map_err(|e| ApiError::Internal(format!("append task failed: {e}")))??;

    info!(
        suite = %suite,
        commit = %commit,
        index = outcome.index(),
        duplicate = outcome.is_duplicate(),
        "Entry ingested"
    );

    let status = if outcome.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, envelope(json!({ "suite": suite, "outcome": outcome }))))
}

async fn query_range(
    State(state): State<Arc<AppState>>,
    Path(suite): Path<String>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let from = params.from.unwrap_or(0);
    let to = params.to.unwrap_or(u64::MAX);
    let entries = state.store.store().query_range(&suite, from, to).to_vec();
    Ok(envelope(entries.iter().map(Arc::as_ref).collect::<Vec<&BenchmarkEntry>>()))
}

async fn query_by_commit(
    State(state): State<Arc<AppState>>,
    Path((suite, id)): Path<(String, String)>,
) -> Json<Value> {
    let entries = state.store.store().query_by_commit(&suite, &id);
    envelope(entries.iter().map(Arc::as_ref).collect::<Vec<_>>())
}

async fn latest(
    State(state): State<Arc<AppState>>,
    Path(suite): Path<String>,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let n = params.n.unwrap_or(DEFAULT_LATEST);
    let entries = state.store.store().latest(&suite, n);
    Ok(envelope(entries.iter().map(Arc::as_ref).collect::<Vec<_>>()))
}
