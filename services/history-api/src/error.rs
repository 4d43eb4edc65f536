// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! API error type and its JSON rendering.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bench_history_core::ValidationErrors;
use bench_history_storage::StoreError;
use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A request parameter is invalid.
    #[error("{0}")]
    BadRequest(String),

    /// An unexpected server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(StoreError::OutOfOrder { .. }) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Store(StoreError::OutOfOrder { .. }) => "OUT_OF_ORDER",
            Self::Store(_) => "STORAGE_UNAVAILABLE",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Validation(errors) => json!({ "violations": errors.violations }),
            Self::Store(StoreError::OutOfOrder { date, latest, .. }) => {
                json!({ "date": date, "latest": latest })
            }
            Self::Store(_) => json!({ "retryable": true }),
            _ => Value::Null,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "details": self.details(),
            },
            "meta": {
                "timestamp": Utc::now().to_rfc3339(),
            }
        }));
        (status, body).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
