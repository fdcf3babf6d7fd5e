// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::FailureKind;
use crate::services::orchestrator::ResolutionFailure;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

/// Body returned when a profile could not be resolved.
#[derive(Serialize)]
struct ResolutionErrorResponse<'a> {
    error: &'a str,
    kind: &'static str,
    sources_attempted: Vec<&'static str>,
    attempts: &'a [crate::models::AttemptRecord],
}

impl ResolutionFailure {
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            FailureKind::NotFoundOnSource => StatusCode::NOT_FOUND,
            FailureKind::CredentialInvalid => StatusCode::UNAUTHORIZED,
            FailureKind::MalformedRequest => StatusCode::BAD_REQUEST,
            FailureKind::RateLimited
            | FailureKind::UpstreamUnavailable
            | FailureKind::ScrapeBlocked
            | FailureKind::Timeout => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ResolutionFailure {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let sources_attempted = self.sources_attempted();
        if status.is_server_error() {
            tracing::warn!(kind = %self.kind, sources = ?sources_attempted, "Resolution failed upstream");
        }

        let body = ResolutionErrorResponse {
            error: &self.message,
            kind: self.kind.as_str(),
            sources_attempted,
            attempts: &self.attempts,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ResolutionFailure {
    fn from(rejection: JsonRejection) -> Self {
        ResolutionFailure::malformed(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ResolutionFailure {
    fn from(errors: validator::ValidationErrors) -> Self {
        ResolutionFailure::malformed(format!("Invalid request: {errors}"))
    }
}
