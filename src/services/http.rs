// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Response checking shared by the vendor API clients.

use crate::models::FailureKind;
use crate::services::adapter::AdapterError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Timeout for a single vendor HTTP call. The orchestrator's per-attempt
/// timeout bounds the whole adapter invocation on top of this.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("playtrack/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a non-success vendor status onto the failure taxonomy.
pub fn failure_kind_for_status(status: StatusCode) -> FailureKind {
    match status.as_u16() {
        401 | 403 => FailureKind::CredentialInvalid,
        404 => FailureKind::NotFoundOnSource,
        429 => FailureKind::RateLimited,
        // Our request already passed local validation, so a vendor-side
        // rejection means this source cannot answer for the identifier.
        400 | 422 => FailureKind::NotFoundOnSource,
        _ => FailureKind::UpstreamUnavailable,
    }
}

/// Transport-level failure (connect, timeout, TLS).
pub fn transport_error(vendor: &str, err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        return AdapterError::new(FailureKind::Timeout, format!("{vendor} request timed out"));
    }
    // Request URLs can carry API keys in the query string.
    AdapterError::unavailable(format!("{vendor} request failed: {}", err.without_url()))
}

/// Check response status and parse the JSON body.
pub async fn check_response_json<T: DeserializeOwned>(
    vendor: &str,
    response: reqwest::Response,
) -> Result<T, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let kind = failure_kind_for_status(status);
        if kind == FailureKind::RateLimited {
            tracing::warn!(vendor, "Vendor rate limit hit (429)");
        }
        // Body is logged, not propagated; it may echo request details.
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(vendor, status = %status, body = %truncate(&body, 200), "Vendor error response");
        return Err(AdapterError::new(kind, format!("{vendor} returned HTTP {status}")));
    }

    response
        .json()
        .await
        .map_err(|e| {
            AdapterError::unavailable(format!("{vendor} JSON parse error: {}", e.without_url()))
        })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
