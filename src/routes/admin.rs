// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator routes. Guarded by the admin key middleware in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::models::{CacheKey, Platform};
use crate::services::TokenStatus;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/token", put(put_token))
        .route("/api/cache/{platform}/{identifier}", delete(invalidate_cache))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Install a freshly obtained PSN session token.
async fn put_token(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TokenUpdate>, JsonRejection>,
) -> Result<Json<TokenStatus>> {
    let Json(update) = payload?;
    let token = update.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token must not be blank".to_string()));
    }

    state
        .psn_token
        .replace(token.to_string(), update.expires_at)
        .await;
    Ok(Json(state.psn_token.status().await))
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub key: String,
    pub removed: bool,
}

async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    Path((platform, identifier)): Path<(String, String)>,
) -> Result<Json<InvalidateResponse>> {
    let platform: Platform = platform
        .parse()
        .map_err(|e: crate::models::platform::UnknownPlatform| AppError::BadRequest(e.to_string()))?;
    let key = CacheKey::new(platform, &identifier);
    let removed = state.resolver.cache().invalidate(&key);

    tracing::info!(key = %key, removed, "Cache entry invalidated");
    Ok(Json(InvalidateResponse {
        key: key.to_string(),
        removed,
    }))
}
