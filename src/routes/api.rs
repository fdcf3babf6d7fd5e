// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public API routes: profile lookup and pipeline status.

use crate::models::{CanonicalProfile, Platform, ProfileRequest};
use crate::services::{CacheStats, ResolutionFailure, TokenStatus};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", post(resolve_profile))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/token/status", get(token_status))
}

/// Profile lookup body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    #[validate(length(min = 1, max = 64))]
    pub gamer_tag: String,
    pub platform: Platform,
}

/// Resolve a profile through the platform's fallback chain.
async fn resolve_profile(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProfileQuery>, JsonRejection>,
) -> Result<Json<CanonicalProfile>, ResolutionFailure> {
    let Json(query) = payload?;
    query.validate()?;

    let request = ProfileRequest::new(query.platform, query.gamer_tag);
    let profile = state.resolver.resolve(&request).await?;
    Ok(Json(profile))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.resolver.cache().stats())
}

/// PSN session token metadata. Never includes the token itself.
async fn token_status(State(state): State<Arc<AppState>>) -> Json<TokenStatus> {
    Json(state.psn_token.status().await)
}
