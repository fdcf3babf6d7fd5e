// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests against the offline app.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use playtrack::config::Config;
use playtrack::models::{FailureKind, SourceKind};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{ScriptedAdapter, TestSources};

fn post_profile(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/profile")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

// ─── Profile lookup ──────────────────────────────────────────

#[tokio::test]
async fn test_steam_profile() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "rabscuttle", "platform": "steam" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["dataSource"], "steam-api");
    assert_eq!(body["qualificationStatus"], "authentic");
    assert_eq!(body["games"][0]["hoursPlayed"], 45);
    assert_eq!(body["totalHours"], 55);
    assert_eq!(body["totalGames"], 2);
}

#[tokio::test]
async fn test_playstation_profile_falls_back_to_scrape() {
    let (app, _state, sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "Hakoom", "platform": "playstation" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["dataSource"], "psn-scrape");
    assert_eq!(body["qualificationStatus"], "authentic (scraped)");
    assert_eq!(body["trophySummary"]["platinum"], 80);
    assert_eq!(sources.psn_api.calls(), 1);
    assert_eq!(sources.psn_scrape.calls(), 1);
}

#[tokio::test]
async fn test_xbox_profile_is_partial() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "Major Nelson", "platform": "xbox" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["qualificationStatus"],
        "partial — platform limitation"
    );
    assert_eq!(body["totalHours"], 0);
    assert!(body["games"][0]["hoursPlayed"].is_null());
}

#[tokio::test]
async fn test_unknown_platform_is_bad_request() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "someone", "platform": "dreamcast" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["kind"], "malformed_request");
}

#[tokio::test]
async fn test_empty_gamer_tag_is_bad_request() {
    let (app, _state, sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "", "platform": "steam" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(sources.steam.calls(), 0);
}

#[tokio::test]
async fn test_blank_gamer_tag_is_bad_request() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "   ", "platform": "steam" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gamer_tag_too_long() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "a".repeat(65), "platform": "steam" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(post_profile(json!({ "platform": "steam" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_not_found_everywhere_is_404() {
    let (_, _, defaults) = common::create_test_app();
    let sources = TestSources {
        steam: Arc::new(ScriptedAdapter::failing(
            SourceKind::SteamApi,
            FailureKind::NotFoundOnSource,
        )),
        ..defaults
    };
    let (app, _state, _sources) = common::create_test_app_with(Config::default(), &sources);

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "nobody_here", "platform": "steam" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["sources_attempted"], json!(["steam-api"]));
}

#[tokio::test]
async fn test_credential_without_fallback_is_401() {
    let (_, _, defaults) = common::create_test_app();
    let sources = TestSources {
        psn_scrape: Arc::new(ScriptedAdapter::failing(
            SourceKind::PsnScrape,
            FailureKind::NotFoundOnSource,
        )),
        ..defaults
    };
    let (app, _state, _sources) = common::create_test_app_with(Config::default(), &sources);

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "Hakoom", "platform": "playstation" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["sources_attempted"], json!(["psn-api", "psn-scrape"]));
}

#[tokio::test]
async fn test_all_sources_unavailable_is_502() {
    let (_, _, defaults) = common::create_test_app();
    let sources = TestSources {
        psn_scrape: Arc::new(ScriptedAdapter::failing(
            SourceKind::PsnScrape,
            FailureKind::ScrapeBlocked,
        )),
        ..defaults
    };
    let (app, _state, _sources) = common::create_test_app_with(Config::default(), &sources);

    let response = app
        .oneshot(post_profile(json!({ "gamerTag": "Hakoom", "platform": "playstation" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// ─── Status endpoints ────────────────────────────────────────

#[tokio::test]
async fn test_cache_stats() {
    let (app, _state, _sources) = common::create_test_app();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_profile(json!({ "gamerTag": "rabscuttle", "platform": "steam" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cache/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["hits"], 1);
    assert_eq!(body["misses"], 1);
    assert_eq!(body["size"], 1);
}

#[tokio::test]
async fn test_token_status_never_exposes_token() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/token/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["exists"], true);
    assert_eq!(body["isExpired"], false);
    assert!(!body.to_string().contains("npsso-test-value"));
}

// ─── Admin routes ────────────────────────────────────────────

fn put_token(body: Value, admin_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri("/api/token")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = admin_key {
        builder = builder.header("X-Admin-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_put_token_requires_admin_key() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(put_token(json!({ "token": "new" }), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(put_token(json!({ "token": "new" }), Some("wrong_key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_put_token_replaces_invalid_token() {
    let (app, state, _sources) = common::create_test_app();
    let generation = state.psn_token.generation().await.unwrap();
    state.psn_token.mark_invalid(generation, "expired").await;
    assert!(state.psn_token.status().await.is_expired);

    let response = app
        .oneshot(put_token(
            json!({ "token": "fresh-npsso", "expiresAt": "2099-01-01T00:00:00Z" }),
            Some("test_admin_key"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["exists"], true);
    assert_eq!(body["isExpired"], false);
    assert!(!body.to_string().contains("fresh-npsso"));
    assert!(state.psn_token.is_usable().await);
}

#[tokio::test]
async fn test_put_blank_token_is_bad_request() {
    let (app, _state, _sources) = common::create_test_app();

    let response = app
        .oneshot(put_token(json!({ "token": "  " }), Some("test_admin_key")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_hidden_without_admin_key() {
    let (_, _, sources) = common::create_test_app();
    let config = Config {
        admin_api_key: None,
        ..Config::default()
    };
    let (app, _state, _sources) = common::create_test_app_with(config, &sources);

    let response = app
        .oneshot(put_token(json!({ "token": "new" }), Some("test_admin_key")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalidate_cache_entry() {
    let (app, _state, sources) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(post_profile(json!({ "gamerTag": "Rabscuttle", "platform": "steam" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delete = |uri: &str| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .header("X-Admin-Key", "test_admin_key")
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(delete("/api/cache/steam/rabscuttle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["key"], "steam:rabscuttle");
    assert_eq!(body["removed"], true);

    let response = app
        .clone()
        .oneshot(post_profile(json!({ "gamerTag": "Rabscuttle", "platform": "steam" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sources.steam.calls(), 2);

    let response = app
        .oneshot(delete("/api/cache/sega/rabscuttle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
