// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Playtrack API Server
//!
//! Resolves Steam, Xbox and PlayStation profiles into one canonical shape,
//! falling back across sources when an official API is unavailable.

use anyhow::Context;
use playtrack::{config::Config, services::spawn_sweeper, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Playtrack API");

    if config.psn_npsso.is_none() {
        tracing::warn!("PSN_NPSSO not set; PlayStation requests will fall back to scraping");
    }
    if config.admin_api_key.is_none() {
        tracing::info!("ADMIN_API_KEY not set; admin routes disabled");
    }

    let launcher = browser_launcher(&config);
    let sweep_interval = config.cache_sweep_interval;
    let port = config.port;

    let state = Arc::new(AppState::from_config(config, launcher));

    if let Some(every) = sweep_interval {
        spawn_sweeper(state.resolver.cache().clone(), every);
        tracing::info!(interval_secs = every.as_secs(), "Cache sweeper started");
    }

    // Build router
    let app = playtrack::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "browser")]
fn browser_launcher(config: &Config) -> Arc<dyn playtrack::services::BrowserLauncher> {
    tracing::info!("Headless Chromium enabled for PSN scraping");
    Arc::new(playtrack::services::ChromiumLauncher::new(
        config.chrome_path.as_ref().map(std::path::PathBuf::from),
        config.attempt_timeout,
    ))
}

#[cfg(not(feature = "browser"))]
fn browser_launcher(_config: &Config) -> Arc<dyn playtrack::services::BrowserLauncher> {
    tracing::warn!("Built without the `browser` feature; PSN scraping disabled");
    Arc::new(playtrack::services::NoBrowser)
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("playtrack=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
