// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Playtrack: resolve gaming profiles across Steam, Xbox and PlayStation
//!
//! Each platform has an ordered chain of sources (official APIs first,
//! browser scraping last). The first source that succeeds wins; its payload
//! is normalized into one canonical profile shape and labeled with how
//! trustworthy it is.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use models::Platform;
use services::{
    BrowserLauncher, EventSink, ProfileResolver, PsnApiAdapter, PsnClient, PsnEndpoints,
    PsnScrapeAdapter, ResultCache, SourceAdapter, SteamApiAdapter, SteamClient, TokenManager,
    TracingEventSink, XboxApiAdapter, XboxClient,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub resolver: ProfileResolver,
    /// PSN session credential, refreshable through the admin API.
    pub psn_token: Arc<TokenManager>,
}

impl AppState {
    /// Wire the production source chains.
    ///
    /// PlayStation tries the official API before scraping; Steam and Xbox
    /// have a single official source each.
    pub fn from_config(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let psn_client = PsnClient::new(PsnEndpoints::default());

        let mut psn_token = TokenManager::new(
            "psn-npsso",
            Arc::new(psn_client.clone()),
            config.token_staleness,
        );
        if let Some(npsso) = &config.psn_npsso {
            psn_token = psn_token.with_token(npsso.clone(), config.psn_npsso_expires_at);
        }
        let psn_token = Arc::new(psn_token);

        let steam: Arc<dyn SourceAdapter> = Arc::new(SteamApiAdapter::new(SteamClient::new(
            config.steam_api_key.clone(),
        )));
        let xbox: Arc<dyn SourceAdapter> = Arc::new(XboxApiAdapter::new(XboxClient::new(
            config.xbox_api_key.clone(),
        )));
        let psn_api: Arc<dyn SourceAdapter> =
            Arc::new(PsnApiAdapter::new(psn_client, psn_token.clone()));
        let psn_scrape: Arc<dyn SourceAdapter> = Arc::new(PsnScrapeAdapter::new(
            launcher,
            config.psnprofiles_base_url.clone(),
        ));

        let cache = Arc::new(ResultCache::new(config.cache_ttl));
        let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
        let resolver = ProfileResolver::new(cache, events, config.resolver_settings())
            .with_chain(Platform::Steam, vec![steam])
            .with_chain(Platform::Xbox, vec![xbox])
            .with_chain(Platform::PlayStation, vec![psn_api, psn_scrape]);

        Self {
            config,
            resolver,
            psn_token,
        }
    }
}
