// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Steam Web API client and source adapter.
//!
//! Handles:
//! - Vanity name → SteamID64 resolution
//! - Player summary (persona, avatar, last logoff)
//! - Owned games with playtime in minutes
//! - Steam level (best effort)

use crate::models::{RawPlatformPayload, SourceKind, SteamOwnedGame, SteamPayload};
use crate::services::adapter::{
    is_handle_chars, is_numeric_id, AdapterError, IdentifierForm, SourceAdapter,
};
use crate::services::http::{build_client, check_response_json, transport_error};
use async_trait::async_trait;
use serde::Deserialize;

const STEAM_API_BASE: &str = "https://api.steampowered.com";
const VENDOR: &str = "Steam";

/// SteamID64 values are 17 decimal digits.
const STEAM_ID_LEN: usize = 17;
/// Steam custom URLs are 2-32 characters.
const VANITY_MAX_LEN: usize = 32;

/// ResolveVanityURL success code.
const VANITY_MATCH: u8 = 1;

/// Steam Web API client.
#[derive(Clone)]
pub struct SteamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SteamClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, STEAM_API_BASE)
    }

    /// Point the client at another host (tests, proxies).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: build_client(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn key(&self) -> Result<&str, AdapterError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AdapterError::credential("STEAM_API_KEY is not configured"))
    }

    /// Generic GET with the API key attached.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AdapterError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.key()?)])
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        check_response_json(VENDOR, response).await
    }

    /// Resolve a custom URL name to a SteamID64.
    pub async fn resolve_vanity(&self, vanity: &str) -> Result<String, AdapterError> {
        let body: Envelope<VanityResponse> = self
            .get_json("/ISteamUser/ResolveVanityURL/v1/", &[("vanityurl", vanity)])
            .await?;

        match body.response {
            VanityResponse {
                success: VANITY_MATCH,
                steamid: Some(id),
                ..
            } => Ok(id),
            VanityResponse { message, .. } => Err(AdapterError::not_found(format!(
                "Steam vanity name '{}' did not resolve: {}",
                vanity,
                message.unwrap_or_else(|| "no match".to_string())
            ))),
        }
    }

    pub async fn player_summary(&self, steam_id: &str) -> Result<PlayerSummary, AdapterError> {
        let body: Envelope<PlayersResponse> = self
            .get_json("/ISteamUser/GetPlayerSummaries/v2/", &[("steamids", steam_id)])
            .await?;

        body.response
            .players
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::not_found(format!("No Steam player {steam_id}")))
    }

    /// Owned games. Private libraries come back as an empty list.
    pub async fn owned_games(&self, steam_id: &str) -> Result<Vec<OwnedGame>, AdapterError> {
        let body: Envelope<OwnedGamesResponse> = self
            .get_json(
                "/IPlayerService/GetOwnedGames/v1/",
                &[
                    ("steamid", steam_id),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;
        Ok(body.response.games)
    }

    pub async fn steam_level(&self, steam_id: &str) -> Result<Option<u32>, AdapterError> {
        let body: Envelope<LevelResponse> = self
            .get_json("/IPlayerService/GetSteamLevel/v1/", &[("steamid", steam_id)])
            .await?;
        Ok(body.response.player_level)
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct VanityResponse {
    success: u8,
    steamid: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayersResponse {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSummary {
    pub steamid: String,
    pub personaname: String,
    pub avatarfull: Option<String>,
    pub lastlogoff: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    games: Vec<OwnedGame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGame {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    pub playtime_forever: u32,
    pub playtime_2weeks: Option<u32>,
    pub rtime_last_played: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LevelResponse {
    player_level: Option<u32>,
}

// ─── Adapter ─────────────────────────────────────────────────

/// Official Steam Web API source.
pub struct SteamApiAdapter {
    client: SteamClient,
}

impl SteamApiAdapter {
    pub fn new(client: SteamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for SteamApiAdapter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::SteamApi
    }

    fn identifier_form(&self, identifier: &str) -> IdentifierForm {
        if is_numeric_id(identifier, STEAM_ID_LEN) {
            IdentifierForm::Native
        } else if identifier.len() >= 2
            && identifier.len() <= VANITY_MAX_LEN
            && is_handle_chars(identifier)
        {
            IdentifierForm::Vanity
        } else {
            IdentifierForm::Unsupported
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<RawPlatformPayload, AdapterError> {
        let steam_id = match self.identifier_form(identifier) {
            IdentifierForm::Native => identifier.to_string(),
            _ => self.client.resolve_vanity(identifier).await?,
        };

        let summary = self.client.player_summary(&steam_id).await?;
        let games = self.client.owned_games(&steam_id).await?;
        let steam_level = match self.client.steam_level(&steam_id).await {
            Ok(level) => level,
            Err(e) => {
                tracing::debug!(error = %e, "Steam level unavailable, continuing");
                None
            }
        };

        Ok(RawPlatformPayload::Steam(SteamPayload {
            steam_id: summary.steamid,
            persona_name: summary.personaname,
            avatar_url: summary.avatarfull,
            last_logoff: summary.lastlogoff,
            steam_level,
            games: games
                .into_iter()
                .map(|g| SteamOwnedGame {
                    appid: g.appid,
                    name: g.name,
                    playtime_forever: g.playtime_forever,
                    playtime_2weeks: g.playtime_2weeks,
                    rtime_last_played: g.rtime_last_played,
                })
                .collect(),
        }))
    }
}
