// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PlayStation Network API client and source adapter.
//!
//! Authentication uses a long-lived NPSSO session token owned by the
//! [`TokenManager`]. Per call we exchange it for a short-lived access token:
//! 1. NPSSO cookie → authorization code (redirect `Location` header)
//! 2. Authorization code → bearer access token
//!
//! The access token is cached until shortly before expiry. The NPSSO itself
//! is never refreshed here.

use crate::models::{
    FailureKind, PlayStationPayload, PsnTitle, PsnTrophyCounts, RawPlatformPayload, SourceKind,
};
use crate::services::adapter::{is_handle_chars, AdapterError, IdentifierForm, SourceAdapter};
use crate::services::http::{
    build_client, check_response_json, failure_kind_for_status, transport_error, REQUEST_TIMEOUT,
};
use crate::services::token::{
    SecretToken, SessionCredential, TokenManager, TokenValidator, ValidationError,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

const VENDOR: &str = "PSN";

/// Public client id and secret of the PlayStation mobile app.
const PSN_CLIENT_ID: &str = "09515159-7237-4370-9b40-3806e67c0891";
const PSN_BASIC_AUTH: &str =
    "Basic MDk1MTUxNTktNzIzNy00MzcwLTliNDAtMzgwNmU2N2MwODkxOnVjUGprYTV0bnRCMktxc1A=";
const PSN_REDIRECT_URI: &str = "com.scee.psxandroid.scecompcall://redirect";
const PSN_SCOPE: &str = "psn:mobile.v2.core psn:clientapp";

/// Margin before access token expiration when we exchange again (5 minutes).
const ACCESS_REFRESH_MARGIN_SECS: i64 = 5 * 60;

const ONLINE_ID_MIN_LEN: usize = 3;
const ONLINE_ID_MAX_LEN: usize = 16;
const GAME_LIST_LIMIT: &str = "200";

/// Host roots for the three PSN services we talk to.
#[derive(Debug, Clone)]
pub struct PsnEndpoints {
    pub auth_base: String,
    pub api_base: String,
    pub legacy_profile_base: String,
}

impl Default for PsnEndpoints {
    fn default() -> Self {
        Self {
            auth_base: "https://ca.account.sony.com/api/authz/v3/oauth".to_string(),
            api_base: "https://m.np.playstation.com/api".to_string(),
            legacy_profile_base: "https://us-prof.np.community.playstation.net/userProfile/v1/users"
                .to_string(),
        }
    }
}

/// PSN online ids: 3-16 chars, leading letter, `[A-Za-z0-9_-]`.
pub(crate) fn is_online_id(identifier: &str) -> bool {
    (ONLINE_ID_MIN_LEN..=ONLINE_ID_MAX_LEN).contains(&identifier.len())
        && identifier
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && is_handle_chars(identifier)
}

/// PSN account ids are unsigned 64-bit decimals.
fn is_account_id(identifier: &str) -> bool {
    identifier.len() >= 16 && identifier.parse::<u64>().is_ok()
}

/// Parse an ISO 8601 duration such as `PT228H56M33S` into whole minutes.
pub fn parse_play_duration(value: &str) -> Option<u32> {
    let rest = value.strip_prefix('P')?;
    let (date, time) = rest.split_once('T').unwrap_or((rest, ""));

    const DATE_UNITS: &[(char, f64)] = &[('D', 86_400.0)];
    const TIME_UNITS: &[(char, f64)] = &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)];

    let mut seconds = 0.0;
    for (part, units) in [(date, DATE_UNITS), (time, TIME_UNITS)] {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                continue;
            }
            let factor = units.iter().find(|(unit, _)| *unit == c)?.1;
            seconds += number.parse::<f64>().ok()? * factor;
            number.clear();
        }
        if !number.is_empty() {
            return None;
        }
    }
    u32::try_from((seconds / 60.0) as u64).ok()
}

/// PlayStation Network API client.
#[derive(Clone)]
pub struct PsnClient {
    http: reqwest::Client,
    /// Separate client: the authorize step must see the redirect, not follow it.
    auth_http: reqwest::Client,
    endpoints: PsnEndpoints,
}

impl PsnClient {
    pub fn new(endpoints: PsnEndpoints) -> Self {
        let auth_http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default PSN auth client");
                reqwest::Client::new()
            });
        Self {
            http: build_client(),
            auth_http,
            endpoints,
        }
    }

    /// Exchange the NPSSO cookie for a one-time authorization code.
    pub async fn authorization_code(&self, npsso: &SecretToken) -> Result<String, AdapterError> {
        let url = format!("{}/authorize", self.endpoints.auth_base);
        let response = self
            .auth_http
            .get(&url)
            .query(&[
                ("access_type", "offline"),
                ("client_id", PSN_CLIENT_ID),
                ("redirect_uri", PSN_REDIRECT_URI),
                ("response_type", "code"),
                ("scope", PSN_SCOPE),
            ])
            .header(reqwest::header::COOKIE, format!("npsso={}", npsso.expose()))
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(AdapterError::new(
                failure_kind_for_status(status),
                format!("PSN authorize returned HTTP {status}"),
            ));
        }

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| reqwest::Url::parse(location).ok())
            .and_then(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == "code")
                    .map(|(_, v)| v.into_owned())
            })
            .ok_or_else(|| AdapterError::credential("PSN rejected the NPSSO session token"))
    }

    /// Exchange an authorization code for an access token.
    pub async fn access_token(&self, code: &str) -> Result<AccessTokenResponse, AdapterError> {
        let url = format!("{}/token", self.endpoints.auth_base);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, PSN_BASIC_AUTH)
            .form(&[
                ("code", code),
                ("redirect_uri", PSN_REDIRECT_URI),
                ("grant_type", "authorization_code"),
                ("token_format", "jwt"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        check_response_json(VENDOR, response).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        access: &SecretToken,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AdapterError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access.expose())
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        check_response_json(VENDOR, response).await
    }

    /// Like `get_json`, but a 403 (privacy setting) yields `None`.
    async fn get_json_unless_private<T: for<'de> Deserialize<'de>>(
        &self,
        access: &SecretToken,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, AdapterError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access.expose())
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        check_response_json(VENDOR, response).await.map(Some)
    }

    /// Resolve an online id to its account id and avatar.
    pub async fn profile_by_online_id(
        &self,
        access: &SecretToken,
        online_id: &str,
    ) -> Result<PsnIdentity, AdapterError> {
        let url = format!(
            "{}/{}/profile2",
            self.endpoints.legacy_profile_base,
            urlencoding::encode(online_id)
        );
        let body: LegacyProfileResponse = self
            .get_json(
                access,
                &url,
                &[("fields", "accountId,onlineId,currentOnlineId,avatarUrls")],
            )
            .await?;

        Ok(PsnIdentity {
            account_id: body.profile.account_id,
            online_id: body.profile.online_id,
            avatar_url: body.profile.avatar_urls.into_iter().last().map(|a| a.avatar_url),
        })
    }

    pub async fn profile_by_account_id(
        &self,
        access: &SecretToken,
        account_id: &str,
    ) -> Result<PsnIdentity, AdapterError> {
        let url = format!(
            "{}/userProfile/v1/internal/users/{}/profiles",
            self.endpoints.api_base, account_id
        );
        let body: ProfileResponse = self.get_json(access, &url, &[]).await?;
        Ok(PsnIdentity {
            account_id: account_id.to_string(),
            online_id: body.online_id,
            avatar_url: body.avatars.into_iter().last().map(|a| a.url),
        })
    }

    /// Trophy level and counts; `None` if the user hides trophies.
    pub async fn trophy_summary(
        &self,
        access: &SecretToken,
        account_id: &str,
    ) -> Result<Option<PsnTrophyCounts>, AdapterError> {
        let url = format!(
            "{}/trophy/v1/users/{}/trophySummary",
            self.endpoints.api_base, account_id
        );
        let body: Option<TrophySummaryResponse> =
            self.get_json_unless_private(access, &url, &[]).await?;
        Ok(body.map(|b| PsnTrophyCounts {
            level: b.trophy_level,
            platinum: b.earned_trophies.platinum,
            gold: b.earned_trophies.gold,
            silver: b.earned_trophies.silver,
            bronze: b.earned_trophies.bronze,
        }))
    }

    /// Played titles with play duration; empty if the list is private.
    pub async fn played_titles(
        &self,
        access: &SecretToken,
        account_id: &str,
    ) -> Result<Vec<PlayedTitle>, AdapterError> {
        let url = format!(
            "{}/gamelist/v2/users/{}/titles",
            self.endpoints.api_base, account_id
        );
        let body: Option<GameListResponse> = self
            .get_json_unless_private(
                access,
                &url,
                &[
                    ("categories", "ps4_game,ps5_native_game"),
                    ("limit", GAME_LIST_LIMIT),
                    ("offset", "0"),
                ],
            )
            .await?;
        Ok(body.map(|b| b.titles).unwrap_or_default())
    }

    pub async fn last_online(
        &self,
        access: &SecretToken,
        account_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AdapterError> {
        let url = format!(
            "{}/userProfile/v1/internal/users/{}/basicPresences",
            self.endpoints.api_base, account_id
        );
        let body: Option<PresenceResponse> = self
            .get_json_unless_private(access, &url, &[("type", "primary")])
            .await?;
        Ok(body
            .and_then(|b| b.basic_presence.primary_platform_info)
            .and_then(|p| p.last_online_date))
    }
}

#[async_trait]
impl TokenValidator for PsnClient {
    /// An NPSSO is valid iff PSN still issues authorization codes for it.
    async fn validate(&self, token: &SecretToken) -> Result<(), ValidationError> {
        match self.authorization_code(token).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind == FailureKind::CredentialInvalid => {
                Err(ValidationError::Rejected(e.message))
            }
            Err(e) => Err(ValidationError::Unavailable(e.message)),
        }
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct PsnIdentity {
    pub account_id: String,
    pub online_id: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyProfileResponse {
    profile: LegacyProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProfile {
    account_id: String,
    online_id: String,
    #[serde(default)]
    avatar_urls: Vec<LegacyAvatar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAvatar {
    avatar_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    online_id: String,
    #[serde(default)]
    avatars: Vec<Avatar>,
}

#[derive(Debug, Deserialize)]
struct Avatar {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrophySummaryResponse {
    trophy_level: u32,
    earned_trophies: EarnedTrophies,
}

#[derive(Debug, Deserialize)]
struct EarnedTrophies {
    bronze: u32,
    silver: u32,
    gold: u32,
    platinum: u32,
}

#[derive(Debug, Deserialize)]
struct GameListResponse {
    #[serde(default)]
    titles: Vec<PlayedTitle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedTitle {
    pub name: String,
    pub play_duration: Option<String>,
    pub last_played_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresenceResponse {
    basic_presence: BasicPresence,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BasicPresence {
    primary_platform_info: Option<PlatformInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformInfo {
    last_online_date: Option<DateTime<Utc>>,
}

// ─── Adapter ─────────────────────────────────────────────────

/// Access token derived from one NPSSO generation.
struct CachedAccess {
    generation: u64,
    token: SecretToken,
    expires_at: DateTime<Utc>,
}

/// Official PSN API source (requires an NPSSO session token).
pub struct PsnApiAdapter {
    client: PsnClient,
    session: Arc<TokenManager>,
    access: Mutex<Option<CachedAccess>>,
}

impl PsnApiAdapter {
    pub fn new(client: PsnClient, session: Arc<TokenManager>) -> Self {
        Self {
            client,
            session,
            access: Mutex::new(None),
        }
    }

    /// Cached access token for this NPSSO generation, exchanging if needed.
    async fn access_token(
        &self,
        credential: &SessionCredential,
    ) -> Result<SecretToken, AdapterError> {
        let margin = Duration::seconds(ACCESS_REFRESH_MARGIN_SECS);
        let mut cached = self.access.lock().await;

        if let Some(access) = cached.as_ref() {
            if access.generation == credential.generation
                && Utc::now() + margin < access.expires_at
            {
                return Ok(access.token.clone());
            }
        }

        let code = self.client.authorization_code(&credential.token).await?;
        let response = self.client.access_token(&code).await?;
        let token = SecretToken::new(response.access_token);

        // An out-of-range lifetime counts as already expired.
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or_else(Utc::now);
        *cached = Some(CachedAccess {
            generation: credential.generation,
            token: token.clone(),
            expires_at,
        });
        tracing::debug!("PSN access token exchanged and cached");
        Ok(token)
    }

    async fn fetch_with(
        &self,
        access: &SecretToken,
        identifier: &str,
    ) -> Result<RawPlatformPayload, AdapterError> {
        let identity = if is_account_id(identifier) {
            self.client.profile_by_account_id(access, identifier).await?
        } else {
            self.client.profile_by_online_id(access, identifier).await?
        };

        let trophies = self
            .client
            .trophy_summary(access, &identity.account_id)
            .await?;
        let titles = self
            .client
            .played_titles(access, &identity.account_id)
            .await?;
        let last_online = match self.client.last_online(access, &identity.account_id).await {
            Ok(at) => at,
            Err(e) => {
                tracing::debug!(error = %e, "PSN presence unavailable, continuing");
                None
            }
        };

        Ok(RawPlatformPayload::PlayStation(PlayStationPayload {
            online_id: identity.online_id,
            account_id: Some(identity.account_id),
            avatar_url: identity.avatar_url,
            last_online,
            trophies,
            titles: titles
                .into_iter()
                .map(|t| PsnTitle {
                    play_minutes: t.play_duration.as_deref().and_then(parse_play_duration),
                    name: t.name,
                    last_played: t.last_played_date_time,
                    earned_trophies: None,
                    total_trophies: None,
                })
                .collect(),
        }))
    }
}

#[async_trait]
impl SourceAdapter for PsnApiAdapter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::PsnApi
    }

    fn credential(&self) -> Option<&TokenManager> {
        Some(&self.session)
    }

    fn identifier_form(&self, identifier: &str) -> IdentifierForm {
        if is_account_id(identifier) {
            IdentifierForm::Native
        } else if is_online_id(identifier) {
            IdentifierForm::Vanity
        } else {
            IdentifierForm::Unsupported
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<RawPlatformPayload, AdapterError> {
        let credential = self
            .session
            .current()
            .await
            .ok_or_else(|| AdapterError::credential("PSN session token missing or invalid"))?;

        let result = match self.access_token(&credential).await {
            Ok(access) => self.fetch_with(&access, identifier).await,
            Err(e) => Err(e),
        };

        match result {
            Err(e) if e.kind == FailureKind::CredentialInvalid => {
                // Force a fresh exchange next time.
                *self.access.lock().await = None;
                Err(e.with_generation(credential.generation))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_duration() {
        assert_eq!(parse_play_duration("PT228H56M33S"), Some(228 * 60 + 56));
        assert_eq!(parse_play_duration("PT45M"), Some(45));
        assert_eq!(parse_play_duration("P1DT1H"), Some(25 * 60));
        assert_eq!(parse_play_duration("PT59S"), Some(0));
        assert_eq!(parse_play_duration("PT1.5H"), Some(90));
        assert_eq!(parse_play_duration("228:56"), None);
        assert_eq!(parse_play_duration("PT12"), None);
    }

    #[test]
    fn test_identifier_checks() {
        assert!(is_online_id("Hakoom"));
        assert!(is_online_id("Player_One-99"));
        assert!(!is_online_id("ab"));
        assert!(!is_online_id("9lives"));
        assert!(!is_online_id("this-name-is-way-too-long"));
        assert!(is_account_id("1234567890123456789"));
        assert!(!is_account_id("12345"));
    }
}
