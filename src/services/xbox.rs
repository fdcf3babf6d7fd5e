// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Xbox Live client (via the OpenXBL API) and source adapter.
//!
//! Xbox Live exposes titles, achievements and gamerscore but not playtime;
//! the payload carries no playtime field at all.

use crate::models::{RawPlatformPayload, SourceKind, XboxPayload, XboxTitle};
use crate::services::adapter::{is_numeric_id, AdapterError, IdentifierForm, SourceAdapter};
use crate::services::http::{build_client, check_response_json, transport_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const OPENXBL_API_BASE: &str = "https://xbl.io/api/v2";
const VENDOR: &str = "OpenXBL";

const XUID_LEN: usize = 16;
/// Classic gamertags are 15 chars; modern ones add a `#1234` suffix.
const GAMERTAG_MAX_LEN: usize = 20;

/// OpenXBL API client.
#[derive(Clone)]
pub struct XboxClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl XboxClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, OPENXBL_API_BASE)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: build_client(),
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, AdapterError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AdapterError::credential("XBOX_API_KEY is not configured"))?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("X-Authorization", key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        check_response_json(VENDOR, response).await
    }

    /// Look a gamertag up; returns the best (exact, case-insensitive) match.
    pub async fn search_gamertag(&self, gamertag: &str) -> Result<XboxPerson, AdapterError> {
        let path = format!("/search/{}", urlencoding::encode(gamertag));
        let body: SearchResponse = self.get_json(&path).await?;

        let mut people = body.people;
        let exact = people
            .iter()
            .position(|p| p.gamertag.eq_ignore_ascii_case(gamertag));
        match exact {
            Some(idx) => Ok(people.swap_remove(idx)),
            None => Err(AdapterError::not_found(format!(
                "No Xbox gamertag matching '{gamertag}'"
            ))),
        }
    }

    /// Profile settings for a known XUID.
    pub async fn account(&self, xuid: &str) -> Result<XboxPerson, AdapterError> {
        let body: AccountResponse = self.get_json(&format!("/account/{xuid}")).await?;
        let user = body
            .profile_users
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::not_found(format!("No Xbox account {xuid}")))?;

        let setting = |id: &str| {
            user.settings
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.value.clone())
        };

        Ok(XboxPerson {
            xuid: user.id.clone(),
            gamertag: setting("Gamertag").unwrap_or_else(|| xuid.to_string()),
            display_pic_raw: setting("GameDisplayPicRaw"),
            gamer_score: setting("Gamerscore"),
        })
    }

    pub async fn title_history(&self, xuid: &str) -> Result<Vec<TitleEntry>, AdapterError> {
        let body: TitleHistoryResponse = self
            .get_json(&format!("/player/titleHistory/{xuid}"))
            .await?;
        Ok(body.titles)
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    people: Vec<XboxPerson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XboxPerson {
    pub xuid: String,
    pub gamertag: String,
    pub display_pic_raw: Option<String>,
    /// OpenXBL returns gamerscore as a string.
    pub gamer_score: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(default)]
    profile_users: Vec<ProfileUser>,
}

#[derive(Debug, Deserialize)]
struct ProfileUser {
    id: String,
    #[serde(default)]
    settings: Vec<ProfileSetting>,
}

#[derive(Debug, Deserialize)]
struct ProfileSetting {
    id: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct TitleHistoryResponse {
    #[serde(default)]
    titles: Vec<TitleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleEntry {
    pub name: String,
    pub achievement: Option<TitleAchievement>,
    pub title_history: Option<TitleHistory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleAchievement {
    pub current_achievements: Option<u32>,
    pub total_achievements: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleHistory {
    pub last_time_played: Option<DateTime<Utc>>,
}

// ─── Adapter ─────────────────────────────────────────────────

/// OpenXBL source for Xbox Live profiles.
pub struct XboxApiAdapter {
    client: XboxClient,
}

impl XboxApiAdapter {
    pub fn new(client: XboxClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for XboxApiAdapter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::XboxApi
    }

    fn identifier_form(&self, identifier: &str) -> IdentifierForm {
        if is_numeric_id(identifier, XUID_LEN) {
            return IdentifierForm::Native;
        }
        let valid_gamertag = identifier.len() <= GAMERTAG_MAX_LEN
            && identifier
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
            && identifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '#');
        if valid_gamertag {
            IdentifierForm::Vanity
        } else {
            IdentifierForm::Unsupported
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<RawPlatformPayload, AdapterError> {
        let person = match self.identifier_form(identifier) {
            IdentifierForm::Native => self.client.account(identifier).await?,
            _ => self.client.search_gamertag(identifier).await?,
        };
        let titles = self.client.title_history(&person.xuid).await?;

        Ok(RawPlatformPayload::Xbox(XboxPayload {
            gamerscore: person.gamer_score.as_deref().and_then(|s| s.parse().ok()),
            xuid: person.xuid,
            gamertag: person.gamertag,
            avatar_url: person.display_pic_raw,
            titles: titles
                .into_iter()
                .map(|t| XboxTitle {
                    name: t.name,
                    last_played: t.title_history.and_then(|h| h.last_time_played),
                    current_achievements: t
                        .achievement
                        .as_ref()
                        .and_then(|a| a.current_achievements),
                    total_achievements: t.achievement.as_ref().and_then(|a| a.total_achievements),
                })
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_forms() {
        let adapter = XboxApiAdapter::new(XboxClient::new(None));
        assert_eq!(
            adapter.identifier_form("2533274800000000"),
            IdentifierForm::Native
        );
        assert_eq!(adapter.identifier_form("Major Nelson"), IdentifierForm::Vanity);
        assert_eq!(adapter.identifier_form("Player#1234"), IdentifierForm::Vanity);
        assert_eq!(adapter.identifier_form("1stPlayer"), IdentifierForm::Unsupported);
        assert_eq!(
            adapter.identifier_form("a/very/../path"),
            IdentifierForm::Unsupported
        );
    }

    #[test]
    fn test_title_history_parses_seven_digit_fraction() {
        let json = r#"{"titles":[{"name":"Halo Infinite","achievement":{"currentAchievements":12,"totalAchievements":119},"titleHistory":{"lastTimePlayed":"2024-03-01T18:22:10.1234567Z"}}]}"#;
        let body: TitleHistoryResponse = serde_json::from_str(json).unwrap();
        let title = &body.titles[0];
        assert!(title.title_history.as_ref().unwrap().last_time_played.is_some());
        assert_eq!(
            title.achievement.as_ref().unwrap().current_achievements,
            Some(12)
        );
    }
}
