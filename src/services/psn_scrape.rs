// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Browser-automated PSN fallback: scrapes a public PSNProfiles page.
//!
//! Each attempt launches its own browser session and releases it on every
//! exit path. Sessions are never shared between resolutions.

use crate::models::{
    FailureKind, PlayStationPayload, PsnTitle, PsnTrophyCounts, RawPlatformPayload, SourceKind,
};
use crate::services::adapter::{AdapterError, IdentifierForm, SourceAdapter};
use crate::services::playstation::is_online_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_PSNPROFILES_URL: &str = "https://psnprofiles.com";

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),
}

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One live browser. Implementations must also release the underlying
/// process when dropped without `close` (cancellation, timeout).
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError>;
    async fn close(self: Box<Self>);
}

/// Launcher used when no browser is available; every attempt fails as
/// upstream-unavailable and the chain moves on.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

#[async_trait]
impl BrowserLauncher for NoBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Err(BrowserError::Unavailable(
            "built without the `browser` feature".to_string(),
        ))
    }
}

/// Open `url` in a fresh session, run `script`, and always close the session.
///
/// If the caller drops this future first, the session is released by its
/// `Drop` instead.
pub async fn scrape_page(
    launcher: &dyn BrowserLauncher,
    url: &str,
    script: &str,
) -> Result<serde_json::Value, BrowserError> {
    let mut session = launcher.launch().await?;
    let result = async {
        session.goto(url).await?;
        session.evaluate(script).await
    }
    .await;
    session.close().await;
    result
}

/// Extracts the profile from the rendered page as JSON.
const EXTRACT_SCRIPT: &str = r##"(() => {
  const txt = (el) => (el && el.textContent ? el.textContent.trim() : '');
  const num = (s) => {
    const n = parseInt(String(s).replace(/[^0-9]/g, ''), 10);
    return Number.isNaN(n) ? null : n;
  };
  if (document.title.includes('Just a moment') ||
      document.querySelector('#challenge-form, #cf-challenge-running')) {
    return { status: 'blocked', reason: 'bot challenge page' };
  }
  const bar = document.querySelector('#user-bar');
  if (!bar) {
    return { status: 'not_found' };
  }
  const count = (cls) => num(txt(bar.querySelector('li.' + cls)));
  const avatar = bar.querySelector('.avatar img');
  const games = Array.from(document.querySelectorAll('#gamesTable tr')).map((row) => {
    const title = row.querySelector('a.title');
    if (!title) {
      return null;
    }
    const progress = txt(row.querySelector('.small-info')).match(/(\d+)\s+of\s+(\d+)/);
    return {
      name: txt(title),
      lastPlayed: null,
      earned: progress ? num(progress[1]) : null,
      total: progress ? num(progress[2]) : null,
    };
  }).filter(Boolean);
  return {
    status: 'ok',
    onlineId: txt(bar.querySelector('.username')),
    avatarUrl: avatar ? avatar.src : null,
    level: num(txt(bar.querySelector('.trophy-count .level'))),
    platinum: count('platinum'),
    gold: count('gold'),
    silver: count('silver'),
    bronze: count('bronze'),
    games,
  };
})()"##;

/// What the extraction script reports.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapedPage {
    Ok(ScrapedProfile),
    Blocked { reason: Option<String> },
    NotFound,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedProfile {
    pub online_id: String,
    pub avatar_url: Option<String>,
    pub level: Option<u32>,
    pub platinum: Option<u32>,
    pub gold: Option<u32>,
    pub silver: Option<u32>,
    pub bronze: Option<u32>,
    #[serde(default)]
    pub games: Vec<ScrapedGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedGame {
    pub name: String,
    pub last_played: Option<DateTime<Utc>>,
    pub earned: Option<u32>,
    pub total: Option<u32>,
}

impl ScrapedPage {
    /// Map the page onto a PSN payload, or the matching failure kind.
    pub fn into_payload(self, identifier: &str) -> Result<PlayStationPayload, AdapterError> {
        let profile = match self {
            ScrapedPage::Ok(profile) => profile,
            ScrapedPage::Blocked { reason } => {
                return Err(AdapterError::new(
                    FailureKind::ScrapeBlocked,
                    reason.unwrap_or_else(|| "scrape blocked".to_string()),
                ))
            }
            ScrapedPage::NotFound => {
                return Err(AdapterError::not_found(format!(
                    "No public PSNProfiles page for '{identifier}'"
                )))
            }
        };

        let trophies = match (
            profile.level,
            profile.platinum,
            profile.gold,
            profile.silver,
            profile.bronze,
        ) {
            (Some(level), Some(platinum), Some(gold), Some(silver), Some(bronze)) => {
                Some(PsnTrophyCounts {
                    level,
                    platinum,
                    gold,
                    silver,
                    bronze,
                })
            }
            _ => None,
        };

        let online_id = if profile.online_id.is_empty() {
            identifier.to_string()
        } else {
            profile.online_id
        };

        Ok(PlayStationPayload {
            online_id,
            account_id: None,
            avatar_url: profile.avatar_url,
            last_online: None,
            trophies,
            titles: profile
                .games
                .into_iter()
                .map(|g| PsnTitle {
                    name: g.name,
                    play_minutes: None,
                    last_played: g.last_played,
                    earned_trophies: g.earned,
                    total_trophies: g.total,
                })
                .collect(),
        })
    }
}

/// Scraping source for PlayStation profiles.
pub struct PsnScrapeAdapter {
    launcher: Arc<dyn BrowserLauncher>,
    base_url: String,
}

impl PsnScrapeAdapter {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, base_url: impl Into<String>) -> Self {
        Self {
            launcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for PsnScrapeAdapter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::PsnScrape
    }

    fn identifier_form(&self, identifier: &str) -> IdentifierForm {
        // Profile pages are addressed by online id only.
        if is_online_id(identifier) {
            IdentifierForm::Vanity
        } else {
            IdentifierForm::Unsupported
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<RawPlatformPayload, AdapterError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(identifier)
        );

        let value = scrape_page(self.launcher.as_ref(), &url, EXTRACT_SCRIPT)
            .await
            .map_err(|e| AdapterError::unavailable(e.to_string()))?;

        let page: ScrapedPage = serde_json::from_value(value)
            .map_err(|e| AdapterError::unavailable(format!("Unexpected scrape result: {e}")))?;

        page.into_payload(identifier)
            .map(RawPlatformPayload::PlayStation)
    }
}
