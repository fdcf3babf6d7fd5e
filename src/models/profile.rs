// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical profile schema returned to callers.

use super::{Platform, SourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Resolved gaming profile, identical in shape for every platform.
///
/// `total_hours` and `total_games` describe the displayed (truncated)
/// `games` list, not the whole library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct CanonicalProfile {
    pub platform: Platform,
    pub identifier: String,
    pub display_name: String,
    pub total_games: u32,
    pub total_hours: u64,
    /// Most recently played first.
    pub games: Vec<GameEntry>,
    pub last_online: Option<DateTime<Utc>>,
    pub avatar_url: Option<String>,
    pub trophy_summary: Option<TrophySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamerscore: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_level: Option<u32>,
    pub data_source: SourceKind,
    pub qualification_status: QualificationStatus,
    pub qualification_reason: String,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct GameEntry {
    pub name: String,
    /// Whole hours; `None` when the platform does not expose playtime.
    pub hours_played: Option<u32>,
    pub last_played: Option<DateTime<Utc>>,
    pub recent_hours_last2_weeks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievements: Option<AchievementProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct AchievementProgress {
    pub earned: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct TrophySummary {
    pub platinum: u32,
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    pub level: u32,
}

/// How trustworthy and complete a profile is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub enum QualificationStatus {
    #[serde(rename = "authentic")]
    Authentic,
    #[serde(rename = "authentic (scraped)")]
    AuthenticScraped,
    #[serde(rename = "partial — platform limitation")]
    PartialPlatformLimitation,
}

impl QualificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QualificationStatus::Authentic => "authentic",
            QualificationStatus::AuthenticScraped => "authentic (scraped)",
            QualificationStatus::PartialPlatformLimitation => "partial — platform limitation",
        }
    }
}

/// Label plus human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualification {
    pub status: QualificationStatus,
    pub reason: String,
}

/// Normalizer output: every canonical data field, before a source and a
/// qualification are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProfile {
    pub platform: Platform,
    pub display_name: String,
    pub total_games: u32,
    pub total_hours: u64,
    pub games: Vec<GameEntry>,
    pub last_online: Option<DateTime<Utc>>,
    pub avatar_url: Option<String>,
    pub trophy_summary: Option<TrophySummary>,
    pub gamerscore: Option<u32>,
    pub steam_level: Option<u32>,
}

impl NormalizedProfile {
    pub fn finish(
        self,
        identifier: &str,
        source: SourceKind,
        qualification: Qualification,
        resolved_at: DateTime<Utc>,
    ) -> CanonicalProfile {
        CanonicalProfile {
            platform: self.platform,
            identifier: identifier.to_string(),
            display_name: self.display_name,
            total_games: self.total_games,
            total_hours: self.total_hours,
            games: self.games,
            last_online: self.last_online,
            avatar_url: self.avatar_url,
            trophy_summary: self.trophy_summary,
            gamerscore: self.gamerscore,
            steam_level: self.steam_level,
            data_source: source,
            qualification_status: qualification.status,
            qualification_reason: qualification.reason,
            resolved_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualification_status_labels() {
        for status in [
            QualificationStatus::Authentic,
            QualificationStatus::AuthenticScraped,
            QualificationStatus::PartialPlatformLimitation,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_game_entry_serializes_absent_hours_as_null() {
        let entry = GameEntry {
            name: "Halo Infinite".to_string(),
            hours_played: None,
            last_played: None,
            recent_hours_last2_weeks: None,
            achievements: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["hoursPlayed"].is_null());
        assert!(json.get("achievements").is_none());
    }
}
