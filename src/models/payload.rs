// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw per-platform payloads returned by source adapters.
//!
//! Each variant mirrors what one vendor exposes, in vendor units. Only the
//! normalizer interprets these.

use super::Platform;
use chrono::{DateTime, Utc};

/// Successful adapter output, tagged by platform.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPlatformPayload {
    Steam(SteamPayload),
    Xbox(XboxPayload),
    PlayStation(PlayStationPayload),
}

impl RawPlatformPayload {
    pub fn platform(&self) -> Platform {
        match self {
            RawPlatformPayload::Steam(_) => Platform::Steam,
            RawPlatformPayload::Xbox(_) => Platform::Xbox,
            RawPlatformPayload::PlayStation(_) => Platform::PlayStation,
        }
    }
}

// ─── Steam ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SteamPayload {
    /// 64-bit SteamID as a decimal string.
    pub steam_id: String,
    pub persona_name: String,
    pub avatar_url: Option<String>,
    /// Unix seconds.
    pub last_logoff: Option<i64>,
    pub steam_level: Option<u32>,
    pub games: Vec<SteamOwnedGame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SteamOwnedGame {
    pub appid: u64,
    pub name: String,
    /// Lifetime playtime in minutes.
    pub playtime_forever: u32,
    /// Minutes over the last two weeks, when Steam reports it.
    pub playtime_2weeks: Option<u32>,
    /// Unix seconds; Steam reports 0 for "never".
    pub rtime_last_played: Option<i64>,
}

// ─── Xbox ────────────────────────────────────────────────────

/// Xbox Live profile. Xbox Live does not expose playtime.
#[derive(Debug, Clone, PartialEq)]
pub struct XboxPayload {
    pub xuid: String,
    pub gamertag: String,
    pub avatar_url: Option<String>,
    pub gamerscore: Option<u32>,
    pub titles: Vec<XboxTitle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XboxTitle {
    pub name: String,
    pub last_played: Option<DateTime<Utc>>,
    pub current_achievements: Option<u32>,
    pub total_achievements: Option<u32>,
}

// ─── PlayStation ─────────────────────────────────────────────

/// PSN profile, produced by both the official API and the scraper.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayStationPayload {
    pub online_id: String,
    pub account_id: Option<String>,
    pub avatar_url: Option<String>,
    pub last_online: Option<DateTime<Utc>>,
    pub trophies: Option<PsnTrophyCounts>,
    pub titles: Vec<PsnTitle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsnTrophyCounts {
    pub level: u32,
    pub platinum: u32,
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PsnTitle {
    pub name: String,
    /// Total play duration in minutes, if the source exposes it.
    pub play_minutes: Option<u32>,
    pub last_played: Option<DateTime<Utc>>,
    pub earned_trophies: Option<u32>,
    pub total_trophies: Option<u32>,
}
