// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maps vendor payloads onto the canonical profile schema.
//!
//! Each payload type implements [`PlatformMapping`], which only renames
//! fields and converts units. The shared game-list policy lives in
//! [`normalize`]:
//! 1. Drop titles with a recorded playtime of zero
//! 2. Sort by last played, newest first (no timestamp sorts last)
//! 3. Truncate to the top N
//! 4. Compute totals over the truncated list

use crate::models::{
    AchievementProgress, GameEntry, NormalizedProfile, PlayStationPayload, RawPlatformPayload,
    SteamPayload, TrophySummary, XboxPayload,
};
use chrono::{DateTime, Utc};

/// Default bound on the games list.
pub const DEFAULT_TOP_N: usize = 20;

/// Profile-level fields after renaming.
#[derive(Debug, Clone, Default)]
pub struct ProfileHeader {
    pub display_name: String,
    pub last_online: Option<DateTime<Utc>>,
    pub avatar_url: Option<String>,
    pub trophy_summary: Option<TrophySummary>,
    pub gamerscore: Option<u32>,
    pub steam_level: Option<u32>,
}

/// One title after renaming, still in minutes.
#[derive(Debug, Clone)]
pub struct GameRow {
    pub name: String,
    /// `None` when the source never exposes playtime.
    pub minutes_played: Option<u32>,
    pub last_played: Option<DateTime<Utc>>,
    pub recent_minutes: Option<u32>,
    pub achievements: Option<AchievementProgress>,
}

/// Field mapping for one platform's raw payload.
pub trait PlatformMapping {
    fn header(&self) -> ProfileHeader;
    fn game_rows(&self) -> Vec<GameRow>;
}

/// Normalize a raw payload. Pure and deterministic.
pub fn normalize(raw: &RawPlatformPayload, top_n: usize) -> NormalizedProfile {
    let mapping: &dyn PlatformMapping = match raw {
        RawPlatformPayload::Steam(p) => p,
        RawPlatformPayload::Xbox(p) => p,
        RawPlatformPayload::PlayStation(p) => p,
    };

    let header = mapping.header();
    let games = rank_games(mapping.game_rows(), top_n);

    let total_hours = games
        .iter()
        .map(|g| u64::from(g.hours_played.unwrap_or(0)))
        .sum();

    NormalizedProfile {
        platform: raw.platform(),
        display_name: header.display_name,
        total_games: games.len() as u32,
        total_hours,
        games,
        last_online: header.last_online,
        avatar_url: header.avatar_url,
        trophy_summary: header.trophy_summary,
        gamerscore: header.gamerscore,
        steam_level: header.steam_level,
    }
}

/// Apply the filter/sort/truncate policy and convert units.
fn rank_games(mut rows: Vec<GameRow>, top_n: usize) -> Vec<GameEntry> {
    rows.retain(|row| row.minutes_played != Some(0));
    // Stable: equal timestamps keep vendor order. None < Some, so a
    // descending compare puts undated titles last.
    rows.sort_by(|a, b| b.last_played.cmp(&a.last_played));
    rows.truncate(top_n);

    rows.into_iter()
        .map(|row| GameEntry {
            name: row.name,
            hours_played: row.minutes_played.map(minutes_to_hours),
            last_played: row.last_played,
            recent_hours_last2_weeks: row.recent_minutes.map(minutes_to_hours),
            achievements: row.achievements,
        })
        .collect()
}

/// Whole hours, fractional hours truncated.
pub fn minutes_to_hours(minutes: u32) -> u32 {
    minutes / 60
}

fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    // Steam uses 0 for "never".
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

fn achievement_progress(earned: Option<u32>, total: Option<u32>) -> Option<AchievementProgress> {
    match (earned, total) {
        (Some(earned), Some(total)) if total > 0 => Some(AchievementProgress { earned, total }),
        _ => None,
    }
}

// ─── Per-platform mapping tables ─────────────────────────────

impl PlatformMapping for SteamPayload {
    fn header(&self) -> ProfileHeader {
        ProfileHeader {
            display_name: self.persona_name.clone(),
            last_online: self.last_logoff.and_then(unix_to_utc),
            avatar_url: self.avatar_url.clone(),
            trophy_summary: None,
            gamerscore: None,
            steam_level: self.steam_level,
        }
    }

    fn game_rows(&self) -> Vec<GameRow> {
        self.games
            .iter()
            .map(|g| GameRow {
                name: g.name.clone(),
                minutes_played: Some(g.playtime_forever),
                last_played: g.rtime_last_played.and_then(unix_to_utc),
                recent_minutes: g.playtime_2weeks,
                achievements: None,
            })
            .collect()
    }
}

impl PlatformMapping for XboxPayload {
    fn header(&self) -> ProfileHeader {
        ProfileHeader {
            display_name: self.gamertag.clone(),
            last_online: None,
            avatar_url: self.avatar_url.clone(),
            trophy_summary: None,
            gamerscore: self.gamerscore,
            steam_level: None,
        }
    }

    fn game_rows(&self) -> Vec<GameRow> {
        self.titles
            .iter()
            .map(|t| GameRow {
                name: t.name.clone(),
                minutes_played: None,
                last_played: t.last_played,
                recent_minutes: None,
                achievements: achievement_progress(t.current_achievements, t.total_achievements),
            })
            .collect()
    }
}

impl PlatformMapping for PlayStationPayload {
    fn header(&self) -> ProfileHeader {
        ProfileHeader {
            display_name: self.online_id.clone(),
            last_online: self.last_online,
            avatar_url: self.avatar_url.clone(),
            trophy_summary: self.trophies.map(|t| TrophySummary {
                platinum: t.platinum,
                gold: t.gold,
                silver: t.silver,
                bronze: t.bronze,
                level: t.level,
            }),
            gamerscore: None,
            steam_level: None,
        }
    }

    fn game_rows(&self) -> Vec<GameRow> {
        self.titles
            .iter()
            .map(|t| GameRow {
                name: t.name.clone(),
                minutes_played: t.play_minutes,
                last_played: t.last_played,
                recent_minutes: None,
                achievements: achievement_progress(t.earned_trophies, t.total_trophies),
            })
            .collect()
    }
}
