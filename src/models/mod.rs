// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the resolution pipeline.

pub mod attempt;
pub mod payload;
pub mod platform;
pub mod profile;

pub use attempt::{AttemptOutcome, AttemptRecord, FailureKind, SourceKind};
pub use payload::{
    PlayStationPayload, PsnTitle, PsnTrophyCounts, RawPlatformPayload, SteamOwnedGame,
    SteamPayload, XboxPayload, XboxTitle,
};
pub use platform::{CacheKey, Platform, ProfileRequest};
pub use profile::{
    AchievementProgress, CanonicalProfile, GameEntry, NormalizedProfile, Qualification,
    QualificationStatus, TrophySummary,
};
