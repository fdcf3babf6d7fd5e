// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform selector, lookup request and cache key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Gaming platform a profile is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub enum Platform {
    Steam,
    Xbox,
    PlayStation,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Steam, Platform::Xbox, Platform::PlayStation];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Steam => "steam",
            Platform::Xbox => "xbox",
            Platform::PlayStation => "playstation",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

/// A single profile lookup: who, and on which platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    pub platform: Platform,
    /// Vanity name or platform-native id, as supplied by the caller.
    pub identifier: String,
}

impl ProfileRequest {
    pub fn new(platform: Platform, identifier: impl Into<String>) -> Self {
        Self {
            platform,
            identifier: identifier.into(),
        }
    }

    /// Identifier with surrounding whitespace removed, in its original casing.
    ///
    /// Adapters receive this form; vendor lookups may be case sensitive.
    pub fn trimmed_identifier(&self) -> &str {
        self.identifier.trim()
    }

    /// Build the cache key, or `None` if the identifier is blank.
    pub fn cache_key(&self) -> Option<CacheKey> {
        let identifier = self.trimmed_identifier();
        if identifier.is_empty() {
            return None;
        }
        Some(CacheKey::new(self.platform, identifier))
    }
}

/// Key for cached profiles and in-flight resolutions.
///
/// Identifiers are compared case-insensitively, so `GabeN` and `gaben`
/// share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub platform: Platform,
    pub identifier: String,
}

impl CacheKey {
    pub fn new(platform: Platform, identifier: &str) -> Self {
        Self {
            platform,
            identifier: identifier.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.identifier)
    }
}
