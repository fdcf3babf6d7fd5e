// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data-quality labels for resolved profiles.
//!
//! This rule table is the only place quality is decided.

use crate::models::{NormalizedProfile, Qualification, QualificationStatus, SourceKind};

/// Label a profile by which source produced it and which fields it has.
///
/// Rules, first match wins:
/// 1. Scraped source: `authentic (scraped)`
/// 2. Official API, some game lacks playtime: `partial — platform limitation`
/// 3. Official API, no games at all: `partial — platform limitation`
/// 4. Otherwise: `authentic`
pub fn classify(source: SourceKind, profile: &NormalizedProfile) -> Qualification {
    if source.is_scrape() {
        return Qualification {
            status: QualificationStatus::AuthenticScraped,
            reason: format!(
                "Scraped from the public {} profile page via {}",
                profile.platform, source
            ),
        };
    }

    let missing_hours = profile
        .games
        .iter()
        .filter(|g| g.hours_played.is_none())
        .count();
    if missing_hours > 0 {
        return Qualification {
            status: QualificationStatus::PartialPlatformLimitation,
            reason: format!(
                "{} does not expose hoursPlayed ({} of {} games); totalHours counts reported values only",
                profile.platform,
                missing_hours,
                profile.games.len()
            ),
        };
    }

    if profile.games.is_empty() {
        return Qualification {
            status: QualificationStatus::PartialPlatformLimitation,
            reason: format!(
                "{} returned no played games; the library may be private",
                profile.platform
            ),
        };
    }

    Qualification {
        status: QualificationStatus::Authentic,
        reason: format!("Complete profile from the official {} API", profile.platform),
    }
}
