// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Vendor keys are optional: a source without its key reports its credential
//! as invalid and the fallback chain moves on.

use crate::services::orchestrator::ResolverSettings;
use crate::services::psn_scrape::DEFAULT_PSNPROFILES_URL;
use chrono::{DateTime, Utc};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,

    // --- Vendor credentials ---
    pub steam_api_key: Option<String>,
    pub xbox_api_key: Option<String>,
    /// PSN session token (NPSSO cookie value)
    pub psn_npsso: Option<String>,
    pub psn_npsso_expires_at: Option<DateTime<Utc>>,

    // --- Scraping ---
    pub psnprofiles_base_url: String,
    /// Chromium binary; autodetected when unset
    pub chrome_path: Option<String>,

    // --- Pipeline tuning ---
    pub cache_ttl: Duration,
    /// `None` disables the periodic sweep
    pub cache_sweep_interval: Option<Duration>,
    pub attempt_timeout: Duration,
    pub resolution_deadline: Duration,
    pub token_staleness: Duration,
    pub top_n_games: usize,

    /// Enables the admin routes when set
    pub admin_api_key: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            steam_api_key: None,
            xbox_api_key: None,
            psn_npsso: None,
            psn_npsso_expires_at: None,
            psnprofiles_base_url: DEFAULT_PSNPROFILES_URL.to_string(),
            chrome_path: None,
            cache_ttl: Duration::from_secs(3600),
            cache_sweep_interval: Some(Duration::from_secs(600)),
            attempt_timeout: Duration::from_secs(15),
            resolution_deadline: Duration::from_secs(45),
            token_staleness: Duration::from_secs(1800),
            top_n_games: 20,
            admin_api_key: Some("test_admin_key".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let sweep_secs: u64 = vars.parse_or("CACHE_SWEEP_SECS", 600)?;

        Ok(Self {
            port: vars.parse_or("PORT", 8080)?,
            frontend_url: vars
                .optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),

            steam_api_key: vars.optional("STEAM_API_KEY"),
            xbox_api_key: vars.optional("XBOX_API_KEY"),
            psn_npsso: vars.optional("PSN_NPSSO"),
            psn_npsso_expires_at: vars
                .optional("PSN_NPSSO_EXPIRES_AT")
                .map(|raw| {
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|e| ConfigError::Invalid {
                            name: "PSN_NPSSO_EXPIRES_AT",
                            reason: e.to_string(),
                        })
                })
                .transpose()?,

            psnprofiles_base_url: vars
                .optional("PSNPROFILES_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PSNPROFILES_URL.to_string()),
            chrome_path: vars.optional("CHROME_PATH"),

            cache_ttl: Duration::from_secs(vars.parse_or("CACHE_TTL_SECS", 3600)?),
            cache_sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            attempt_timeout: Duration::from_secs(vars.parse_or("ATTEMPT_TIMEOUT_SECS", 15)?),
            resolution_deadline: Duration::from_secs(
                vars.parse_or("RESOLUTION_DEADLINE_SECS", 45)?,
            ),
            token_staleness: Duration::from_secs(vars.parse_or("TOKEN_STALENESS_SECS", 1800)?),
            top_n_games: vars.parse_or("TOP_N_GAMES", 20)?,

            admin_api_key: vars.optional("ADMIN_API_KEY"),
        })
    }

    /// Resolver bounds derived from this configuration.
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            attempt_timeout: self.attempt_timeout,
            deadline: self.resolution_deadline,
            top_n: self.top_n_games,
            ..ResolverSettings::default()
        }
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, with blank treated as unset.
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: format!("'{raw}': {e}"),
            }),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
