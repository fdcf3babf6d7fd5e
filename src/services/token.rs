// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session credential lifecycle.
//!
//! The manager owns one externally issued token (e.g. a PSN NPSSO). It:
//! - Rejects tokens that are missing, marked invalid, or past expiry
//! - Validates unknown-expiry tokens lazily, at most once per staleness window
//! - Never mints tokens; only [`TokenManager::replace`] installs a new one

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Token value. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value, for building the upstream request only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// Token handed to an adapter, tagged with the install generation so
/// derived state (e.g. an exchanged access token) can tell when the
/// underlying credential was replaced.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub generation: u64,
    pub token: SecretToken,
}

/// Upstream check of a token's validity.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &SecretToken) -> Result<(), ValidationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Token rejected: {0}")]
    Rejected(String),

    #[error("Validation endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Introspection view. Never contains the token value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct TokenStatus {
    pub exists: bool,
    pub is_expired: bool,
    /// When the current token was supplied.
    pub last_updated: Option<DateTime<Utc>>,
    pub last_validated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

struct TokenRecord {
    token: SecretToken,
    generation: u64,
    supplied_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    last_validated_at: Option<DateTime<Utc>>,
    /// Last validation attempt, successful or not.
    last_checked_at: Option<DateTime<Utc>>,
    invalid_reason: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Readiness {
    Usable,
    Unusable,
    NeedsValidation,
}

impl TokenRecord {
    fn readiness(&self, now: DateTime<Utc>, staleness: Duration) -> Readiness {
        if self.invalid_reason.is_some() {
            return Readiness::Unusable;
        }
        if let Some(expires_at) = self.expires_at {
            return if now < expires_at {
                Readiness::Usable
            } else {
                Readiness::Unusable
            };
        }
        let fresh = |at: Option<DateTime<Utc>>| at.is_some_and(|t| now - t < staleness);
        if fresh(self.last_validated_at) {
            return Readiness::Usable;
        }
        // A transient validation failure inside the window gives the
        // adapter a chance instead of re-validating on every request.
        if fresh(self.last_checked_at) {
            return Readiness::Usable;
        }
        Readiness::NeedsValidation
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.invalid_reason.is_some() || self.expires_at.is_some_and(|t| now >= t)
    }
}

/// Owns one session credential for one upstream.
pub struct TokenManager {
    name: &'static str,
    record: RwLock<Option<TokenRecord>>,
    /// Serializes upstream validation so concurrent resolutions validate once.
    validation_lock: Mutex<()>,
    validator: Arc<dyn TokenValidator>,
    staleness: Duration,
    generation: std::sync::atomic::AtomicU64,
}

impl TokenManager {
    pub fn new(
        name: &'static str,
        validator: Arc<dyn TokenValidator>,
        staleness: std::time::Duration,
    ) -> Self {
        Self {
            name,
            record: RwLock::new(None),
            validation_lock: Mutex::new(()),
            validator,
            staleness: Duration::from_std(staleness).unwrap_or_else(|_| Duration::days(365)),
            generation: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Install an initial token at construction time.
    pub fn with_token(mut self, token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        let record = self.new_record(token, expires_at);
        *self.record.get_mut() = Some(record);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn new_record(&self, token: String, expires_at: Option<DateTime<Utc>>) -> TokenRecord {
        let generation = self
            .generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        TokenRecord {
            token: SecretToken::new(token),
            generation,
            supplied_at: Utc::now(),
            expires_at,
            last_validated_at: None,
            last_checked_at: None,
            invalid_reason: None,
        }
    }

    /// Replace the token after an external refresh.
    pub async fn replace(&self, token: String, expires_at: Option<DateTime<Utc>>) {
        let record = self.new_record(token, expires_at);
        *self.record.write().await = Some(record);
        tracing::info!(credential = self.name, expires_at = ?expires_at, "Session token replaced");
    }

    /// Whether an adapter may use the token right now.
    ///
    /// May validate against upstream, but never more often than the
    /// staleness window allows.
    pub async fn is_usable(&self) -> bool {
        match self.readiness().await {
            Readiness::Usable => return true,
            Readiness::Unusable => return false,
            Readiness::NeedsValidation => {}
        }

        let _guard = self.validation_lock.lock().await;

        loop {
            // Another task may have validated while we waited.
            let (token, generation) = {
                let guard = self.record.read().await;
                let Some(record) = guard.as_ref() else {
                    return false;
                };
                match record.readiness(Utc::now(), self.staleness) {
                    Readiness::Usable => return true,
                    Readiness::Unusable => return false,
                    Readiness::NeedsValidation => (record.token.clone(), record.generation),
                }
            };

            let result = self.validator.validate(&token).await;
            let now = Utc::now();

            let mut guard = self.record.write().await;
            let Some(record) = guard.as_mut().filter(|r| r.generation == generation) else {
                // Replaced mid-validation; the verdict belongs to the old
                // token, so check whatever is installed now.
                continue;
            };
            record.last_checked_at = Some(now);

            return match result {
                Ok(()) => {
                    record.last_validated_at = Some(now);
                    tracing::debug!(credential = self.name, "Session token validated");
                    true
                }
                Err(ValidationError::Rejected(reason)) => {
                    tracing::warn!(credential = self.name, reason = %reason, "Session token rejected");
                    record.invalid_reason = Some(reason);
                    false
                }
                Err(ValidationError::Unavailable(reason)) => {
                    tracing::warn!(
                        credential = self.name,
                        reason = %reason,
                        "Session token validation unavailable, allowing use"
                    );
                    true
                }
            };
        }
    }

    async fn readiness(&self) -> Readiness {
        let guard = self.record.read().await;
        match guard.as_ref() {
            Some(record) => record.readiness(Utc::now(), self.staleness),
            None => Readiness::Unusable,
        }
    }

    /// Make the token of `generation` unusable until it is replaced.
    ///
    /// Returns `false` if a different token is installed now; a failure seen
    /// with an old token never invalidates its replacement.
    pub async fn mark_invalid(&self, generation: u64, reason: &str) -> bool {
        let mut guard = self.record.write().await;
        let Some(record) = guard.as_mut().filter(|r| r.generation == generation) else {
            tracing::debug!(
                credential = self.name,
                generation,
                "Ignoring failure reported for a replaced session token"
            );
            return false;
        };
        if record.invalid_reason.is_none() {
            tracing::warn!(credential = self.name, reason, "Session token marked invalid");
        }
        record.invalid_reason = Some(reason.to_string());
        true
    }

    /// Generation of the installed token, valid or not.
    pub async fn generation(&self) -> Option<u64> {
        self.record.read().await.as_ref().map(|r| r.generation)
    }

    /// Current token for an adapter call, unless marked invalid.
    pub async fn current(&self) -> Option<SessionCredential> {
        let guard = self.record.read().await;
        guard
            .as_ref()
            .filter(|r| r.invalid_reason.is_none())
            .map(|r| SessionCredential {
                generation: r.generation,
                token: r.token.clone(),
            })
    }

    pub async fn status(&self) -> TokenStatus {
        let guard = self.record.read().await;
        match guard.as_ref() {
            Some(r) => TokenStatus {
                exists: true,
                is_expired: r.is_expired(Utc::now()),
                last_updated: Some(r.supplied_at),
                last_validated_at: r.last_validated_at,
                expires_at: r.expires_at,
            },
            None => TokenStatus {
                exists: false,
                is_expired: false,
                last_updated: None,
                last_validated_at: None,
                expires_at: None,
            },
        }
    }
}
