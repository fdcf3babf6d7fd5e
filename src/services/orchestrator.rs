// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fallback orchestration: cache, ordered source chain, normalization.
//!
//! For each request:
//! 1. Serve a fresh cache entry if there is one (no adapter is called)
//! 2. Join or start the single flight for the key
//! 3. Walk the platform's adapters in order, one at a time
//! 4. Stop at the first success, or at a fatal failure
//! 5. Normalize, classify, cache and return the winner

use crate::models::{
    AttemptRecord, CacheKey, CanonicalProfile, FailureKind, Platform, ProfileRequest,
    RawPlatformPayload, SourceKind,
};
use crate::services::adapter::{AdapterError, IdentifierForm, SourceAdapter};
use crate::services::cache::{ResolutionOutcome, ResultCache};
use crate::services::classifier::classify;
use crate::services::events::{EventSink, ResolutionEvent};
use crate::services::normalizer::{normalize, DEFAULT_TOP_N};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Timeouts and bounds for one resolver.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Budget for a single adapter invocation.
    pub attempt_timeout: Duration,
    /// Budget for the whole chain.
    pub deadline: Duration,
    /// Bound on the canonical games list.
    pub top_n: usize,
    /// Extra invocations of the same adapter after a retryable failure.
    pub retries: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(15),
            deadline: Duration::from_secs(45),
            top_n: DEFAULT_TOP_N,
            retries: 1,
        }
    }
}

/// Aggregate failure of a whole resolution.
///
/// Carries every attempt so callers can see which strategies were tried.
/// Never carries upstream bodies or credentials.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ResolutionFailure {
    pub kind: FailureKind,
    pub message: String,
    pub attempts: Vec<AttemptRecord>,
}

impl ResolutionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedRequest, message, Vec::new())
    }

    /// Failure after the chain ran out of adapters.
    ///
    /// - every source said not found: not found
    /// - only credential problems (plus not-found): credential invalid
    /// - anything else: upstream unavailable
    fn exhausted(request: &ProfileRequest, attempts: Vec<AttemptRecord>) -> Self {
        let kinds: Vec<FailureKind> = attempts.iter().filter_map(|a| a.error_kind).collect();
        let platform = request.platform;

        let (kind, message) = if !kinds.is_empty()
            && kinds.iter().all(|k| *k == FailureKind::NotFoundOnSource)
        {
            (
                FailureKind::NotFoundOnSource,
                format!(
                    "Profile '{}' was not found on any {} source",
                    request.trimmed_identifier(),
                    platform
                ),
            )
        } else if kinds.contains(&FailureKind::CredentialInvalid)
            && kinds.iter().all(|k| {
                matches!(
                    k,
                    FailureKind::CredentialInvalid | FailureKind::NotFoundOnSource
                )
            })
        {
            (
                FailureKind::CredentialInvalid,
                format!(
                    "{platform} credentials are invalid and no fallback source succeeded; refresh the session token or make the profile public"
                ),
            )
        } else {
            (
                FailureKind::UpstreamUnavailable,
                format!("All {platform} sources failed or are unavailable"),
            )
        };

        Self::new(kind, message, attempts)
    }

    /// Ordered source names, with retries of one source collapsed.
    pub fn sources_attempted(&self) -> Vec<&'static str> {
        let mut sources: Vec<&'static str> = self.attempts.iter().map(|a| a.source.as_str()).collect();
        sources.dedup();
        sources
    }
}

/// Coordinates cache, adapters, normalizer and classifier.
pub struct ProfileResolver {
    chains: HashMap<Platform, Vec<Arc<dyn SourceAdapter>>>,
    cache: Arc<ResultCache>,
    events: Arc<dyn EventSink>,
    settings: ResolverSettings,
}

impl ProfileResolver {
    pub fn new(
        cache: Arc<ResultCache>,
        events: Arc<dyn EventSink>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            chains: HashMap::new(),
            cache,
            events,
            settings,
        }
    }

    /// Set the ordered fallback chain for one platform.
    ///
    /// Cheaper, authoritative sources go first; the first success wins.
    pub fn with_chain(mut self, platform: Platform, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        self.chains.insert(platform, adapters);
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn chain(&self, platform: Platform) -> Vec<SourceKind> {
        self.chains
            .get(&platform)
            .map(|c| c.iter().map(|a| a.source_kind()).collect())
            .unwrap_or_default()
    }

    /// Resolve a request into a canonical profile.
    pub async fn resolve(&self, request: &ProfileRequest) -> ResolutionOutcome {
        let Some(key) = request.cache_key() else {
            return Err(ResolutionFailure::malformed("Identifier must not be blank"));
        };

        if let Some(profile) = self.cache.get(&key) {
            self.events.emit(ResolutionEvent::CacheHit { key });
            return Ok(profile);
        }
        self.events
            .emit(ResolutionEvent::CacheMiss { key: key.clone() });

        self.cache
            .single_flight(&key, || self.run_chain(request, &key))
            .await
    }

    async fn run_chain(&self, request: &ProfileRequest, key: &CacheKey) -> ResolutionOutcome {
        let identifier = request.trimmed_identifier();
        let platform = request.platform;

        let chain = match self.chains.get(&platform) {
            Some(chain) if !chain.is_empty() => chain,
            _ => {
                return Err(ResolutionFailure::new(
                    FailureKind::UpstreamUnavailable,
                    format!("No sources configured for {platform}"),
                    Vec::new(),
                ))
            }
        };

        if chain
            .iter()
            .all(|a| a.identifier_form(identifier) == IdentifierForm::Unsupported)
        {
            return Err(ResolutionFailure::malformed(format!(
                "'{identifier}' is not a valid {platform} identifier"
            )));
        }

        tracing::info!(key = %key, chain = ?self.chain(platform), "Resolving profile");

        let deadline = Instant::now() + self.settings.deadline;
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for adapter in chain {
            let source = adapter.source_kind();

            if adapter.identifier_form(identifier) == IdentifierForm::Unsupported {
                let record =
                    AttemptRecord::failure(source, Utc::now(), FailureKind::NotFoundOnSource);
                self.record(key, &mut attempts, record, 0);
                continue;
            }

            let mut generation = None;
            if let Some(credential) = adapter.credential() {
                if !credential.is_usable().await {
                    let record =
                        AttemptRecord::failure(source, Utc::now(), FailureKind::CredentialInvalid);
                    self.record(key, &mut attempts, record, 0);
                    continue;
                }
                generation = credential.generation().await;
            }

            let mut retries_left = self.settings.retries;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(self.deadline_exceeded(attempts));
                }

                let started_at = Utc::now();
                let clock = Instant::now();
                let budget = remaining.min(self.settings.attempt_timeout);
                let result = match tokio::time::timeout(budget, adapter.fetch(identifier)).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::new(
                        FailureKind::Timeout,
                        format!("No response within {}ms", budget.as_millis()),
                    )),
                };
                let elapsed_ms = clock.elapsed().as_millis() as u64;

                let err = match result {
                    Ok(payload) => {
                        let record = AttemptRecord::success(source, started_at);
                        self.record(key, &mut attempts, record, elapsed_ms);
                        return Ok(self.finish(request, source, payload));
                    }
                    Err(err) => err,
                };

                let record = AttemptRecord::failure(source, started_at, err.kind);
                self.record(key, &mut attempts, record, elapsed_ms);
                tracing::warn!(key = %key, source = %source, error = %err, "Source attempt failed");

                if err.kind == FailureKind::CredentialInvalid {
                    // Only the token the call ran with may be invalidated.
                    let used = err.credential_generation.or(generation);
                    if let (Some(credential), Some(used)) = (adapter.credential(), used) {
                        credential.mark_invalid(used, &err.message).await;
                    }
                }

                if !err.kind.is_try_next() {
                    return Err(ResolutionFailure::new(
                        err.kind,
                        format!("Request rejected by {source}: {}", err.message),
                        attempts,
                    ));
                }

                if err.kind == FailureKind::Timeout && Instant::now() >= deadline {
                    return Err(self.deadline_exceeded(attempts));
                }

                if err.kind.is_retryable() && retries_left > 0 {
                    retries_left -= 1;
                    continue;
                }
                break;
            }
        }

        let failure = ResolutionFailure::exhausted(request, attempts);
        tracing::warn!(
            key = %key,
            kind = %failure.kind,
            sources = ?failure.sources_attempted(),
            "All sources failed"
        );
        Err(failure)
    }

    fn record(
        &self,
        key: &CacheKey,
        attempts: &mut Vec<AttemptRecord>,
        record: AttemptRecord,
        elapsed_ms: u64,
    ) {
        self.events.emit(ResolutionEvent::Attempt {
            key: key.clone(),
            record: record.clone(),
            elapsed_ms,
        });
        attempts.push(record);
    }

    fn deadline_exceeded(&self, attempts: Vec<AttemptRecord>) -> ResolutionFailure {
        ResolutionFailure::new(
            FailureKind::Timeout,
            format!(
                "Resolution deadline of {}s exceeded",
                self.settings.deadline.as_secs()
            ),
            attempts,
        )
    }

    fn finish(
        &self,
        request: &ProfileRequest,
        source: SourceKind,
        payload: RawPlatformPayload,
    ) -> CanonicalProfile {
        let normalized = normalize(&payload, self.settings.top_n);
        let qualification = classify(source, &normalized);
        tracing::info!(
            platform = %request.platform,
            source = %source,
            status = qualification.status.as_str(),
            games = normalized.total_games,
            "Profile resolved"
        );
        normalized.finish(request.trimmed_identifier(), source, qualification, Utc::now())
    }
}
