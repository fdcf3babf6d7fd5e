// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Source kinds, failure taxonomy and per-attempt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Acquisition strategy that produced (or failed to produce) a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub enum SourceKind {
    /// Steam Web API.
    SteamApi,
    /// OpenXBL (Xbox Live) API.
    XboxApi,
    /// PlayStation Network official API (NPSSO session).
    PsnApi,
    /// Browser-automated scrape of a public PSN profile page.
    PsnScrape,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::SteamApi => "steam-api",
            SourceKind::XboxApi => "xbox-api",
            SourceKind::PsnApi => "psn-api",
            SourceKind::PsnScrape => "psn-scrape",
        }
    }

    /// True for sources that drive a browser instead of calling an API.
    pub fn is_scrape(self) -> bool {
        matches!(self, SourceKind::PsnScrape)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a source failed to produce a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub enum FailureKind {
    /// Identifier unresolvable via this source.
    NotFoundOnSource,
    /// Token or API key rejected (or known unusable before the call).
    CredentialInvalid,
    /// Vendor throttled us. The credential itself is fine.
    RateLimited,
    /// Network error or vendor 5xx.
    UpstreamUnavailable,
    /// The request itself cannot succeed anywhere.
    MalformedRequest,
    /// Bot detection or a second factor stopped a scrape.
    ScrapeBlocked,
    /// Per-attempt timeout or overall deadline elapsed.
    Timeout,
}

impl FailureKind {
    /// Whether the orchestrator may move on to the next adapter.
    pub fn is_try_next(self) -> bool {
        !matches!(self, FailureKind::MalformedRequest)
    }

    /// Whether the same adapter may be invoked again.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::UpstreamUnavailable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFoundOnSource => "not_found_on_source",
            FailureKind::CredentialInvalid => "credential_invalid",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::UpstreamUnavailable => "upstream_unavailable",
            FailureKind::MalformedRequest => "malformed_request",
            FailureKind::ScrapeBlocked => "scrape_blocked",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One adapter invocation (or skip) within a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct AttemptRecord {
    pub source: SourceKind,
    pub started_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl AttemptRecord {
    pub fn success(source: SourceKind, started_at: DateTime<Utc>) -> Self {
        Self {
            source,
            started_at,
            outcome: AttemptOutcome::Success,
            error_kind: None,
        }
    }

    pub fn failure(source: SourceKind, started_at: DateTime<Utc>, kind: FailureKind) -> Self {
        Self {
            source,
            started_at,
            outcome: AttemptOutcome::Failure,
            error_kind: Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_malformed_request_is_fatal() {
        let try_next = [
            FailureKind::NotFoundOnSource,
            FailureKind::CredentialInvalid,
            FailureKind::RateLimited,
            FailureKind::UpstreamUnavailable,
            FailureKind::ScrapeBlocked,
            FailureKind::Timeout,
        ];
        for kind in try_next {
            assert!(kind.is_try_next(), "{kind} should advance the chain");
        }
        assert!(!FailureKind::MalformedRequest.is_try_next());
    }

    #[test]
    fn test_rate_limit_is_not_retried_in_place() {
        assert!(FailureKind::UpstreamUnavailable.is_retryable());
        assert!(!FailureKind::RateLimited.is_retryable());
        assert!(!FailureKind::CredentialInvalid.is_retryable());
    }

    #[test]
    fn test_attempt_record_serialization() {
        let started_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let record =
            AttemptRecord::failure(SourceKind::PsnApi, started_at, FailureKind::RateLimited);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "psn-api");
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["errorKind"], "rate_limited");

        let ok = serde_json::to_value(AttemptRecord::success(SourceKind::SteamApi, started_at))
            .unwrap();
        assert!(ok.get("errorKind").is_none());
    }
}
