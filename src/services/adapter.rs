// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Source adapter contract shared by every acquisition strategy.

use crate::models::{FailureKind, RawPlatformPayload, SourceKind};
use crate::services::token::TokenManager;
use async_trait::async_trait;

/// How an adapter treats a given identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierForm {
    /// Platform-native id, usable directly.
    Native,
    /// Vanity name the adapter resolves itself before fetching.
    Vanity,
    /// This source cannot look the identifier up at all.
    Unsupported,
}

/// Typed failure from one adapter invocation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AdapterError {
    pub kind: FailureKind,
    pub message: String,
    /// Generation of the session token the failing call used.
    pub credential_generation: Option<u64>,
}

impl AdapterError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            credential_generation: None,
        }
    }

    /// Tag the error with the token generation it was produced under.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.credential_generation = Some(generation);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFoundOnSource, message)
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(FailureKind::CredentialInvalid, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UpstreamUnavailable, message)
    }
}

/// One strategy for acquiring one platform's raw profile data.
///
/// Implementations return either a complete payload or a typed failure,
/// never a partial result.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_kind(&self) -> SourceKind;

    /// Session credential this adapter depends on, if any.
    fn credential(&self) -> Option<&TokenManager> {
        None
    }

    /// Capability check for the identifier's shape.
    fn identifier_form(&self, identifier: &str) -> IdentifierForm;

    /// Fetch the raw profile. `identifier` is trimmed but keeps its casing.
    async fn fetch(&self, identifier: &str) -> Result<RawPlatformPayload, AdapterError>;
}

/// True if `s` is non-empty and every char is ASCII alphanumeric, `_` or `-`.
pub(crate) fn is_handle_chars(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// True if `s` is exactly `len` ASCII digits.
pub(crate) fn is_numeric_id(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_digit())
}
