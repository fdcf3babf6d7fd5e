// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Observability events emitted by the resolution pipeline.

use crate::models::{AttemptRecord, CacheKey};

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    CacheHit {
        key: CacheKey,
    },
    CacheMiss {
        key: CacheKey,
    },
    Attempt {
        key: CacheKey,
        record: AttemptRecord,
        elapsed_ms: u64,
    },
}

/// Receiver for pipeline events. Must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ResolutionEvent);
}

/// Writes every event as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: ResolutionEvent) {
        match event {
            ResolutionEvent::CacheHit { key } => {
                tracing::debug!(event = "cache_hit", key = %key, "Cache hit");
            }
            ResolutionEvent::CacheMiss { key } => {
                tracing::debug!(event = "cache_miss", key = %key, "Cache miss");
            }
            ResolutionEvent::Attempt {
                key,
                record,
                elapsed_ms,
            } => {
                let error_kind = record.error_kind.map(|k| k.as_str());
                tracing::info!(
                    event = "attempt",
                    key = %key,
                    source = %record.source,
                    outcome = ?record.outcome,
                    error_kind,
                    elapsed_ms,
                    "Source attempt finished"
                );
            }
        }
    }
}
