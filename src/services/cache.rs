// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolved-profile cache with TTL expiry and single-flight deduplication.
//!
//! - Reads never return an entry older than its TTL; expired entries are
//!   evicted lazily on the read that finds them
//! - `sweep_expired` bounds memory for keys nobody reads again
//! - `single_flight` runs at most one resolution per key at a time, and
//!   every caller that joined it observes the same outcome

use crate::models::{CacheKey, CanonicalProfile, Platform};
use crate::services::orchestrator::ResolutionFailure;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Outcome shared by every caller of one flight.
pub type ResolutionOutcome = Result<CanonicalProfile, ResolutionFailure>;

type FlightSlot = Arc<OnceCell<ResolutionOutcome>>;

struct CacheEntry {
    profile: CanonicalProfile,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

enum Lookup {
    Fresh(Box<CanonicalProfile>),
    Expired,
    Absent,
}

/// Keyed store of resolved profiles.
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    in_flight: DashMap<CacheKey, FlightSlot>,
    default_ttl: Duration,
    platform_ttl: HashMap<Platform, Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            default_ttl,
            platform_ttl: HashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Override the TTL for one platform's entries.
    pub fn with_platform_ttl(mut self, platform: Platform, ttl: Duration) -> Self {
        self.platform_ttl.insert(platform, ttl);
        self
    }

    pub fn ttl_for(&self, platform: Platform) -> Duration {
        self.platform_ttl
            .get(&platform)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    fn lookup(&self, key: &CacheKey) -> Option<CanonicalProfile> {
        let now = Instant::now();
        // The map guard must be released before removing from the same shard.
        let found = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Lookup::Fresh(Box::new(entry.profile.clone())),
            Some(_) => Lookup::Expired,
            None => Lookup::Absent,
        };

        match found {
            Lookup::Fresh(profile) => Some(*profile),
            Lookup::Expired => {
                self.entries.remove_if(key, |_, entry| !entry.is_fresh(now));
                tracing::debug!(key = %key, "Evicted expired cache entry");
                None
            }
            Lookup::Absent => None,
        }
    }

    /// Fresh profile for `key`, counting a hit or a miss.
    pub fn get(&self, key: &CacheKey) -> Option<CanonicalProfile> {
        let result = self.lookup(key);
        let counter = if result.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub fn put(&self, key: CacheKey, profile: CanonicalProfile, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                profile,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }

    /// Run `resolve` for `key` unless a resolution is already in flight, in
    /// which case wait for it and return its outcome.
    ///
    /// Successful outcomes are stored with the platform TTL before waiters
    /// are released. Failures are shared with concurrent waiters but not
    /// cached.
    pub async fn single_flight<F, Fut>(&self, key: &CacheKey, resolve: F) -> ResolutionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolutionOutcome>,
    {
        let slot: FlightSlot = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let flight = FlightGuard {
            flights: &self.in_flight,
            key,
            slot,
        };

        let outcome = flight
            .slot
            .get_or_init(|| async {
                // A flight that finished just before we joined may have
                // stored the result already.
                if let Some(profile) = self.lookup(key) {
                    return Ok(profile);
                }
                let outcome = resolve().await;
                if let Ok(profile) = &outcome {
                    self.put(key.clone(), profile.clone(), self.ttl_for(key.platform));
                }
                outcome
            })
            .await
            .clone();

        drop(flight);
        outcome
    }

    /// Number of keys with a resolution currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Releases a caller's hold on a flight slot, also when the caller is
/// cancelled mid-flight.
struct FlightGuard<'a> {
    flights: &'a DashMap<CacheKey, FlightSlot>,
    key: &'a CacheKey,
    slot: FlightSlot,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let slot = &self.slot;
        // A finished flight is always removed. An unfinished one is removed
        // only when the map and this guard hold the last references; any
        // remaining waiter takes over initialization.
        self.flights.remove_if(self.key, |_, current| {
            Arc::ptr_eq(current, slot) && (slot.initialized() || Arc::strong_count(slot) == 2)
        });
    }
}

/// Background task that sweeps expired entries every `every`.
pub fn spawn_sweeper(cache: Arc<ResultCache>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, remaining = cache.entries.len(), "Swept expired cache entries");
            }
        }
    })
}
