// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared fixtures: scripted sources, an event recorder, and an offline app.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playtrack::config::Config;
use playtrack::models::{
    AttemptRecord, FailureKind, Platform, PlayStationPayload, PsnTitle, PsnTrophyCounts,
    RawPlatformPayload, SourceKind, SteamOwnedGame, SteamPayload, XboxPayload, XboxTitle,
};
use playtrack::routes::create_router;
use playtrack::services::{
    AdapterError, EventSink, IdentifierForm, ProfileResolver, ResolutionEvent, ResolverSettings,
    ResultCache, SecretToken, SourceAdapter, TokenManager, TokenValidator, ValidationError,
};
use playtrack::AppState;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted source does on one invocation.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Step {
    Succeed(RawPlatformPayload),
    Fail(FailureKind),
    /// Never completes; only a timeout ends it.
    Hang,
}

/// Source adapter that replays a script. The last step repeats.
#[allow(dead_code)]
pub struct ScriptedAdapter {
    kind: SourceKind,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    delay: Duration,
    credential: Option<Arc<TokenManager>>,
    unsupported: bool,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedAdapter {
    pub fn new(kind: SourceKind, steps: Vec<Step>) -> Self {
        let last = steps
            .last()
            .cloned()
            .unwrap_or(Step::Fail(FailureKind::UpstreamUnavailable));
        Self {
            kind,
            steps: Mutex::new(steps.into()),
            last: Mutex::new(last),
            delay: Duration::ZERO,
            credential: None,
            unsupported: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(kind: SourceKind, payload: RawPlatformPayload) -> Self {
        Self::new(kind, vec![Step::Succeed(payload)])
    }

    pub fn failing(kind: SourceKind, failure: FailureKind) -> Self {
        Self::new(kind, vec![Step::Fail(failure)])
    }

    pub fn hanging(kind: SourceKind) -> Self {
        Self::new(kind, vec![Step::Hang])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_credential(mut self, credential: Arc<TokenManager>) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Reject every identifier shape.
    pub fn rejecting_identifiers(mut self) -> Self {
        self.unsupported = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let next = self.steps.lock().unwrap().pop_front();
        match next {
            Some(step) => {
                *self.last.lock().unwrap() = step.clone();
                step
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn source_kind(&self) -> SourceKind {
        self.kind
    }

    fn credential(&self) -> Option<&TokenManager> {
        self.credential.as_deref()
    }

    fn identifier_form(&self, _identifier: &str) -> IdentifierForm {
        if self.unsupported {
            IdentifierForm::Unsupported
        } else {
            IdentifierForm::Vanity
        }
    }

    async fn fetch(&self, _identifier: &str) -> Result<RawPlatformPayload, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match step {
            Step::Succeed(payload) => Ok(payload),
            Step::Fail(kind) => Err(AdapterError::new(kind, format!("scripted {kind}"))),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Event sink that keeps everything it sees.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ResolutionEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ResolutionEvent::Attempt { record, .. } => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn cache_hits(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ResolutionEvent::CacheHit { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ResolutionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Validator with a fixed verdict that counts its calls.
#[allow(dead_code)]
pub struct FixedValidator {
    accept: bool,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FixedValidator {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            accept: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            accept: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenValidator for FixedValidator {
    async fn validate(&self, _token: &SecretToken) -> Result<(), ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            Ok(())
        } else {
            Err(ValidationError::Rejected("session expired".to_string()))
        }
    }
}

/// PSN session credential holding `token`, checked by `validator`.
#[allow(dead_code)]
pub fn psn_token(validator: Arc<FixedValidator>, token: Option<&str>) -> Arc<TokenManager> {
    let manager = TokenManager::new("psn-npsso", validator, Duration::from_secs(1800));
    Arc::new(match token {
        Some(token) => manager.with_token(token.to_string(), None),
        None => manager,
    })
}

// ─── Payload fixtures ────────────────────────────────────────

#[allow(dead_code)]
pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

#[allow(dead_code)]
pub fn steam_payload() -> RawPlatformPayload {
    RawPlatformPayload::Steam(SteamPayload {
        steam_id: "76561197960287930".to_string(),
        persona_name: "Rabscuttle".to_string(),
        avatar_url: Some("https://avatars.steamstatic.com/full.jpg".to_string()),
        last_logoff: Some(1_700_000_000),
        steam_level: Some(12),
        games: vec![
            SteamOwnedGame {
                appid: 620,
                name: "Portal 2".to_string(),
                playtime_forever: 2700,
                playtime_2weeks: Some(90),
                rtime_last_played: Some(1_699_000_000),
            },
            SteamOwnedGame {
                appid: 570,
                name: "Dota 2".to_string(),
                playtime_forever: 600,
                playtime_2weeks: None,
                rtime_last_played: Some(1_600_000_000),
            },
        ],
    })
}

#[allow(dead_code)]
pub fn xbox_payload() -> RawPlatformPayload {
    RawPlatformPayload::Xbox(XboxPayload {
        xuid: "2533274792693551".to_string(),
        gamertag: "Major Nelson".to_string(),
        avatar_url: None,
        gamerscore: Some(41_000),
        titles: vec![
            XboxTitle {
                name: "Halo Infinite".to_string(),
                last_played: Some(ts(1_700_000_000)),
                current_achievements: Some(80),
                total_achievements: Some(119),
            },
            XboxTitle {
                name: "Forza Horizon 5".to_string(),
                last_played: Some(ts(1_690_000_000)),
                current_achievements: Some(30),
                total_achievements: Some(150),
            },
        ],
    })
}

/// PSN payload shaped like a scrape result: no playtime anywhere.
#[allow(dead_code)]
pub fn psn_scraped_payload() -> RawPlatformPayload {
    RawPlatformPayload::PlayStation(PlayStationPayload {
        online_id: "Hakoom".to_string(),
        account_id: None,
        avatar_url: None,
        last_online: None,
        trophies: Some(PsnTrophyCounts {
            level: 512,
            platinum: 80,
            gold: 600,
            silver: 1500,
            bronze: 5000,
        }),
        titles: vec![PsnTitle {
            name: "Elden Ring".to_string(),
            play_minutes: None,
            last_played: None,
            earned_trophies: Some(42),
            total_trophies: Some(42),
        }],
    })
}

/// Resolver over the given chains with test-friendly bounds.
#[allow(dead_code)]
pub fn resolver(
    chains: Vec<(Platform, Vec<Arc<dyn SourceAdapter>>)>,
    sink: Arc<RecordingSink>,
    settings: ResolverSettings,
) -> ProfileResolver {
    let cache = Arc::new(ResultCache::new(Duration::from_secs(3600)));
    chains
        .into_iter()
        .fold(ProfileResolver::new(cache, sink, settings), |r, (platform, chain)| {
            r.with_chain(platform, chain)
        })
}

/// Sources wired into the offline test app.
#[derive(Clone)]
#[allow(dead_code)]
pub struct TestSources {
    pub steam: Arc<ScriptedAdapter>,
    pub xbox: Arc<ScriptedAdapter>,
    pub psn_api: Arc<ScriptedAdapter>,
    pub psn_scrape: Arc<ScriptedAdapter>,
}

/// Create a test app with offline scripted sources.
///
/// Steam and Xbox succeed; the PSN API rejects its credential and the
/// scrape fallback succeeds.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TestSources) {
    let sources = TestSources {
        steam: Arc::new(ScriptedAdapter::succeeding(SourceKind::SteamApi, steam_payload())),
        xbox: Arc::new(ScriptedAdapter::succeeding(SourceKind::XboxApi, xbox_payload())),
        psn_api: Arc::new(ScriptedAdapter::failing(
            SourceKind::PsnApi,
            FailureKind::CredentialInvalid,
        )),
        psn_scrape: Arc::new(ScriptedAdapter::succeeding(
            SourceKind::PsnScrape,
            psn_scraped_payload(),
        )),
    };
    create_test_app_with(Config::default(), &sources)
}

#[allow(dead_code)]
pub fn create_test_app_with(
    config: Config,
    sources: &TestSources,
) -> (axum::Router, Arc<AppState>, TestSources) {
    let token = psn_token(FixedValidator::accepting(), Some("npsso-test-value"));
    let resolver = resolver(
        vec![
            (Platform::Steam, vec![sources.steam.clone() as Arc<dyn SourceAdapter>]),
            (Platform::Xbox, vec![sources.xbox.clone() as Arc<dyn SourceAdapter>]),
            (
                Platform::PlayStation,
                vec![
                    sources.psn_api.clone() as Arc<dyn SourceAdapter>,
                    sources.psn_scrape.clone() as Arc<dyn SourceAdapter>,
                ],
            ),
        ],
        Arc::new(RecordingSink::default()),
        config.resolver_settings(),
    );

    let state = Arc::new(AppState {
        config,
        resolver,
        psn_token: token,
    });

    (create_router(state.clone()), state, sources.clone())
}
