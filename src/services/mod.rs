// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - resolution pipeline and platform sources.

pub mod adapter;
pub mod cache;
#[cfg(feature = "browser")]
pub mod chromium;
pub mod classifier;
pub mod events;
pub mod http;
pub mod normalizer;
pub mod orchestrator;
pub mod playstation;
pub mod psn_scrape;
pub mod steam;
pub mod token;
pub mod xbox;

pub use adapter::{AdapterError, IdentifierForm, SourceAdapter};
pub use cache::{spawn_sweeper, CacheStats, ResolutionOutcome, ResultCache};
#[cfg(feature = "browser")]
pub use chromium::ChromiumLauncher;
pub use classifier::classify;
pub use events::{EventSink, ResolutionEvent, TracingEventSink};
pub use normalizer::normalize;
pub use orchestrator::{ProfileResolver, ResolutionFailure, ResolverSettings};
pub use playstation::{PsnApiAdapter, PsnClient, PsnEndpoints};
pub use psn_scrape::{BrowserError, BrowserLauncher, BrowserSession, NoBrowser, PsnScrapeAdapter};
pub use steam::{SteamApiAdapter, SteamClient};
pub use token::{SecretToken, TokenManager, TokenStatus, TokenValidator, ValidationError};
pub use xbox::{XboxApiAdapter, XboxClient};
