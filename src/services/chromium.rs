// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Headless Chromium sessions for the scraping adapter.

use crate::services::psn_scrape::{BrowserError, BrowserLauncher, BrowserSession};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Launches one headless Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    chrome_path: Option<PathBuf>,
    navigation_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(chrome_path: Option<PathBuf>, navigation_timeout: Duration) -> Self {
        Self {
            chrome_path,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Unavailable(format!("bad browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Unavailable(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::debug!("Launched headless Chromium");

        Ok(Box::new(ChromiumSession {
            browser,
            page: None,
            handler_task,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let page = tokio::time::timeout(self.navigation_timeout, self.browser.new_page(url))
            .await
            .map_err(|_| BrowserError::Navigation(format!("{url}: timed out")))?
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;

        // A page that never settles is still worth evaluating.
        let _ = tokio::time::timeout(self.navigation_timeout, page.wait_for_navigation()).await;

        self.page = Some(page);
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| BrowserError::Script("no page loaded".to_string()))?;

        page.evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::Script(format!("{e:?}")))
    }

    async fn close(self: Box<Self>) {
        let mut session = self;
        if let Err(e) = session.browser.close().await {
            tracing::warn!(error = %e, "Failed to close Chromium cleanly");
        }
        let _ = session.browser.wait().await;
        session.handler_task.abort();
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child process; the handler loop goes too.
        self.handler_task.abort();
    }
}
