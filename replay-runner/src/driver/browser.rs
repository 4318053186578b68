//! Browser lifecycle management.
//!
//! Launches and tears down a single headless (by default) Chromium instance
//! per scenario run, mirroring the teacher's `BrowserManager`/`ManagedBrowser`
//! split minus the MITM-proxy wiring this architecture has no use for - the
//! tap lives in the page via `capture-core`, not in front of the socket.

use crate::error::{RunnerError, RunnerResult};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Browser launch options.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub extra_args: Vec<String>,
    pub window_size: Option<(u32, u32)>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            extra_args: Vec::new(),
            window_size: Some((1920, 1080)),
        }
    }
}

impl BrowserOptions {
    pub fn headed() -> Self {
        Self { headless: false, ..Default::default() }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

/// A launched browser plus the scratch profile directory it owns.
pub struct ManagedBrowser {
    browser: Browser,
    user_data_dir: Option<PathBuf>,
}

impl ManagedBrowser {
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub async fn close(self) -> RunnerResult<()> {
        drop(self.browser);
        info!("browser closed");
        if let Some(path) = self.user_data_dir {
            if path.exists() {
                if let Err(e) = std::fs::remove_dir_all(&path) {
                    warn!("failed to remove browser profile dir: {:?}", e);
                }
            }
        }
        Ok(())
    }
}

/// Browser launcher and handle holder - one active browser at a time.
pub struct BrowserManager {
    active_browser: Arc<RwLock<Option<ManagedBrowser>>>,
}

impl BrowserManager {
    pub fn new() -> Self {
        Self { active_browser: Arc::new(RwLock::new(None)) }
    }

    pub async fn launch(&self, options: BrowserOptions) -> RunnerResult<Arc<RwLock<Option<ManagedBrowser>>>> {
        self.close().await?;

        let mut config_builder = BrowserConfig::builder();

        let user_data_dir = std::env::temp_dir().join(format!("harness_browser_{}", Uuid::new_v4()));
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if !options.headless {
            config_builder = config_builder.with_head();
        }

        if let Some((width, height)) = options.window_size {
            config_builder = config_builder.arg(format!("--window-size={},{}", width, height));
        }

        for arg in &options.extra_args {
            config_builder = config_builder.arg(arg);
        }

        config_builder = config_builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        let config = config_builder
            .build()
            .map_err(|e| RunnerError::BrowserLaunch(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RunnerError::BrowserLaunch(format!("failed to launch browser: {}", e)))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("browser event error: {:?}", e);
                }
            }
        });

        info!("browser launched (headless: {})", options.headless);

        let managed = ManagedBrowser { browser, user_data_dir: Some(user_data_dir) };
        let mut guard = self.active_browser.write().await;
        *guard = Some(managed);

        Ok(self.active_browser.clone())
    }

    pub async fn close(&self) -> RunnerResult<()> {
        let mut guard = self.active_browser.write().await;
        if let Some(browser) = guard.take() {
            browser.close().await?;
        }
        Ok(())
    }
}

impl Default for BrowserManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_options_defaults() {
        let opts = BrowserOptions::default();
        assert!(opts.headless);
        assert_eq!(opts.window_size, Some((1920, 1080)));

        let headed = BrowserOptions::headed();
        assert!(!headed.headless);
    }
}
