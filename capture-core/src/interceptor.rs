//! Component D: the interceptor facade.
//!
//! Owns exactly one `chromiumoxide::Page` (never `Clone`, matching the
//! source's one-tap-per-page invariant) and provides the unified lifecycle
//! over the fetch and XHR taps, which share a single injected script. Drains
//! are serialized through an internal mutex so concurrent `get_calls()`
//! callers never race the JS-side clear-on-drain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::Page;
use harness_common::model::CapturedApiCall;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{TapConfig, TapConfigPatch};
use crate::error::{CaptureError, CaptureResult};
use crate::tap;

/// Merge freshly drained calls into the running completed list, keeping the
/// whole thing timestamp-non-decreasing (Section 8, invariant 10). Pulled
/// out as a pure function so the merge order is unit-testable without a
/// live page.
fn merge_drained(completed: &mut Vec<CapturedApiCall>, drained: Vec<CapturedApiCall>) {
    completed.extend(drained);
    completed.sort_by_key(|c| c.request.timestamp);
}

/// Facade over the page's fetch + XHR tap. See Section 4.D.
pub struct ApiInterceptor {
    page: Page,
    config: Mutex<TapConfig>,
    active: Mutex<bool>,
    /// Timestamp-sorted merged view of every completed call observed so far.
    completed: Arc<Mutex<Vec<CapturedApiCall>>>,
}

impl ApiInterceptor {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            config: Mutex::new(TapConfig::default()),
            active: Mutex::new(false),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_config(page: Page, config: TapConfig) -> CaptureResult<Self> {
        config.validate()?;
        Ok(Self {
            page,
            config: Mutex::new(config),
            active: Mutex::new(false),
            completed: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Start capturing. A no-op if already active (idempotent, Section 4.B).
    pub async fn start(&self) -> CaptureResult<()> {
        let mut active = self.active.lock().await;
        if *active {
            debug!("interceptor already active, start() is a no-op");
            return Ok(());
        }
        let config = self.config.lock().await;
        let script = tap::capture_script(&config);
        drop(config);
        self.page
            .evaluate(script)
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;
        *active = true;
        info!("api interceptor started");
        Ok(())
    }

    /// Stop capturing, restoring the page's original entry points.
    /// Idempotent - calling `stop()` twice is harmless.
    pub async fn stop(&self) -> CaptureResult<()> {
        let mut active = self.active.lock().await;
        if !*active {
            return Ok(());
        }
        self.page
            .evaluate(tap::uninstall_script())
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;
        *active = false;
        info!("api interceptor stopped");
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        *self.active.lock().await
    }

    /// Drain the page's completed-call buffer and merge it into the facade's
    /// timestamp-sorted view (stable sort, Section 4.D/8.10).
    async fn drain(&self) -> CaptureResult<()> {
        let raw = self
            .page
            .evaluate(tap::drain_script())
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;
        let value: serde_json::Value = raw.into_value().unwrap_or(serde_json::Value::Array(vec![]));
        let drained: Vec<CapturedApiCall> = serde_json::from_value(value)?;
        if drained.is_empty() {
            return Ok(());
        }
        let mut completed = self.completed.lock().await;
        merge_drained(&mut completed, drained);
        Ok(())
    }

    /// Drain, then return the full merged, timestamp-ordered call list.
    pub async fn get_calls(&self) -> CaptureResult<Vec<CapturedApiCall>> {
        self.drain().await?;
        Ok(self.completed.lock().await.clone())
    }

    /// Snapshot of requests that have not yet resolved. Never drains or
    /// mutates state - purely observational.
    pub async fn get_pending_calls(&self) -> CaptureResult<Vec<CapturedApiCall>> {
        let raw = self
            .page
            .evaluate(tap::pending_script())
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;
        let value: serde_json::Value = raw.into_value().unwrap_or(serde_json::Value::Array(vec![]));
        Ok(serde_json::from_value(value)?)
    }

    /// Clear both completed and in-flight state, in the page and locally.
    pub async fn clear(&self) -> CaptureResult<()> {
        self.page
            .evaluate(tap::clear_script())
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;
        self.completed.lock().await.clear();
        Ok(())
    }

    /// Apply a partial config update. Re-injects the tap with the new
    /// config only if currently active (a stopped tap simply remembers the
    /// new config for its next `start()`).
    pub async fn update_config(&self, patch: TapConfigPatch) -> CaptureResult<()> {
        let mut config = self.config.lock().await;
        let mut candidate = config.clone();
        candidate.apply_patch(patch);
        candidate.validate()?;
        *config = candidate;

        if *self.active.lock().await {
            let script = tap::capture_script(&config);
            drop(config);
            self.page
                .evaluate(tap::uninstall_script())
                .await
                .map_err(|e| CaptureError::Page(e.to_string()))?;
            self.page
                .evaluate(script)
                .await
                .map_err(|e| CaptureError::Page(e.to_string()))?;
        }
        Ok(())
    }

    /// Poll the merged call list every 100ms until one matches `url_pattern`
    /// (a substring match) and, if given, `method`. Never blocks the tap.
    pub async fn wait_for(
        &self,
        url_pattern: &str,
        method: Option<&str>,
        timeout: Duration,
    ) -> CaptureResult<CapturedApiCall> {
        let deadline = Instant::now() + timeout;
        loop {
            let calls = self.get_calls().await?;
            if let Some(found) = calls.iter().find(|c| {
                c.request.url.contains(url_pattern)
                    && method.map(|m| m.eq_ignore_ascii_case(&c.request.method)).unwrap_or(true)
            }) {
                return Ok(found.clone());
            }
            if Instant::now() >= deadline {
                warn!("wait_for timed out waiting for {}", url_pattern);
                return Err(CaptureError::WaitTimeout(timeout));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_common::model::{CapturedRequest, Initiator};
    use std::collections::HashMap;

    fn call(id: &str, timestamp: i64) -> CapturedApiCall {
        let request = CapturedRequest {
            id: id.to_string(),
            url: format!("https://example.com/{id}"),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
            timestamp,
            initiator: Initiator::Fetch,
        };
        CapturedApiCall::new_pending(request)
    }

    #[test]
    fn merge_keeps_timestamp_non_decreasing() {
        let mut completed = vec![call("a", 10), call("b", 30)];
        merge_drained(&mut completed, vec![call("c", 20), call("d", 5)]);
        let timestamps: Vec<i64> = completed.iter().map(|c| c.request.timestamp).collect();
        assert_eq!(timestamps, vec![5, 10, 20, 30]);
    }

    #[test]
    fn merge_into_empty_is_just_the_drained_batch() {
        let mut completed = Vec::new();
        merge_drained(&mut completed, vec![call("a", 2), call("b", 1)]);
        assert_eq!(completed.iter().map(|c| c.request.id.clone()).collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
