//! The concrete `ReplayDriver` (component I's reference implementation).
//!
//! Launches one browser per run, installs a fresh `ApiInterceptor` on the
//! page, dispatches `harness_common::scenario::Step` one at a time, and
//! assembles the `BaselineArtifact` the comparison facade consumes -
//! mirroring the teacher's `FlowReplayer::execute` loop, now producing api
//! calls/DOM snapshots/screenshots instead of session cookies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use capture_core::ApiInterceptor;
use diff_engine::{ReplayDriver, ReplayError, RunOutcome, RunSummary};
use harness_common::model::{BaselineArtifact, LabelledSnapshot};
use harness_common::scenario::{Scenario, Step};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::driver::browser::{BrowserManager, BrowserOptions};
use crate::driver::page::PageController;
use crate::error::RunnerError;

const ASSERT_API_TIMEOUT: Duration = Duration::from_secs(10);

fn step_failed(index: usize, err: impl ToString) -> ReplayError {
    ReplayError::StepFailed { step_index: index, message: err.to_string() }
}

/// A `chromiumoxide`-backed replay driver. One instance runs exactly one
/// scenario at a time; `run()` owns the full browser lifecycle.
pub struct ChromeReplayDriver {
    browser_manager: BrowserManager,
    browser_options: BrowserOptions,
    tap_config: capture_core::TapConfig,
    cancellation: Option<CancellationToken>,
}

impl ChromeReplayDriver {
    pub fn new() -> Self {
        Self {
            browser_manager: BrowserManager::new(),
            browser_options: BrowserOptions::default(),
            tap_config: capture_core::TapConfig::default(),
            cancellation: None,
        }
    }

    pub fn with_browser_options(mut self, options: BrowserOptions) -> Self {
        self.browser_options = options;
        self
    }

    pub fn with_tap_config(mut self, config: capture_core::TapConfig) -> Self {
        self.tap_config = config;
        self
    }

    /// Cooperative cancellation (Section 5): checked between steps, never
    /// mid-step - a step already dispatched to the page always finishes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    async fn execute_step(
        &self,
        controller: &PageController,
        interceptor: &ApiInterceptor,
        step: &Step,
        snapshots: &mut Vec<LabelledSnapshot>,
    ) -> Result<(), RunnerError> {
        match step {
            Step::Navigate { url, wait_for } => {
                controller.navigate(url).await?;
                if let Some(selector) = wait_for {
                    controller.wait_for_selector(selector).await?;
                }
            }
            Step::Click { selector } => controller.click(selector).await?,
            Step::Type { selector, value, .. } => controller.type_text(selector, value, true).await?,
            Step::KeyPress { key, modifiers } => controller.key_press(key, modifiers).await?,
            Step::Wait { duration_ms } => tokio::time::sleep(Duration::from_millis(*duration_ms)).await,
            Step::Hover { selector } => controller.hover(selector).await?,
            Step::Scroll { selector, dx, dy } => controller.scroll(selector.as_ref(), *dx, *dy).await?,
            Step::Select { selector, value } => controller.select(selector, value).await?,
            Step::AssertApi { label, url_pattern } => {
                interceptor
                    .wait_for(url_pattern, None, ASSERT_API_TIMEOUT)
                    .await
                    .map_err(|e| RunnerError::Interaction(format!("assertApi {:?} failed: {}", label, e)))?;
            }
            Step::AssertElement { selector, expected_text } => match expected_text {
                Some(text) => controller.assert_element_text(selector, text).await?,
                None => {
                    controller.extract_text(selector).await?;
                }
            },
            Step::SnapshotDom { label, with_screenshot } => {
                let root = controller.snapshot_dom().await?;
                let screenshot = if *with_screenshot {
                    Some(controller.screenshot_image().await?)
                } else {
                    None
                };
                snapshots.push(LabelledSnapshot {
                    label: label.clone(),
                    snapshot: harness_common::model::DomSnapshot { root },
                    screenshot,
                });
            }
        }
        Ok(())
    }
}

impl Default for ChromeReplayDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayDriver for ChromeReplayDriver {
    async fn run(&mut self, scenario: &Scenario) -> Result<RunOutcome, ReplayError> {
        scenario.validate()?;

        let start = Instant::now();
        let all_steps: Vec<&Step> = scenario
            .setup
            .iter()
            .chain(scenario.steps.iter())
            .chain(scenario.teardown.iter())
            .collect();
        let total_steps = all_steps.len();

        let browser_arc = self
            .browser_manager
            .launch(self.browser_options.clone())
            .await
            .map_err(|e| step_failed(0, e))?;
        let browser_guard = browser_arc.read().await;
        let managed = browser_guard
            .as_ref()
            .ok_or_else(|| step_failed(0, "no browser available after launch"))?;
        let page = managed
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| step_failed(0, format!("failed to create page: {e}")))?;

        let controller = PageController::new(page.clone());
        let interceptor = ApiInterceptor::with_config(page, self.tap_config.clone())
            .map_err(|e| step_failed(0, e))?;
        interceptor.start().await.map_err(|e| step_failed(0, e))?;

        info!("replay started: {} steps", total_steps);

        let mut snapshots = Vec::new();
        let mut steps_completed = 0;

        for (index, step) in all_steps.iter().enumerate() {
            if self.cancellation.as_ref().map(|t| t.is_cancelled()).unwrap_or(false) {
                interceptor.stop().await.ok();
                drop(browser_guard);
                self.browser_manager.close().await.ok();
                return Err(ReplayError::Cancelled { steps_completed, total_steps });
            }

            if let Err(e) = self.execute_step(&controller, &interceptor, step, &mut snapshots).await {
                warn!("step {} failed: {}", index + 1, e);
                interceptor.stop().await.ok();
                drop(browser_guard);
                self.browser_manager.close().await.ok();
                return Err(step_failed(index, e));
            }
            steps_completed += 1;
        }

        let api_calls = interceptor.get_calls().await.map_err(|e| step_failed(total_steps, e))?;
        interceptor.stop().await.ok();
        let final_screenshot = controller.screenshot_image().await.ok();

        drop(browser_guard);
        self.browser_manager.close().await.ok();

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("replay completed: {} steps in {}ms", steps_completed, duration_ms);

        let artifact = BaselineArtifact {
            scenario_id: scenario.id.to_string(),
            captured_at: chrono::Utc::now(),
            api_calls,
            snapshots,
            final_screenshot,
        };
        let summary = RunSummary { total_steps, passed: steps_completed, failed: 0, skipped: 0, duration_ms };

        Ok(RunOutcome { artifact, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_defaults_to_headless() {
        let driver = ChromeReplayDriver::new();
        assert!(driver.browser_options.headless);
        assert!(driver.cancellation.is_none());
    }

    #[test]
    fn with_cancellation_sets_token() {
        let token = CancellationToken::new();
        let driver = ChromeReplayDriver::new().with_cancellation(token.clone());
        assert!(driver.cancellation.is_some());
        token.cancel();
        assert!(driver.cancellation.unwrap().is_cancelled());
    }
}
