//! Component I: the replay driver contract (interface only).
//!
//! Step execution itself is out of scope for the core (Section 1); this
//! trait is the seam a scenario player must satisfy, shaped after the
//! teacher's own `FlowReplayer::execute` return value (`ReplayResult`) -
//! success flag, step counters, timing, and now the artifact triple the
//! comparison facade consumes instead of session cookies.

use async_trait::async_trait;
use harness_common::model::BaselineArtifact;
use harness_common::scenario::Scenario;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("scenario validation failed: {0}")]
    InvalidScenario(#[from] harness_common::scenario::ScenarioValidationError),
    #[error("driver failed during step {step_index}: {message}")]
    StepFailed { step_index: usize, message: String },
    #[error("run was cancelled after {steps_completed} of {total_steps} steps")]
    Cancelled { steps_completed: usize, total_steps: usize },
}

/// Step-level run summary, independent of the artifacts produced.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunSummary {
    pub total_steps: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// What a full scenario run produces: the artifact triple plus the
/// step-level summary. A conforming driver must use a fresh interceptor per
/// run and call `stop()` on it before returning (Section 4.I).
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunOutcome {
    pub artifact: BaselineArtifact,
    pub summary: RunSummary,
}

/// The contract a scenario player must satisfy. Intentionally minimal: this
/// core does not specify *how* steps are executed, only what a run must
/// produce. `replay-runner` ships one concrete implementation.
#[async_trait]
pub trait ReplayDriver {
    async fn run(&mut self, scenario: &Scenario) -> Result<RunOutcome, ReplayError>;
}
