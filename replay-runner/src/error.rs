//! Driver-internal error type.
//!
//! Scoped to what `driver::browser`/`driver::page` can actually fail at
//! (launch, navigation, element resolution, in-page interaction, timeouts).
//! The top-level `ReplayDriver::run` contract (`diff_engine::ReplayError`)
//! wraps these as `StepFailed` - this type never crosses that boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("page navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("interaction failed: {0}")]
    Interaction(String),

    #[error("dom serialization failed: {0}")]
    DomSerialization(String),

    #[error("timeout waiting for {condition}: {details}")]
    Timeout { condition: String, details: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
