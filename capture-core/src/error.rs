//! Error taxonomy for the capture layer.
//!
//! Only [`CaptureError::Config`]-class failures are ever returned as a Rust
//! `Err`; the tap's own transparency/body/network faults are folded into the
//! captured data (`harness_common::model::CapturedApiCall`) and never raised,
//! per the capture design's propagation rule.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid tap configuration: {0}")]
    Config(String),

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("chromiumoxide page error: {0}")]
    Page(String),

    #[error("failed to decode tap drain payload: {0}")]
    Drain(#[from] serde_json::Error),

    #[error("timed out waiting for a matching call after {0:?}")]
    WaitTimeout(std::time::Duration),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
