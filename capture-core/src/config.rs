//! Tap configuration.
//!
//! Mirrors the teacher's `BodyCaptureConfig`/`RecordingConfig` shape: a plain
//! serde struct with a `Default` impl carrying the spec's stated defaults,
//! plus `with_*` builder methods rather than an external config-file loader.

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};

/// Default tap ignore patterns (Section 6: "Defaults"). Matched as literal
/// substrings unless the entry is wrapped in `/.../ ` to mark it as a regex.
pub fn default_ignore_patterns() -> Vec<String> {
    vec![
        "chrome-extension://".to_string(),
        "google-analytics.com".to_string(),
        "googletagmanager.com".to_string(),
        "facebook.com/tr".to_string(),
        "/analytics/".to_string(),
    ]
}

/// Configuration for a single fetch/XHR tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Maximum body size, in bytes, captured before falling back to the
    /// size-limit sentinel. Applies independently to request and response.
    pub max_body_size: usize,
    pub capture_request_body: bool,
    pub capture_response_body: bool,
    /// URLs matching any entry here are passed straight through uncaptured.
    /// Entries wrapped as `/pattern/` are treated as regex; everything else
    /// is a literal substring match.
    pub ignore_patterns: Vec<String>,
    /// Optional additional JS boolean expression evaluated in the page,
    /// `url`/`method` in scope, e.g. `"method !== 'OPTIONS'"`.
    pub filter: Option<String>,
    pub capture_headers: bool,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            capture_request_body: true,
            capture_response_body: true,
            ignore_patterns: default_ignore_patterns(),
            filter: None,
            capture_headers: true,
        }
    }
}

impl TapConfig {
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }

    /// Validate patterns compile as regex when marked `/pattern/`.
    pub fn validate(&self) -> CaptureResult<()> {
        for pattern in &self.ignore_patterns {
            if let Some(inner) = pattern.strip_prefix('/').and_then(|p| p.strip_suffix('/')) {
                regex::Regex::new(inner).map_err(|source| CaptureError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

/// Partial update applied via `ApiInterceptor::update_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TapConfigPatch {
    pub max_body_size: Option<usize>,
    pub capture_request_body: Option<bool>,
    pub capture_response_body: Option<bool>,
    pub ignore_patterns: Option<Vec<String>>,
    pub filter: Option<Option<String>>,
    pub capture_headers: Option<bool>,
}

impl TapConfig {
    pub fn apply_patch(&mut self, patch: TapConfigPatch) {
        if let Some(v) = patch.max_body_size {
            self.max_body_size = v;
        }
        if let Some(v) = patch.capture_request_body {
            self.capture_request_body = v;
        }
        if let Some(v) = patch.capture_response_body {
            self.capture_response_body = v;
        }
        if let Some(v) = patch.ignore_patterns {
            self.ignore_patterns = v;
        }
        if let Some(v) = patch.filter {
            self.filter = v;
        }
        if let Some(v) = patch.capture_headers {
            self.capture_headers = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = TapConfig::default();
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert!(config.capture_request_body);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_regex_pattern() {
        let config = TapConfig::default().with_ignore_patterns(vec!["/(/".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut config = TapConfig::default();
        config.apply_patch(TapConfigPatch {
            max_body_size: Some(2048),
            ..Default::default()
        });
        assert_eq!(config.max_body_size, 2048);
        assert!(config.capture_request_body);
    }
}
