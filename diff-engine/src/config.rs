//! Diff configuration types (Section 3). Plain serde structs with `Default`
//! impls carrying the spec's stated defaults, the same layering the teacher
//! uses for its own config types (`BodyCaptureConfig`, `RecordingConfig`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pixel rectangle, in source-image coordinates, to blank out before
/// comparison (Section 4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn default_ignore_headers() -> Vec<String> {
    vec![
        "date".to_string(),
        "x-request-id".to_string(),
        "x-correlation-id".to_string(),
        "etag".to_string(),
        "last-modified".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDiffConfig {
    #[serde(default)]
    pub ignore_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub compare_request_bodies: bool,
    #[serde(default = "default_true")]
    pub compare_response_bodies: bool,
    #[serde(default)]
    pub compare_headers: bool,
    #[serde(default = "default_ignore_headers")]
    pub ignore_headers: Vec<String>,
    #[serde(default)]
    pub strict: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApiDiffConfig {
    fn default() -> Self {
        Self {
            ignore_paths: Vec::new(),
            compare_request_bodies: true,
            compare_response_bodies: true,
            compare_headers: false,
            ignore_headers: default_ignore_headers(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomDiffConfig {
    #[serde(default)]
    pub ignore_attributes: Vec<String>,
    #[serde(default)]
    pub ignore_selectors: Vec<String>,
    #[serde(default = "default_true")]
    pub compare_text: bool,
    #[serde(default)]
    pub compare_styles: bool,
    #[serde(default)]
    pub style_properties: Vec<String>,
    #[serde(default = "default_true")]
    pub ignore_whitespace: bool,
    pub max_depth: Option<usize>,
}

impl Default for DomDiffConfig {
    fn default() -> Self {
        Self {
            ignore_attributes: Vec::new(),
            ignore_selectors: Vec::new(),
            compare_text: true,
            compare_styles: false,
            style_properties: Vec::new(),
            ignore_whitespace: true,
            max_depth: None,
        }
    }
}

fn default_threshold() -> f64 {
    0.1
}
fn default_diff_threshold() -> f64 {
    1.0
}
fn default_alpha() -> f64 {
    0.1
}
fn default_diff_color() -> (u8, u8, u8) {
    (255, 0, 0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualDiffConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f64,
    #[serde(default)]
    pub include_anti_alias: bool,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_diff_color")]
    pub diff_color: (u8, u8, u8),
    #[serde(default)]
    pub ignore_masks: Vec<MaskRect>,
}

impl Default for VisualDiffConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            diff_threshold: default_diff_threshold(),
            include_anti_alias: false,
            alpha: default_alpha(),
            diff_color: default_diff_color(),
            ignore_masks: Vec::new(),
        }
    }
}

/// Options bundle for the comparison facade (Section 4.H).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareOptions {
    #[serde(default)]
    pub api: ApiDiffConfig,
    #[serde(default)]
    pub dom: DomDiffConfig,
    #[serde(default)]
    pub visual: VisualDiffConfig,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
