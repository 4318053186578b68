//! Component H: the comparison facade.

use std::collections::HashMap;

use harness_common::model::{BaselineArtifact, LabelledSnapshot, ScreenshotImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::api_diff::{compare_api_calls, ApiDiffResult};
use crate::config::CompareOptions;
use crate::dom_diff::{compare_dom_snapshots, DomDiffResult};
use crate::visual_diff::{compare_screenshots, VisualDiffResult};

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiDiffResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom: Option<Vec<(String, DomDiffResult)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<Vec<(String, VisualDiffResult)>>,
    /// Echoed back verbatim from `CompareOptions.metadata` - opaque to this crate.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

fn find_snapshot<'a>(snapshots: &'a [LabelledSnapshot], label: &str) -> Option<&'a LabelledSnapshot> {
    snapshots.iter().find(|s| s.label == label)
}

fn screenshot_bytes(image: &ScreenshotImage) -> &[u8] {
    &image.bytes
}

/// `compare()` - Section 4.H. Runs each differ only when both sides have the
/// corresponding artifact; aggregate `passed` is the AND of whichever
/// differs actually ran.
pub fn compare(baseline: &BaselineArtifact, actual: &BaselineArtifact, options: &CompareOptions) -> ComparisonResult {
    let api = Some(compare_api_calls(&baseline.api_calls, &actual.api_calls, &options.api));
    if let Some(r) = &api {
        debug!(
            "api diff: {} matched, {} different, {} missing, {} extra",
            r.summary.matched, r.summary.different, r.summary.missing, r.summary.extra
        );
    }

    let mut dom_results = Vec::new();
    for b_snap in &baseline.snapshots {
        if let Some(a_snap) = find_snapshot(&actual.snapshots, &b_snap.label) {
            let result = compare_dom_snapshots(&b_snap.snapshot.root, &a_snap.snapshot.root, &options.dom);
            debug!("dom diff for {}: passed={}", b_snap.label, result.passed);
            dom_results.push((b_snap.label.clone(), result));
        }
    }
    let dom = if dom_results.is_empty() { None } else { Some(dom_results) };

    let mut visual_results = Vec::new();
    for b_snap in &baseline.snapshots {
        if let (Some(b_shot), Some(a_snap)) = (&b_snap.screenshot, find_snapshot(&actual.snapshots, &b_snap.label)) {
            if let Some(a_shot) = &a_snap.screenshot {
                let result = compare_screenshots(screenshot_bytes(b_shot), screenshot_bytes(a_shot), &options.visual);
                debug!("visual diff for {}: passed={}", b_snap.label, result.passed);
                visual_results.push((b_snap.label.clone(), result));
            }
        }
    }
    if let (Some(b_final), Some(a_final)) = (&baseline.final_screenshot, &actual.final_screenshot) {
        let result = compare_screenshots(screenshot_bytes(b_final), screenshot_bytes(a_final), &options.visual);
        debug!("visual diff for __final__: passed={}", result.passed);
        visual_results.push(("__final__".to_string(), result));
    }
    let visual = if visual_results.is_empty() { None } else { Some(visual_results) };

    let passed = api.as_ref().map(|r| r.passed).unwrap_or(true)
        && dom.as_ref().map(|rs| rs.iter().all(|(_, r)| r.passed)).unwrap_or(true)
        && visual.as_ref().map(|rs| rs.iter().all(|(_, r)| r.passed)).unwrap_or(true);

    info!(
        "comparison of scenario {} vs {}: passed={}",
        baseline.scenario_id, actual.scenario_id, passed
    );

    ComparisonResult { passed, api, dom, visual, metadata: options.metadata.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use harness_common::model::SerializedNode;

    fn artifact(api_calls: Vec<harness_common::model::CapturedApiCall>) -> BaselineArtifact {
        BaselineArtifact {
            scenario_id: "s1".to_string(),
            captured_at: Utc::now(),
            api_calls,
            snapshots: Vec::new(),
            final_screenshot: None,
        }
    }

    #[test]
    fn runs_only_differs_with_both_sides_present() {
        let baseline = artifact(vec![]);
        let actual = artifact(vec![]);
        let result = compare(&baseline, &actual, &CompareOptions::default());
        assert!(result.passed);
        assert!(result.dom.is_none());
        assert!(result.visual.is_none());
        assert!(result.api.is_some());
    }

    #[test]
    fn metadata_is_echoed_back_unmodified() {
        let baseline = artifact(vec![]);
        let actual = artifact(vec![]);
        let mut options = CompareOptions::default();
        options.metadata.insert("run_id".to_string(), "abc123".to_string());
        let result = compare(&baseline, &actual, &options);
        assert_eq!(result.metadata.get("run_id"), Some(&"abc123".to_string()));
    }

    #[test]
    fn dom_only_runs_for_labels_present_on_both_sides() {
        let mut baseline = artifact(vec![]);
        baseline.snapshots.push(harness_common::model::LabelledSnapshot {
            label: "home".to_string(),
            snapshot: harness_common::model::DomSnapshot {
                root: SerializedNode::Element {
                    tag_name: "div".to_string(),
                    attributes: Default::default(),
                    computed_style: None,
                    children: vec![],
                },
            },
            screenshot: None,
        });
        let actual = artifact(vec![]);
        let result = compare(&baseline, &actual, &CompareOptions::default());
        assert!(result.dom.is_none());
    }
}
