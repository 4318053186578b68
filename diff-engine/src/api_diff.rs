//! Component E: the API differ.
//!
//! No diff-tree crate exists anywhere in the reference corpus for this
//! shape, so the recursive structural diff here is hand-written core domain
//! logic, the same way the teacher hand-writes its own rule-matching
//! (`policy.rs`) and memory accounting (`memory_manager.rs`) rather than
//! reaching for a crate for every piece of domain logic.

use std::collections::HashMap;

use harness_common::model::{CapturedApiCall, DiffChange, DiffKind, Severity};
use serde_json::Value;
use url::Url;

use crate::config::ApiDiffConfig;
use crate::ignore_path::IgnorePathMatcher;

/// Per-pair comparison result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiCallDiff {
    pub baseline_index: usize,
    pub actual_index: usize,
    pub url: String,
    pub method: String,
    pub severity: Severity,
    pub passed: bool,
    pub changes: Vec<DiffChange>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiDiffSummary {
    pub total: usize,
    pub matched: usize,
    pub different: usize,
    pub missing: usize,
    pub extra: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiDiffResult {
    pub passed: bool,
    pub pairs: Vec<ApiCallDiff>,
    pub missing_calls: Vec<CapturedApiCall>,
    pub extra_calls: Vec<CapturedApiCall>,
    pub summary: ApiDiffSummary,
}

/// Strip known ephemeral query params and re-serialize for comparison.
/// Falls back to the raw string on parse failure, per Section 4.E.
fn normalize_url(raw: &str) -> String {
    const EPHEMERAL: &[&str] = &["_", "timestamp", "t"];
    match Url::parse(raw) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| !EPHEMERAL.contains(&k.as_ref()))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                url.set_query(None);
            } else {
                let qs: String = kept
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&");
                url.set_query(Some(&qs));
            }
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// Greedy one-pass matching: for each baseline entry, the first unmatched
/// actual entry with the same method and normalized URL.
fn match_calls(
    baseline: &[CapturedApiCall],
    actual: &[CapturedApiCall],
) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
    let mut used = vec![false; actual.len()];
    let mut pairs = Vec::new();
    let mut missing = Vec::new();

    for (bi, b) in baseline.iter().enumerate() {
        let b_url = normalize_url(&b.request.url);
        let found = actual.iter().enumerate().find(|(ai, a)| {
            !used[*ai]
                && a.request.method.eq_ignore_ascii_case(&b.request.method)
                && normalize_url(&a.request.url) == b_url
        });
        match found {
            Some((ai, _)) => {
                used[ai] = true;
                pairs.push((bi, ai));
            }
            None => missing.push(bi),
        }
    }
    let extra: Vec<usize> = used.iter().enumerate().filter(|(_, u)| !**u).map(|(i, _)| i).collect();
    (pairs, missing, extra)
}

/// Build the comparison view (a `serde_json::Value` object) for one side of
/// one matched pair, honoring the config's header/body toggles.
fn build_view(call: &CapturedApiCall, config: &ApiDiffConfig) -> Value {
    let mut request = serde_json::Map::new();
    request.insert("url".to_string(), Value::String(call.request.url.clone()));
    request.insert("method".to_string(), Value::String(call.request.method.clone()));
    if config.compare_request_bodies {
        if let Some(body) = &call.request.body {
            request.insert("body".to_string(), serde_json::to_value(body).unwrap());
        }
    }
    if config.compare_headers {
        request.insert("headers".to_string(), filtered_headers(&call.request.headers, config));
    }

    let mut root = serde_json::Map::new();
    root.insert("request".to_string(), Value::Object(request));

    if let Some(response) = &call.response {
        let mut resp = serde_json::Map::new();
        resp.insert("status".to_string(), Value::from(response.status));
        if config.compare_response_bodies {
            if let Some(body) = &response.body {
                resp.insert("body".to_string(), serde_json::to_value(body).unwrap());
            }
        }
        if config.compare_headers {
            resp.insert("headers".to_string(), filtered_headers(&response.headers, config));
        }
        root.insert("response".to_string(), Value::Object(resp));
    }

    Value::Object(root)
}

fn filtered_headers(headers: &HashMap<String, String>, config: &ApiDiffConfig) -> Value {
    let map: serde_json::Map<String, Value> = headers
        .iter()
        .filter(|(k, _)| !config.ignore_headers.iter().any(|i| i.eq_ignore_ascii_case(k)))
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

/// Recursive structural diff over two `serde_json::Value`s, path-tracked.
fn diff_values(lhs: &Value, rhs: &Value, path: &mut Vec<String>, out: &mut Vec<DiffChange>) {
    match (lhs, rhs) {
        (Value::Object(l), Value::Object(r)) => {
            for (k, lv) in l {
                path.push(k.clone());
                match r.get(k) {
                    Some(rv) => diff_values(lv, rv, path, out),
                    None => out.push(DiffChange {
                        kind: DiffKind::Deleted,
                        path: path.clone(),
                        lhs: Some(lv.clone()),
                        rhs: None,
                        description: format!("{} removed", path.join(".")),
                    }),
                }
                path.pop();
            }
            for (k, rv) in r {
                if !l.contains_key(k) {
                    path.push(k.clone());
                    out.push(DiffChange {
                        kind: DiffKind::Added,
                        path: path.clone(),
                        lhs: None,
                        rhs: Some(rv.clone()),
                        description: format!("{} added", path.join(".")),
                    });
                    path.pop();
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            let max = l.len().max(r.len());
            for i in 0..max {
                path.push(i.to_string());
                match (l.get(i), r.get(i)) {
                    (Some(lv), Some(rv)) => diff_values(lv, rv, path, out),
                    (Some(lv), None) => out.push(DiffChange {
                        kind: DiffKind::Deleted,
                        path: path.clone(),
                        lhs: Some(lv.clone()),
                        rhs: None,
                        description: format!("{} removed", path.join(".")),
                    }),
                    (None, Some(rv)) => out.push(DiffChange {
                        kind: DiffKind::Added,
                        path: path.clone(),
                        lhs: None,
                        rhs: Some(rv.clone()),
                        description: format!("{} added", path.join(".")),
                    }),
                    (None, None) => unreachable!(),
                }
                path.pop();
            }
        }
        _ => {
            if lhs != rhs {
                out.push(DiffChange {
                    kind: DiffKind::Modified,
                    path: path.clone(),
                    lhs: Some(lhs.clone()),
                    rhs: Some(rhs.clone()),
                    description: format!("{} changed", path.join(".")),
                });
            }
        }
    }
}

fn status_changed(changes: &[DiffChange]) -> bool {
    changes.iter().any(|c| c.path.first().map(|s| s == "response").unwrap_or(false)
        && c.path.get(1).map(|s| s == "status").unwrap_or(false))
}

fn response_diff_remains(changes: &[DiffChange]) -> bool {
    changes.iter().any(|c| c.path.first().map(|s| s == "response").unwrap_or(false))
}

/// Compare one matched baseline/actual pair.
fn compare_pair(
    baseline: &CapturedApiCall,
    actual: &CapturedApiCall,
    baseline_index: usize,
    actual_index: usize,
    config: &ApiDiffConfig,
) -> ApiCallDiff {
    let lhs = build_view(baseline, config);
    let rhs = build_view(actual, config);
    let mut changes = Vec::new();
    diff_values(&lhs, &rhs, &mut Vec::new(), &mut changes);

    let matcher = IgnorePathMatcher::new(&config.ignore_paths);
    changes.retain(|c| !matcher.is_ignored(&c.path_string()));

    let severity = if status_changed(&changes) {
        Severity::Error
    } else if response_diff_remains(&changes) {
        Severity::Warning
    } else {
        Severity::Info
    };

    let passed = if config.strict {
        changes.is_empty()
    } else {
        !status_changed(&changes) && !response_diff_remains(&changes)
    };

    ApiCallDiff {
        baseline_index,
        actual_index,
        url: baseline.request.url.clone(),
        method: baseline.request.method.clone(),
        severity,
        passed,
        changes,
    }
}

/// `compareApiCalls` - Section 4.E.
pub fn compare_api_calls(
    baseline: &[CapturedApiCall],
    actual: &[CapturedApiCall],
    config: &ApiDiffConfig,
) -> ApiDiffResult {
    let (matched, missing_idx, extra_idx) = match_calls(baseline, actual);

    let pairs: Vec<ApiCallDiff> = matched
        .iter()
        .map(|(bi, ai)| compare_pair(&baseline[*bi], &actual[*ai], *bi, *ai, config))
        .collect();

    let missing_calls: Vec<CapturedApiCall> = missing_idx.iter().map(|i| baseline[*i].clone()).collect();
    let extra_calls: Vec<CapturedApiCall> = extra_idx.iter().map(|i| actual[*i].clone()).collect();

    let different = pairs.iter().filter(|p| !p.passed).count();
    let all_pairs_passed = pairs.iter().all(|p| p.passed);
    let passed = all_pairs_passed && missing_calls.is_empty() && (!config.strict || extra_calls.is_empty());

    ApiDiffResult {
        passed,
        summary: ApiDiffSummary {
            total: baseline.len(),
            matched: pairs.len(),
            different,
            missing: missing_calls.len(),
            extra: extra_calls.len(),
        },
        pairs,
        missing_calls,
        extra_calls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_common::model::{BodyValue, CapturedRequest, CapturedResponse, Initiator};
    use std::collections::HashMap;

    fn call(url: &str, method: &str, status: u16, body: Option<Value>) -> CapturedApiCall {
        CapturedApiCall {
            request: CapturedRequest {
                id: uuid::Uuid::new_v4().to_string(),
                url: url.to_string(),
                method: method.to_string(),
                headers: HashMap::new(),
                body: None,
                timestamp: 0,
                initiator: Initiator::Fetch,
            },
            response: Some(CapturedResponse {
                status,
                status_text: "OK".to_string(),
                headers: HashMap::new(),
                body: body.map(BodyValue::Json),
                response_time: 10,
                body_size: None,
            }),
            error: None,
            pending: false,
        }
    }

    #[test]
    fn reflexive_strict_comparison_passes() {
        let calls = vec![call("https://api.example.com/users", "GET", 200, Some(serde_json::json!({"id": 1})))];
        let config = ApiDiffConfig { strict: true, ..Default::default() };
        let result = compare_api_calls(&calls, &calls, &config);
        assert!(result.passed);
        assert_eq!(result.summary.different, 0);
    }

    #[test]
    fn missing_call_is_reported() {
        let baseline = vec![call("https://api.example.com/a", "GET", 200, None)];
        let actual: Vec<CapturedApiCall> = vec![];
        let result = compare_api_calls(&baseline, &actual, &ApiDiffConfig::default());
        assert!(!result.passed);
        assert_eq!(result.summary.missing, 1);
        assert_eq!(result.summary.total, 1);
    }

    #[test]
    fn status_change_is_error_severity_and_fails() {
        let baseline = vec![call("https://api.example.com/a", "GET", 200, None)];
        let actual = vec![call("https://api.example.com/a", "GET", 500, None)];
        let result = compare_api_calls(&baseline, &actual, &ApiDiffConfig::default());
        assert!(!result.passed);
        assert_eq!(result.pairs[0].severity, Severity::Error);
    }

    #[test]
    fn ignore_paths_suppress_body_diffs() {
        let baseline = vec![call("https://api.example.com/a", "GET", 200, Some(serde_json::json!({"ts": 1})))];
        let actual = vec![call("https://api.example.com/a", "GET", 200, Some(serde_json::json!({"ts": 2})))];
        let config = ApiDiffConfig { ignore_paths: vec!["response.body".to_string()], ..Default::default() };
        let result = compare_api_calls(&baseline, &actual, &config);
        assert!(result.passed);
        assert!(result.pairs[0].changes.is_empty());
    }

    #[test]
    fn non_strict_mode_ignores_request_only_diffs() {
        let mut baseline_call = call("https://api.example.com/a", "POST", 200, None);
        baseline_call.request.body = Some(BodyValue::Text("v1".into()));
        let mut actual_call = call("https://api.example.com/a", "POST", 200, None);
        actual_call.request.body = Some(BodyValue::Text("v2".into()));
        let result = compare_api_calls(&[baseline_call], &[actual_call], &ApiDiffConfig::default());
        assert!(result.passed);
        assert_eq!(result.pairs[0].severity, Severity::Info);
    }
}
