//! Component F: the DOM differ.
//!
//! Pipeline: filter both trees down to what the config says matters, then
//! run an order-sensitive recursive diff keyed by a stable per-child
//! identity so moves are distinguishable from adds/deletes. No tree-diff
//! crate exists in the reference corpus for this shape (checked across all
//! five example repos and `other_examples/`), so this is hand-written core
//! domain logic, same as the API differ.

use std::collections::{HashMap, VecDeque};

use harness_common::model::SerializedNode;
use serde::Serialize;

use crate::config::DomDiffConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomChangeKind {
    Added,
    Deleted,
    Modified,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomChangeType {
    Attribute,
    Text,
    Element,
    Structure,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomDiffChange {
    pub kind: DomChangeKind,
    pub change_type: DomChangeType,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DomDiffSummary {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub moved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomDiffResult {
    pub passed: bool,
    pub changes: Vec<DomDiffChange>,
    pub summary: DomDiffSummary,
}

fn selector_matches(tag_name: &str, attributes: &HashMap<String, String>, pattern: &str) -> bool {
    if let Some(id) = pattern.strip_prefix('#') {
        return attributes.get("id").map(|v| v == id).unwrap_or(false);
    }
    if let Some(class) = pattern.strip_prefix('.') {
        return attributes
            .get("class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false);
    }
    tag_name.eq_ignore_ascii_case(pattern)
}

/// Filter one tree per Section 4.F's pre-filter rules. Returns `None` if the
/// node itself should be dropped entirely.
fn filter_node(node: &SerializedNode, config: &DomDiffConfig, depth: usize) -> Option<SerializedNode> {
    if let Some(max) = config.max_depth {
        if depth > max {
            return None;
        }
    }
    match node {
        SerializedNode::Comment { .. } => None,
        SerializedNode::Text { content } => {
            if !config.compare_text {
                return None;
            }
            let normalized = if config.ignore_whitespace { content.trim().to_string() } else { content.clone() };
            if normalized.is_empty() {
                None
            } else {
                Some(SerializedNode::Text { content: normalized })
            }
        }
        SerializedNode::Element { tag_name, attributes, computed_style, children } => {
            if config.ignore_selectors.iter().any(|p| selector_matches(tag_name, attributes, p)) {
                return None;
            }
            let filtered_attrs: HashMap<String, String> = attributes
                .iter()
                .filter(|(k, _)| !config.ignore_attributes.iter().any(|i| i == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let style = if config.compare_styles {
                computed_style.as_ref().map(|style| {
                    if config.style_properties.is_empty() {
                        style.clone()
                    } else {
                        style
                            .iter()
                            .filter(|(k, _)| config.style_properties.iter().any(|p| p == *k))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    }
                })
            } else {
                None
            };
            let filtered_children: Vec<SerializedNode> =
                children.iter().filter_map(|c| filter_node(c, config, depth + 1)).collect();
            Some(SerializedNode::Element {
                tag_name: tag_name.clone(),
                attributes: filtered_attrs,
                computed_style: style,
                children: filtered_children,
            })
        }
    }
}

/// Stable per-child identity, used to detect moves across sibling lists.
fn identity_key(node: &SerializedNode, index: usize) -> String {
    match node {
        SerializedNode::Element { tag_name, attributes, .. } => {
            let id = attributes.get("id").cloned().unwrap_or_default();
            let testid = attributes.get("data-testid").cloned().unwrap_or_default();
            format!("{tag_name}#{id}#{testid}")
        }
        SerializedNode::Text { .. } => format!("text:{index}"),
        SerializedNode::Comment { .. } => format!("comment:{index}"),
    }
}

fn diff_attributes(
    lhs: &HashMap<String, String>,
    rhs: &HashMap<String, String>,
    path: &str,
    out: &mut Vec<DomDiffChange>,
) {
    for (k, v) in lhs {
        match rhs.get(k) {
            None => out.push(DomDiffChange {
                kind: DomChangeKind::Deleted,
                change_type: DomChangeType::Attribute,
                path: format!("{path}@{k}"),
                description: format!("attribute {k}={v:?} removed"),
            }),
            Some(rv) if rv != v => out.push(DomDiffChange {
                kind: DomChangeKind::Modified,
                change_type: DomChangeType::Attribute,
                path: format!("{path}@{k}"),
                description: format!("attribute {k} changed from {v:?} to {rv:?}"),
            }),
            _ => {}
        }
    }
    for (k, v) in rhs {
        if !lhs.contains_key(k) {
            out.push(DomDiffChange {
                kind: DomChangeKind::Added,
                change_type: DomChangeType::Attribute,
                path: format!("{path}@{k}"),
                description: format!("attribute {k}={v:?} added"),
            });
        }
    }
}

fn diff_node(lhs: &SerializedNode, rhs: &SerializedNode, path: &str, out: &mut Vec<DomDiffChange>) {
    match (lhs, rhs) {
        (SerializedNode::Text { content: l }, SerializedNode::Text { content: r }) => {
            if l != r {
                out.push(DomDiffChange {
                    kind: DomChangeKind::Modified,
                    change_type: DomChangeType::Text,
                    path: path.to_string(),
                    description: format!("text changed from {l:?} to {r:?}"),
                });
            }
        }
        (
            SerializedNode::Element { tag_name: lt, attributes: la, children: lc, .. },
            SerializedNode::Element { tag_name: rt, attributes: ra, children: rc, .. },
        ) => {
            if lt != rt {
                out.push(DomDiffChange {
                    kind: DomChangeKind::Modified,
                    change_type: DomChangeType::Element,
                    path: path.to_string(),
                    description: format!("tag changed from {lt} to {rt}"),
                });
            }
            diff_attributes(la, ra, path, out);
            diff_children(lc, rc, path, out);
        }
        _ => out.push(DomDiffChange {
            kind: DomChangeKind::Modified,
            change_type: DomChangeType::Structure,
            path: path.to_string(),
            description: "node type changed".to_string(),
        }),
    }
}

/// Order-sensitive sibling diff keyed by stable identity, so a child that
/// reappears at a different index is reported as `Moved` rather than as a
/// delete+add pair.
fn diff_children(lhs: &[SerializedNode], rhs: &[SerializedNode], path: &str, out: &mut Vec<DomDiffChange>) {
    let mut rhs_by_key: HashMap<String, VecDeque<(usize, &SerializedNode)>> = HashMap::new();
    for (i, node) in rhs.iter().enumerate() {
        rhs_by_key.entry(identity_key(node, i)).or_default().push_back((i, node));
    }

    let mut consumed_rhs = vec![false; rhs.len()];
    let mut expected_rhs_index = 0usize;

    for (li, lnode) in lhs.iter().enumerate() {
        let key = identity_key(lnode, li);
        let child_path = format!("{path}>{key}");
        match rhs_by_key.get_mut(&key).and_then(|q| q.pop_front()) {
            Some((ri, rnode)) => {
                consumed_rhs[ri] = true;
                if ri != expected_rhs_index {
                    out.push(DomDiffChange {
                        kind: DomChangeKind::Moved,
                        change_type: DomChangeType::Structure,
                        path: child_path.clone(),
                        description: format!("moved from position {li} to {ri}"),
                    });
                }
                expected_rhs_index = ri + 1;
                diff_node(lnode, rnode, &child_path, out);
            }
            None => out.push(DomDiffChange {
                kind: DomChangeKind::Deleted,
                change_type: DomChangeType::Structure,
                path: child_path,
                description: format!("child at position {li} removed"),
            }),
        }
    }

    for (ri, rnode) in rhs.iter().enumerate() {
        if !consumed_rhs[ri] {
            let key = identity_key(rnode, ri);
            out.push(DomDiffChange {
                kind: DomChangeKind::Added,
                change_type: DomChangeType::Structure,
                path: format!("{path}>{key}"),
                description: format!("child at position {ri} added"),
            });
        }
    }
}

/// `compareDomSnapshots` - Section 4.F.
pub fn compare_dom_snapshots(
    baseline: &SerializedNode,
    actual: &SerializedNode,
    config: &DomDiffConfig,
) -> DomDiffResult {
    let lhs = filter_node(baseline, config, 0);
    let rhs = filter_node(actual, config, 0);

    let mut changes = Vec::new();
    match (&lhs, &rhs) {
        (Some(l), Some(r)) => diff_node(l, r, "root", &mut changes),
        (None, None) => {}
        (Some(_), None) => changes.push(DomDiffChange {
            kind: DomChangeKind::Deleted,
            change_type: DomChangeType::Structure,
            path: "root".to_string(),
            description: "root filtered out in actual".to_string(),
        }),
        (None, Some(_)) => changes.push(DomDiffChange {
            kind: DomChangeKind::Added,
            change_type: DomChangeType::Structure,
            path: "root".to_string(),
            description: "root filtered out in baseline".to_string(),
        }),
    }

    let mut summary = DomDiffSummary::default();
    for c in &changes {
        match c.kind {
            DomChangeKind::Added => summary.added += 1,
            DomChangeKind::Deleted => summary.deleted += 1,
            DomChangeKind::Modified => summary.modified += 1,
            DomChangeKind::Moved => summary.moved += 1,
        }
    }

    DomDiffResult { passed: changes.is_empty(), changes, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn elem(tag: &str, attrs: &[(&str, &str)], children: Vec<SerializedNode>) -> SerializedNode {
        SerializedNode::Element {
            tag_name: tag.to_string(),
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            computed_style: None,
            children,
        }
    }

    fn text(s: &str) -> SerializedNode {
        SerializedNode::Text { content: s.to_string() }
    }

    #[test]
    fn reflexive_comparison_has_no_diffs() {
        let tree = elem("div", &[("id", "root")], vec![text("hello")]);
        let result = compare_dom_snapshots(&tree, &tree, &DomDiffConfig::default());
        assert!(result.passed);
        assert_eq!(result.changes.len(), 0);
    }

    #[test]
    fn attribute_change_is_detected() {
        let a = elem("button", &[("class", "primary")], vec![]);
        let b = elem("button", &[("class", "secondary")], vec![]);
        let result = compare_dom_snapshots(&a, &b, &DomDiffConfig::default());
        assert!(!result.passed);
        assert_eq!(result.summary.modified, 1);
        assert_eq!(result.changes[0].change_type, DomChangeType::Attribute);
    }

    #[test]
    fn ignore_selectors_drops_matching_elements() {
        let a = elem("div", &[], vec![elem("script", &[], vec![text("noise")])]);
        let b = elem("div", &[], vec![]);
        let config = DomDiffConfig { ignore_selectors: vec!["script".to_string()], ..Default::default() };
        let result = compare_dom_snapshots(&a, &b, &config);
        assert!(result.passed);
    }

    #[test]
    fn whitespace_only_text_is_ignored_by_default() {
        let a = elem("p", &[], vec![text("  ")]);
        let b = elem("p", &[], vec![]);
        let result = compare_dom_snapshots(&a, &b, &DomDiffConfig::default());
        assert!(result.passed);
    }

    #[test]
    fn moved_child_is_reported_as_moved_not_delete_add() {
        let a = elem("ul", &[], vec![elem("li", &[("id", "a")], vec![]), elem("li", &[("id", "b")], vec![])]);
        let b = elem("ul", &[], vec![elem("li", &[("id", "b")], vec![]), elem("li", &[("id", "a")], vec![])]);
        let result = compare_dom_snapshots(&a, &b, &DomDiffConfig::default());
        assert!(result.changes.iter().any(|c| c.kind == DomChangeKind::Moved));
    }
}
