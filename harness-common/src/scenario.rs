//! The versioned scenario AST.
//!
//! Modeled the way the teacher's `flow::model` represents a recorded browser
//! flow (`FlowProfile` / `FlowStep` / `SmartSelector`): a tagged-union step
//! list plus a self-describing selector type, both serde-friendly so the AST
//! is the actual wire format a scenario-storage backend would persist.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The AST's own semver. A scenario is accepted iff its `major` matches
/// [`AST_MAJOR_VERSION`]; minor/patch drift is tolerated.
pub const AST_MAJOR_VERSION: u32 = 1;
pub const AST_SCHEMA_VERSION: &str = "1.0.0";

/// How a `Selector` locates an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorStrategy {
    TestId,
    Role,
    Css,
    XPath,
}

/// A selector is either a bare CSS string or a tagged strategy object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Plain(String),
    Strategy {
        strategy: SelectorStrategy,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Strategy {
            strategy: SelectorStrategy::Css,
            value: value.into(),
            role: None,
            name: None,
        }
    }

    /// The value a CSS-capable driver should pass straight to `querySelector`.
    /// XPath/role selectors are resolved by the driver, not here.
    pub fn css_value(&self) -> Option<&str> {
        match self {
            Selector::Plain(s) => Some(s),
            Selector::Strategy { strategy: SelectorStrategy::Css, value, .. } => Some(value),
            _ => None,
        }
    }
}

/// A single recorded step. Discriminated by `type`, mirroring the teacher's
/// `FlowStep` tagged union one-for-one in spirit (navigate/click/type/wait
/// map directly; `assertApi`/`assertElement`/`snapshotDom` are specific to
/// this harness's record-replay-diff role rather than generic flow capture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    Navigate {
        url: String,
        #[serde(rename = "waitFor", skip_serializing_if = "Option::is_none")]
        wait_for: Option<String>,
    },
    Click {
        selector: Selector,
    },
    Type {
        selector: Selector,
        value: String,
        #[serde(default, rename = "isMasked")]
        is_masked: bool,
    },
    KeyPress {
        key: String,
        #[serde(default)]
        modifiers: Vec<String>,
    },
    Wait {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    Hover {
        selector: Selector,
    },
    Scroll {
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<Selector>,
        #[serde(default)]
        dx: i32,
        #[serde(default)]
        dy: i32,
    },
    Select {
        selector: Selector,
        value: String,
    },
    AssertApi {
        label: String,
        #[serde(rename = "urlPattern")]
        url_pattern: String,
    },
    AssertElement {
        selector: Selector,
        #[serde(rename = "expectedText", skip_serializing_if = "Option::is_none")]
        expected_text: Option<String>,
    },
    SnapshotDom {
        label: String,
        #[serde(default, rename = "withScreenshot")]
        with_screenshot: bool,
    },
}

/// Free-form scenario metadata, including the AST version gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(rename = "astSchemaVersion")]
    pub ast_schema_version: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self { ast_schema_version: AST_SCHEMA_VERSION.to_string(), tags: Vec::new() }
    }
}

/// A complete recorded scenario: the unit the replay driver consumes and the
/// unit a scenario-storage backend would persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub meta: ScenarioMeta,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub setup: Vec<Step>,
    #[serde(default)]
    pub teardown: Vec<Step>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Error returned by [`Scenario::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScenarioValidationError {
    #[error("unsupported scenario AST major version: {found} (expected {expected})")]
    UnsupportedMajorVersion { found: u32, expected: u32 },
    #[error("malformed astSchemaVersion string: {0:?}")]
    MalformedVersion(String),
    #[error("scenario has no steps")]
    Empty,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Some(name.into()),
            description: None,
            meta: ScenarioMeta::default(),
            steps: Vec::new(),
            setup: Vec::new(),
            teardown: Vec::new(),
            variables: HashMap::new(),
        }
    }

    pub fn add_step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Validate at the ingest boundary only: AST version gate and basic
    /// shape. Individual step executability is the driver's concern.
    pub fn validate(&self) -> Result<(), ScenarioValidationError> {
        let major: u32 = self
            .meta
            .ast_schema_version
            .split('.')
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                ScenarioValidationError::MalformedVersion(self.meta.ast_schema_version.clone())
            })?;
        if major != AST_MAJOR_VERSION {
            return Err(ScenarioValidationError::UnsupportedMajorVersion {
                found: major,
                expected: AST_MAJOR_VERSION,
            });
        }
        if self.steps.is_empty() {
            return Err(ScenarioValidationError::Empty);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_creation_and_steps() {
        let mut scenario = Scenario::new("login flow");
        scenario
            .add_step(Step::Navigate { url: "https://example.com".into(), wait_for: None })
            .add_step(Step::Click { selector: Selector::css("#submit") });
        assert_eq!(scenario.steps.len(), 2);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn rejects_future_major_version() {
        let mut scenario = Scenario::new("x");
        scenario.add_step(Step::Wait { duration_ms: 10 });
        scenario.meta.ast_schema_version = "2.0.0".to_string();
        assert_eq!(
            scenario.validate(),
            Err(ScenarioValidationError::UnsupportedMajorVersion { found: 2, expected: 1 })
        );
    }

    #[test]
    fn rejects_empty_scenario() {
        let scenario = Scenario::new("empty");
        assert_eq!(scenario.validate(), Err(ScenarioValidationError::Empty));
    }

    #[test]
    fn step_serialization_round_trip() {
        let step = Step::Type {
            selector: Selector::css("#password"),
            value: "hunter2".into(),
            is_masked: true,
        };
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(step, back);
    }
}
