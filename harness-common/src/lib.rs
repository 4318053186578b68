//! Shared data model for the record-replay-diff harness.
//!
//! This crate holds only types that cross crate boundaries: the captured API
//! call family, the DOM/screenshot snapshot types, diff result primitives,
//! and the scenario AST. `capture-core`, `diff-engine`, and `replay-runner`
//! all depend on it and on nothing of each other's internals.

pub mod model;
pub mod scenario;

pub use model::{
    BaselineArtifact, BodyValue, CapturedApiCall, CapturedRequest, CapturedResponse, DiffChange,
    DiffKind, DomSnapshot, FileDescriptor, Initiator, LabelledSnapshot, MultipartField,
    ScreenshotImage, SerializedNode, Severity,
};
pub use scenario::{
    Scenario, ScenarioMeta, ScenarioValidationError, Selector, SelectorStrategy, Step,
    AST_MAJOR_VERSION, AST_SCHEMA_VERSION,
};
