//! Diff engine - the comparison layer (Sections 4.E-4.I).
//!
//! Three independent differs (API, DOM, visual) plus the facade that runs
//! whichever of them applies and aggregates pass/fail, plus the replay
//! driver contract the scenario player must satisfy.

pub mod api_diff;
pub mod config;
pub mod dom_diff;
pub mod facade;
pub mod ignore_path;
pub mod replay_contract;
pub mod visual_diff;

pub use api_diff::{compare_api_calls, ApiCallDiff, ApiDiffResult, ApiDiffSummary};
pub use config::{ApiDiffConfig, CompareOptions, DomDiffConfig, MaskRect, VisualDiffConfig};
pub use dom_diff::{compare_dom_snapshots, DomChangeKind, DomChangeType, DomDiffChange, DomDiffResult};
pub use facade::{compare, ComparisonResult};
pub use replay_contract::{ReplayDriver, ReplayError, RunOutcome, RunSummary};
pub use visual_diff::{compare_screenshots, decode_input, VisualDiffResult};
