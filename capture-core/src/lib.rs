//! Capture core - the runtime-patched fetch/XHR tap and its Rust-side
//! lifecycle (Sections 4.A-4.D).
//!
//! A Rust process cannot redefine a page's `window.fetch`; the tap itself is
//! generated JavaScript (`tap::capture_script`) injected via
//! `chromiumoxide::Page::evaluate`. This crate owns everything *around* that
//! script: configuration, pure-Rust body/header normalization (`serializer`,
//! independently testable and reusable against stored baselines), ignore
//! pattern matching (`filter`), and the `ApiInterceptor` facade that starts,
//! stops, drains, and merges it.

pub mod config;
pub mod error;
pub mod filter;
pub mod interceptor;
pub mod serializer;
pub mod tap;

pub use config::{default_ignore_patterns, TapConfig, TapConfigPatch};
pub use error::{CaptureError, CaptureResult};
pub use filter::IgnoreMatcher;
pub use interceptor::ApiInterceptor;

pub type Result<T> = std::result::Result<T, CaptureError>;
