//! Replay runner - a reference `diff_engine::ReplayDriver` implementation.
//!
//! `diff-engine` specifies *what* a scenario run must produce (Section 4.I);
//! this crate is one concrete *how*, built on `chromiumoxide` the same way
//! the teacher's flow engine drove a page, now dispatching
//! `harness_common::scenario::Step` and assembling a `BaselineArtifact`
//! instead of extracting session cookies.
//!
//! ## Example
//!
//! ```rust,ignore
//! use diff_engine::ReplayDriver;
//! use replay_runner::ChromeReplayDriver;
//!
//! let mut driver = ChromeReplayDriver::new();
//! let outcome = driver.run(&scenario).await?;
//! ```

pub mod driver;
pub mod error;

pub use diff_engine::{ReplayDriver, ReplayError, RunOutcome, RunSummary};
pub use driver::browser::{BrowserManager, BrowserOptions, ManagedBrowser};
pub use driver::executor::ChromeReplayDriver;
pub use driver::page::PageController;
pub use error::{RunnerError, RunnerResult};
