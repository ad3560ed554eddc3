//! Merge engine for shadowcfg.
//!
//! When a new factory default lands, the edits made to the live config since
//! the previous default (`diff(base, conf)`) are re-applied onto the new
//! default. A patch that does not apply cleanly is discarded in full and the
//! live config is reset to the new default.
//!
//! # Key Types
//!
//! - [`PatchStrategy`] -- pluggable diff/apply backend
//! - [`TextPatchStrategy`] -- in-process line diff with strict context
//! - [`MergeEngine`] -- drives the merge (or hard reset) over sealed snapshots
//! - [`MergeOutcome`] / [`MergeConflict`] -- what happened to local edits

pub mod engine;
pub mod error;
pub mod strategy;

pub use engine::{MergeEngine, MergeOutcome};
pub use error::{MergeError, MergeResult};
pub use strategy::{MergeConflict, PatchStrategy, TextPatchStrategy};
