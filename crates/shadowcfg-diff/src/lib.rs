//! Diff engine for shadowcfg.
//!
//! Computes line-level patches between two versions of a configuration file
//! and re-applies them onto a third version, the way `diff -u` and `patch`
//! would, but in-process.
//!
//! # Key Types
//!
//! - [`Patch`] / [`Hunk`] / [`PatchLine`] -- Line-level patch with context
//! - [`diff_lines`] -- Myers diff (via `similar`) into hunks
//! - [`apply`] -- Strict-context application; any rejected hunk fails the whole patch

pub mod apply;
pub mod error;
pub mod patch;

pub use apply::apply;
pub use error::ApplyError;
pub use patch::{diff_lines, Hunk, Patch, PatchLine, DEFAULT_CONTEXT};
