//! Sealed snapshot storage for shadowcfg.
//!
//! A managed configuration `name` is kept as four sibling files in a writable
//! directory, each paired with a checksum sidecar:
//!
//! ```text
//! name.orig  name.orig.md5   factory default for the running image
//! name.base  name.base.md5   the orig that the current conf was derived from
//! name.conf  name.conf.md5   the live configuration programs read
//! name.back  name.back.md5   transient backup of conf during an update
//! name.patch                 transient diff written during a merge
//! ```
//!
//! # Design Rules
//!
//! 1. Content is written first, the sidecar second. A crash between the two
//!    leaves the snapshot reported invalid, never half-committed as valid.
//! 2. Removal drops the sidecar before the file, so a partially removed
//!    snapshot is also invalid.
//! 3. No renames and no journaling: every step is a plain copy, write or
//!    unlink, and recovery relies only on sidecar validity.
//! 4. All I/O errors are propagated to the caller.
//!
//! Every primitive file operation is announced to an optional
//! [`FaultInjector`] first, which lets tests cut power at any step.

pub mod error;
pub mod fault;
mod fsio;
pub mod kind;
pub mod manager;
pub mod paths;

pub use error::{SnapshotError, SnapshotResult};
pub use fault::{Fault, FaultInjector, FsOp, FsOpKind, OpRecorder, PowerCut};
pub use fsio::SyncMode;
pub use kind::SnapshotKind;
pub use manager::SnapshotManager;
pub use paths::SnapshotPaths;
