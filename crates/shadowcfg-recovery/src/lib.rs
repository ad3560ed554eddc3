//! Boot-time recovery for shadowcfg.
//!
//! [`RecoveryDriver`] walks every managed configuration once per boot and
//! leaves each one with a valid `conf`: restoring an interrupted update from
//! its backup, merging a newly shipped factory default, or initializing from
//! scratch. Every step is safe to cut short; the next pass picks up from
//! whatever the sidecars say.
//!
//! # Key Types
//!
//! - [`StoreConfig`] / [`ManagedConfig`] -- directories, checksum policy, names
//! - [`RecoveryDriver`] -- the per-boot pass and status inspection
//! - [`UpdateTransaction`] -- backup / write / commit for live changes
//! - [`PassReport`] / [`Outcome`] -- what a pass did, per name

pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod transaction;

#[cfg(test)]
mod testing;

pub use config::{ManagedConfig, StoreConfig};
pub use driver::RecoveryDriver;
pub use error::{ConfigError, RecoveryError, RecoveryResult};
pub use report::{NameFailure, NameReport, NameStatus, Outcome, PassReport, SnapshotStatus};
pub use transaction::UpdateTransaction;

// Re-export the types callers need to interpret reports.
pub use shadowcfg_checksum::{ChecksumAlgorithm, Verification};
pub use shadowcfg_merge::{MergeConflict, MergeOutcome, PatchStrategy};
pub use shadowcfg_snapshot::{SnapshotKind, SyncMode};
