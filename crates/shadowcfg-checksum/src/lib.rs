//! Checksum ledger for shadowcfg.
//!
//! Every configuration snapshot is paired with a one-line sidecar file in the
//! coreutils checksum format (`<hex digest>  <absolute path>`). A snapshot is
//! *valid* only when the file and its sidecar both exist, the sidecar names
//! the snapshot's resolved path, and the recorded digest matches the current
//! content. Anything else (a missing sidecar, a torn write, a stale digest)
//! is a validity miss, never an error.
//!
//! # Key Types
//!
//! - [`ChecksumAlgorithm`] -- MD5 (`md5sum` compatible) or BLAKE3 (`b3sum` compatible)
//! - [`Sidecar`] -- parsed/rendered sidecar record
//! - [`Ledger`] -- seals files and answers validity questions
//! - [`Verification`] -- the detailed outcome of a validity check

pub mod algorithm;
pub mod error;
pub mod ledger;
pub mod sidecar;

pub use algorithm::ChecksumAlgorithm;
pub use error::{ChecksumError, ChecksumResult};
pub use ledger::{Ledger, Verification, DEFAULT_SUFFIX};
pub use sidecar::Sidecar;
