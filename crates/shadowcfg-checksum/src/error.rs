use std::io;
use std::path::PathBuf;

/// Errors from checksum operations.
///
/// Only sealing can fail; verification folds every problem into a
/// [`Verification`](crate::Verification) value instead.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The file to seal could not be resolved or read.
    #[error("cannot checksum {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A sidecar line did not follow `<hex>  <path>`.
    #[error("malformed sidecar: {0}")]
    Malformed(String),

    /// The resolved path cannot be written on a single sidecar line.
    #[error("path cannot be recorded in a sidecar: {}", .0.display())]
    UnsupportedPath(PathBuf),
}

/// Result alias for checksum operations.
pub type ChecksumResult<T> = Result<T, ChecksumError>;
