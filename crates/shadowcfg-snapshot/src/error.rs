use std::io;
use std::path::PathBuf;

use shadowcfg_checksum::ChecksumError;

use crate::fault::FsOpKind;

/// Errors from snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A file operation on a snapshot failed.
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Computing a checksum failed.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// The read-only factory copy needed to (re)create `orig` is absent.
    #[error("read-only reference {} is missing", .0.display())]
    MissingReference(PathBuf),

    /// A fault injector cut the operation short.
    #[error("interrupted during {op} of {}", path.display())]
    Interrupted { op: FsOpKind, path: PathBuf },
}

impl SnapshotError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { op, path, source }
    }
}

/// Result alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
