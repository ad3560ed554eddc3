use std::io;
use std::path::PathBuf;

use shadowcfg_merge::MergeError;
use shadowcfg_snapshot::SnapshotError;
use thiserror::Error;

/// Errors that stop the recovery of one name. Other names are unaffected.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("{name}: no factory default (neither {} nor a local orig exists)", reference.display())]
    MissingOrig { name: String, reference: PathBuf },

    #[error("unknown managed config: {0}")]
    UnknownName(String),

    #[error("{name}: conf is not valid; run recovery first")]
    ConfNotValid { name: String },

    #[error("{name}: a merge was left unfinished; run recovery first")]
    MergePending { name: String },

    #[error("{name}: no update in progress (back is not valid)")]
    NoUpdateInProgress { name: String },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Problems with a [`StoreConfig`](crate::StoreConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid managed config name {0:?}")]
    InvalidName(String),

    #[error("managed config {0:?} is listed twice")]
    DuplicateName(String),

    #[error("invalid sidecar suffix {0:?}")]
    InvalidSuffix(String),
}
