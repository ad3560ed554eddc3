use shadowcfg_snapshot::SnapshotError;

/// Errors that abort a merge. Conflicts are not errors; see
/// [`MergeOutcome`](crate::MergeOutcome).
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The merge was asked for while `conf` is not valid.
    #[error("{name}: conf is not valid, nothing to merge from")]
    ConfNotValid { name: String },
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
