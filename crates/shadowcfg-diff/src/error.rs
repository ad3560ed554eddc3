//! Error types for the diff crate.

/// Errors that can occur while applying a patch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// One or more hunks found no matching context in the target.
    ///
    /// `rejected` holds the 0-based indices of the failing hunks.
    #[error("{} of {total} hunks rejected", rejected.len())]
    Rejected { rejected: Vec<usize>, total: usize },
}
