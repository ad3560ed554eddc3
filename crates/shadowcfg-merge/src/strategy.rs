use serde::Serialize;
use shadowcfg_diff::{ApplyError, Patch, DEFAULT_CONTEXT};

/// Why local edits could not be carried onto a new default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MergeConflict {
    /// One of the inputs is not UTF-8 and cannot be line-merged.
    #[error("{side} is not UTF-8 text")]
    NotText { side: &'static str },

    /// Some hunks of the local patch found no matching context.
    #[error("{rejected} of {total} hunks rejected")]
    Rejected { rejected: usize, total: usize },
}

/// Diff/patch backend used by the merge engine.
///
/// `merge(base, modified, new_base)` either yields the merged content or a
/// conflict; there is no partially merged result.
pub trait PatchStrategy: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// The edits that turn `base` into `modified`.
    fn diff(&self, base: &[u8], modified: &[u8]) -> Result<Patch, MergeConflict>;

    /// Apply every hunk of `patch` to `target`, or fail as a whole.
    fn apply(&self, patch: &Patch, target: &[u8]) -> Result<Vec<u8>, MergeConflict>;

    /// Re-apply the edits between `base` and `modified` onto `new_base`.
    fn merge(&self, base: &[u8], modified: &[u8], new_base: &[u8]) -> Result<Vec<u8>, MergeConflict> {
        let patch = self.diff(base, modified)?;
        self.apply(&patch, new_base)
    }
}

/// Line-based strategy: unified-diff hunks with `context` lines, applied
/// with exact context matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextPatchStrategy {
    context: usize,
}

impl Default for TextPatchStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT)
    }
}

impl TextPatchStrategy {
    pub const fn new(context: usize) -> Self {
        Self { context }
    }

    pub const fn context(&self) -> usize {
        self.context
    }
}

impl PatchStrategy for TextPatchStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    fn diff(&self, base: &[u8], modified: &[u8]) -> Result<Patch, MergeConflict> {
        let base = as_text(base, "base")?;
        let modified = as_text(modified, "conf")?;
        Ok(shadowcfg_diff::diff_lines(base, modified, self.context))
    }

    fn apply(&self, patch: &Patch, target: &[u8]) -> Result<Vec<u8>, MergeConflict> {
        let target = as_text(target, "orig")?;
        shadowcfg_diff::apply(patch, target)
            .map(String::into_bytes)
            .map_err(|e| match e {
                ApplyError::Rejected { rejected, total } => MergeConflict::Rejected {
                    rejected: rejected.len(),
                    total,
                },
            })
    }
}

fn as_text<'a>(bytes: &'a [u8], side: &'static str) -> Result<&'a str, MergeConflict> {
    std::str::from_utf8(bytes).map_err(|_| MergeConflict::NotText { side })
}
