use std::sync::Arc;

use serde::Serialize;
use shadowcfg_snapshot::{SnapshotKind, SnapshotManager};
use tracing::{debug, info, warn};

use crate::error::{MergeError, MergeResult};
use crate::strategy::{MergeConflict, PatchStrategy};

/// What an upgrade did to the live configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Local edits were carried onto the new default.
    Clean { hunks: usize },
    /// Local edits did not apply; `conf` was reset to the new default.
    Conflict { conflict: MergeConflict },
    /// No valid baseline existed; `conf` was reset to the new default.
    HardReset,
}

impl MergeOutcome {
    /// `true` if local edits survived.
    pub fn kept_local_edits(&self) -> bool {
        matches!(self, Self::Clean { .. })
    }
}

/// Runs upgrade merges over the snapshots of one managed configuration.
#[derive(Clone, Debug)]
pub struct MergeEngine {
    strategy: Arc<dyn PatchStrategy>,
}

impl MergeEngine {
    pub fn new(strategy: Arc<dyn PatchStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &dyn PatchStrategy {
        self.strategy.as_ref()
    }

    /// Carry the edits `base -> conf` onto the new `orig`.
    ///
    /// Requires a valid `conf` and a local `orig`. Without a valid `base`
    /// this degrades to [`hard_reset`](Self::hard_reset). Step order:
    ///
    /// 1. write `diff(base, conf)` to `name.patch`
    /// 2. back up `conf` to `back`
    /// 3. apply the patch to `orig`; on any rejected hunk use `orig` as is
    /// 4. write and seal the result as `conf`
    /// 5. seal `orig`, marking the upgrade processed
    /// 6. discard `name.patch` and `back`
    /// 7. promote `orig` to `base`
    ///
    /// `orig` is sealed before the patch and backup are discarded. Until
    /// then an interrupted merge is recognisable (pending upgrade, patch
    /// present, valid `back`) and is redone from `back`, never from an
    /// already merged `conf`.
    pub fn merge(&self, snapshots: &SnapshotManager) -> MergeResult<MergeOutcome> {
        let name = snapshots.name();
        if !snapshots.is_valid(SnapshotKind::Conf) {
            return Err(MergeError::ConfNotValid { name: name.to_string() });
        }
        if !snapshots.is_valid(SnapshotKind::Base) {
            self.hard_reset(snapshots)?;
            return Ok(MergeOutcome::HardReset);
        }

        let base = snapshots.read(SnapshotKind::Base)?;
        let conf = snapshots.read(SnapshotKind::Conf)?;
        let diffed = self.strategy.diff(&base, &conf);
        if let Ok(patch) = &diffed {
            let unified = patch.to_unified(&format!("a/{name}.base"), &format!("b/{name}.conf"));
            snapshots.write_patch(unified.as_bytes())?;
            debug!(name, hunks = patch.hunks.len(), "local edits recorded");
        }

        snapshots.backup()?;

        let orig = snapshots.read(SnapshotKind::Orig)?;
        let applied = diffed.and_then(|patch| {
            let hunks = patch.hunks.len();
            self.strategy.apply(&patch, &orig).map(|merged| (merged, hunks))
        });
        let (merged, outcome) = match applied {
            Ok((merged, hunks)) => (merged, MergeOutcome::Clean { hunks }),
            Err(conflict) => {
                warn!(
                    name,
                    strategy = self.strategy.name(),
                    %conflict,
                    "local edits do not apply to the new default; discarding them"
                );
                (orig, MergeOutcome::Conflict { conflict })
            }
        };

        snapshots.write_and_seal(SnapshotKind::Conf, &merged)?;
        snapshots.seal(SnapshotKind::Orig)?;
        snapshots.discard_patch()?;
        snapshots.discard(SnapshotKind::Back)?;
        snapshots.copy_and_seal(SnapshotKind::Orig, SnapshotKind::Base)?;

        info!(name, ?outcome, "merged new factory default");
        Ok(outcome)
    }

    /// Replace `conf` with `orig` outright, then mark the upgrade processed
    /// and promote `orig` to `base`.
    pub fn hard_reset(&self, snapshots: &SnapshotManager) -> MergeResult<()> {
        let name = snapshots.name();
        warn!(name, "no valid baseline; resetting conf to the factory default");
        snapshots.copy_and_seal(SnapshotKind::Orig, SnapshotKind::Conf)?;
        snapshots.seal(SnapshotKind::Orig)?;
        snapshots.copy_and_seal(SnapshotKind::Orig, SnapshotKind::Base)?;
        Ok(())
    }
}
