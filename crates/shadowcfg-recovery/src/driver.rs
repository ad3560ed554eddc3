use std::sync::Arc;

use shadowcfg_merge::{MergeEngine, PatchStrategy, TextPatchStrategy};
use shadowcfg_snapshot::{FaultInjector, SnapshotKind, SnapshotManager};
use tracing::{debug, error, info, warn};

use crate::config::{ManagedConfig, StoreConfig};
use crate::error::{RecoveryError, RecoveryResult};
use crate::report::{NameStatus, Outcome, PassReport, SnapshotStatus};
use crate::transaction::UpdateTransaction;

/// Brings every managed configuration back to a valid `conf`.
///
/// Run once at startup, before anything reads the configs. The per-name
/// decision looks only at sidecar validity:
///
/// | `conf` | `back` | upgrade pending | action                     |
/// |--------|--------|-----------------|----------------------------|
/// | valid  | any    | no              | none                       |
/// | valid  | any    | yes             | merge                      |
/// | bad    | valid  | no              | restore                    |
/// | bad    | valid  | yes             | restore, then merge        |
/// | bad    | bad    | any             | initialize from `orig`     |
///
/// A merge cut short after rewriting `conf` is recognised by a pending
/// upgrade together with `name.patch` and a valid `back`; it is redone from
/// `back`. Every pass ends by removing leftovers and promoting `orig` to
/// `base` if a previous pass stopped before doing so.
#[derive(Clone, Debug)]
pub struct RecoveryDriver {
    config: StoreConfig,
    engine: MergeEngine,
    faults: Option<Arc<dyn FaultInjector>>,
}

impl RecoveryDriver {
    pub fn new(config: StoreConfig) -> RecoveryResult<Self> {
        config.validate()?;
        let strategy = Arc::new(TextPatchStrategy::new(config.context_lines));
        Ok(Self {
            config,
            engine: MergeEngine::new(strategy),
            faults: None,
        })
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn PatchStrategy>) -> Self {
        self.engine = MergeEngine::new(strategy);
        self
    }

    /// Route every file operation through `faults`.
    pub fn with_faults(mut self, faults: Arc<dyn FaultInjector>) -> Self {
        self.faults = Some(faults);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Snapshot manager for a managed name.
    pub fn snapshots(&self, name: &str) -> RecoveryResult<SnapshotManager> {
        Ok(self.manager_for(self.lookup(name)?))
    }

    // ---- Recovery ----

    /// Recover every managed name, in configuration order.
    pub fn run(&self) -> PassReport {
        let names: Vec<&str> = self.config.names().collect();
        self.run_selected(&names)
    }

    /// Recover the given names. A failure is recorded and the pass moves on.
    pub fn run_selected<S: AsRef<str>>(&self, names: &[S]) -> PassReport {
        info!(names = names.len(), "recovery pass started");
        let mut report = PassReport::default();
        for name in names {
            let name = name.as_ref();
            match self.recover(name) {
                Ok(outcome) => report.record(name, outcome),
                Err(e) => {
                    error!(name, error = %e, "recovery failed");
                    report.fail(name, e);
                }
            }
        }

        if report.is_success() {
            info!(recovered = report.outcomes.len(), "recovery pass finished");
        } else {
            for failure in &report.failures {
                error!(name = %failure.name, error = %failure.error, "left unrecovered");
            }
            error!(
                recovered = report.outcomes.len(),
                failed = report.failures.len(),
                "recovery pass finished with failures"
            );
        }
        report
    }

    /// Recover one name. On success its `conf` is valid.
    pub fn recover(&self, name: &str) -> RecoveryResult<Outcome> {
        let managed = self.lookup(name)?;
        let snapshots = self.manager_for(managed);

        if !self.land_factory_default(managed, &snapshots)? {
            debug!(name, "no factory default on read-only media; skipped");
            return Ok(Outcome::Skipped);
        }

        let outcome = self.settle(&snapshots)?;
        self.sweep(&snapshots)?;
        self.promote_base(&snapshots)?;

        match &outcome {
            Outcome::Intact => debug!(name, "conf intact"),
            _ => info!(name, %outcome, "recovered"),
        }
        Ok(outcome)
    }

    /// Make sure a local `orig` exists and, when syncing, that it matches the
    /// read-only copy. Returns `false` if the name is to be skipped.
    fn land_factory_default(&self, managed: &ManagedConfig, snapshots: &SnapshotManager) -> RecoveryResult<bool> {
        let name = snapshots.name();
        if !snapshots.reference_exists() {
            if managed.optional {
                return Ok(false);
            }
            if !snapshots.exists(SnapshotKind::Orig) {
                return Err(RecoveryError::MissingOrig {
                    name: name.to_string(),
                    reference: snapshots.paths().reference.clone(),
                });
            }
            warn!(name, "factory default missing on read-only media; using local orig");
            return Ok(true);
        }

        if !snapshots.exists(SnapshotKind::Orig) {
            snapshots.fetch_reference()?;
        } else if self.config.sync_orig_from_readonly && !snapshots.orig_matches_reference()? {
            info!(name, "new factory default on read-only media");
            snapshots.fetch_reference()?;
        }
        Ok(true)
    }

    fn settle(&self, snapshots: &SnapshotManager) -> RecoveryResult<Outcome> {
        let name = snapshots.name();
        let upgraded = !snapshots.is_valid(SnapshotKind::Orig);

        if upgraded && snapshots.patch_exists() && snapshots.is_valid(SnapshotKind::Back) {
            warn!(name, "previous merge was interrupted; redoing it from the backup");
            snapshots.restore()?;
            let merge = self.engine.merge(snapshots)?;
            return Ok(Outcome::Restored { merge: Some(merge) });
        }

        if snapshots.is_valid(SnapshotKind::Conf) {
            if !upgraded {
                return Ok(Outcome::Intact);
            }
            // A valid conf wins over whatever an earlier writer left behind.
            self.sweep(snapshots)?;
            return Ok(Outcome::Merged(self.engine.merge(snapshots)?));
        }

        if snapshots.is_valid(SnapshotKind::Back) {
            info!(name, "conf is not valid; restoring from backup");
            snapshots.restore()?;
            let merge = if upgraded {
                Some(self.engine.merge(snapshots)?)
            } else {
                None
            };
            return Ok(Outcome::Restored { merge });
        }

        self.initialize(snapshots)?;
        Ok(Outcome::Initialized)
    }

    /// Rebuild `base` and `conf` from `orig`, then seal `orig`.
    fn initialize(&self, snapshots: &SnapshotManager) -> RecoveryResult<()> {
        if !snapshots.exists(SnapshotKind::Orig) {
            snapshots.fetch_reference()?;
        }
        info!(name = %snapshots.name(), "no valid conf or backup; initializing from factory default");
        snapshots.copy_and_seal(SnapshotKind::Orig, SnapshotKind::Base)?;
        snapshots.copy_and_seal(SnapshotKind::Orig, SnapshotKind::Conf)?;
        snapshots.seal(SnapshotKind::Orig)?;
        Ok(())
    }

    /// Drop `back` and `name.patch`. Only called with a valid `conf`.
    fn sweep(&self, snapshots: &SnapshotManager) -> RecoveryResult<()> {
        if snapshots.discard(SnapshotKind::Back)? {
            debug!(name = %snapshots.name(), "removed stale backup");
        }
        if snapshots.discard_patch()? {
            debug!(name = %snapshots.name(), "removed stale patch");
        }
        Ok(())
    }

    /// Finish a promotion of `orig` to `base` that an earlier pass did not.
    fn promote_base(&self, snapshots: &SnapshotManager) -> RecoveryResult<()> {
        if !snapshots.is_valid(SnapshotKind::Orig) {
            return Ok(());
        }
        let stale = !snapshots.is_valid(SnapshotKind::Base)
            || snapshots.read(SnapshotKind::Base)? != snapshots.read(SnapshotKind::Orig)?;
        if stale {
            info!(name = %snapshots.name(), "promoting factory default to base");
            snapshots.copy_and_seal(SnapshotKind::Orig, SnapshotKind::Base)?;
        }
        Ok(())
    }

    // ---- Inspection ----

    /// Report the on-disk state of a name without changing anything.
    pub fn inspect(&self, name: &str) -> RecoveryResult<NameStatus> {
        let managed = self.lookup(name)?;
        let snapshots = self.manager_for(managed);

        let statuses: Vec<SnapshotStatus> = SnapshotKind::ALL
            .iter()
            .map(|&kind| SnapshotStatus {
                kind,
                verification: snapshots.verify(kind),
            })
            .collect();
        let reference_present = snapshots.reference_exists();
        let skipped = managed.optional && !reference_present;
        let reference_differs = reference_present
            && snapshots.exists(SnapshotKind::Orig)
            && self.config.sync_orig_from_readonly
            && !snapshots.orig_matches_reference()?;

        Ok(NameStatus {
            name: name.to_string(),
            optional: managed.optional,
            reference_present,
            snapshots: statuses,
            patch_present: snapshots.patch_exists(),
            upgrade_pending: !skipped
                && (reference_differs || !snapshots.is_valid(SnapshotKind::Orig)),
        })
    }

    // ---- Updates ----

    /// Start an in-place update of a name's `conf`.
    pub fn begin_update(&self, name: &str) -> RecoveryResult<UpdateTransaction> {
        UpdateTransaction::begin(self.snapshots(name)?)
    }

    /// Pick up an update begun by another process.
    pub fn resume_update(&self, name: &str) -> RecoveryResult<UpdateTransaction> {
        UpdateTransaction::resume(self.snapshots(name)?)
    }

    /// Replace `conf` with `edit(conf)` inside a transaction.
    pub fn update_with<F>(&self, name: &str, edit: F) -> RecoveryResult<()>
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        let txn = self.begin_update(name)?;
        let current = txn.current()?;
        txn.write(&edit(&current))?;
        txn.commit()
    }

    // ---- Internals ----

    fn lookup(&self, name: &str) -> RecoveryResult<&ManagedConfig> {
        self.config
            .managed(name)
            .ok_or_else(|| RecoveryError::UnknownName(name.to_string()))
    }

    fn manager_for(&self, managed: &ManagedConfig) -> SnapshotManager {
        let snapshots = SnapshotManager::new(self.config.paths_for(managed), self.config.ledger())
            .with_sync(self.config.sync);
        match &self.faults {
            Some(faults) => snapshots.with_faults(Arc::clone(faults)),
            None => snapshots,
        }
    }
}
