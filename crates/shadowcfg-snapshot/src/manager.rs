use std::fs;
use std::path::Path;
use std::sync::Arc;

use shadowcfg_checksum::{Ledger, Verification};
use tracing::debug;

use crate::error::{SnapshotError, SnapshotResult};
use crate::fault::{Fault, FaultInjector, FsOp, FsOpKind};
use crate::fsio::{self, SyncMode};
use crate::kind::SnapshotKind;
use crate::paths::SnapshotPaths;

/// Reads, writes and seals the snapshots of one managed configuration.
///
/// The manager holds no state besides its paths and policies, so it is cheap
/// to build one per name and per pass.
#[derive(Clone, Debug)]
pub struct SnapshotManager {
    paths: SnapshotPaths,
    ledger: Ledger,
    sync: SyncMode,
    faults: Option<Arc<dyn FaultInjector>>,
}

impl SnapshotManager {
    pub fn new(paths: SnapshotPaths, ledger: Ledger) -> Self {
        Self {
            paths,
            ledger,
            sync: SyncMode::default(),
            faults: None,
        }
    }

    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    /// Route every file operation through `faults` first.
    pub fn with_faults(mut self, faults: Arc<dyn FaultInjector>) -> Self {
        self.faults = Some(faults);
        self
    }

    pub fn name(&self) -> &str {
        &self.paths.name
    }

    pub fn paths(&self) -> &SnapshotPaths {
        &self.paths
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn path(&self, kind: SnapshotKind) -> &Path {
        self.paths.get(kind)
    }

    // ---------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------

    pub fn exists(&self, kind: SnapshotKind) -> bool {
        self.path(kind).exists()
    }

    pub fn verify(&self, kind: SnapshotKind) -> Verification {
        self.ledger.verify(self.path(kind))
    }

    pub fn is_valid(&self, kind: SnapshotKind) -> bool {
        self.ledger.is_valid(self.path(kind))
    }

    /// `true` if the snapshot file or its sidecar is still on disk.
    pub fn has_remnants(&self, kind: SnapshotKind) -> bool {
        let path = self.path(kind);
        present(path) || present(&self.ledger.sidecar_path(path))
    }

    pub fn read(&self, kind: SnapshotKind) -> SnapshotResult<Vec<u8>> {
        let path = self.path(kind);
        fs::read(path).map_err(SnapshotError::io("read", path))
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Overwrite a snapshot's content without sealing it.
    ///
    /// Until [`seal`](Self::seal) runs the snapshot no longer matches its
    /// sidecar (unless the content happens to be unchanged).
    pub fn write(&self, kind: SnapshotKind, bytes: &[u8]) -> SnapshotResult<()> {
        self.write_path(self.path(kind), bytes)
    }

    /// Record the current content of a snapshot in its sidecar.
    pub fn seal(&self, kind: SnapshotKind) -> SnapshotResult<()> {
        let path = self.path(kind);
        let sidecar = self.ledger.compute(path)?;
        let text = sidecar.render()?;
        let target = self.ledger.sidecar_path(path);

        match self.announce(FsOpKind::Seal, &target) {
            Fault::Proceed => {
                fsio::write(&target, text.as_bytes(), self.sync)
                    .map_err(SnapshotError::io("seal", &target))?;
            }
            fault => return self.interrupt(FsOpKind::Seal, &target, text.as_bytes(), fault),
        }
        debug!(name = %self.name(), snapshot = %kind, digest = %sidecar.digest, "sealed");
        Ok(())
    }

    pub fn write_and_seal(&self, kind: SnapshotKind, bytes: &[u8]) -> SnapshotResult<()> {
        self.write(kind, bytes)?;
        self.seal(kind)
    }

    /// Copy `src` over `dst`, then seal `dst`.
    ///
    /// On success `dst` is valid. If interrupted after the copy but before
    /// the seal, `dst` no longer matches its old sidecar and reads as invalid.
    pub fn copy_and_seal(&self, src: SnapshotKind, dst: SnapshotKind) -> SnapshotResult<()> {
        let bytes = self.read(src)?;
        self.write_and_seal(dst, &bytes)?;
        debug!(name = %self.name(), from = %src, to = %dst, bytes = bytes.len(), "copied and sealed");
        Ok(())
    }

    /// `conf` -> `back`, sealed. Taken before any in-place change of `conf`.
    pub fn backup(&self) -> SnapshotResult<()> {
        self.copy_and_seal(SnapshotKind::Conf, SnapshotKind::Back)
    }

    /// `back` -> `conf`, sealed.
    pub fn restore(&self) -> SnapshotResult<()> {
        self.copy_and_seal(SnapshotKind::Back, SnapshotKind::Conf)
    }

    /// Remove a snapshot and its sidecar. The sidecar goes first.
    ///
    /// Returns `true` if anything was removed.
    pub fn discard(&self, kind: SnapshotKind) -> SnapshotResult<bool> {
        let path = self.path(kind);
        let sidecar = self.remove_path(&self.ledger.sidecar_path(path))?;
        let file = self.remove_path(path)?;
        if sidecar || file {
            debug!(name = %self.name(), snapshot = %kind, "discarded");
        }
        Ok(sidecar || file)
    }

    // ---------------------------------------------------------------
    // Transient patch
    // ---------------------------------------------------------------

    pub fn patch_exists(&self) -> bool {
        present(&self.paths.patch)
    }

    pub fn write_patch(&self, bytes: &[u8]) -> SnapshotResult<()> {
        self.write_path(&self.paths.patch, bytes)
    }

    pub fn discard_patch(&self) -> SnapshotResult<bool> {
        self.remove_path(&self.paths.patch)
    }

    // ---------------------------------------------------------------
    // Read-only reference
    // ---------------------------------------------------------------

    pub fn reference_exists(&self) -> bool {
        self.paths.reference.is_file()
    }

    /// `true` if the local `orig` exists and is byte-identical to the
    /// read-only reference.
    pub fn orig_matches_reference(&self) -> SnapshotResult<bool> {
        if !self.exists(SnapshotKind::Orig) {
            return Ok(false);
        }
        let reference = &self.paths.reference;
        let reference = fs::read(reference).map_err(SnapshotError::io("read", reference))?;
        Ok(self.read(SnapshotKind::Orig)? == reference)
    }

    /// Copy the read-only reference into the local `orig` slot, unsealed.
    pub fn fetch_reference(&self) -> SnapshotResult<()> {
        let reference = &self.paths.reference;
        if !self.reference_exists() {
            return Err(SnapshotError::MissingReference(reference.clone()));
        }
        let bytes = fs::read(reference).map_err(SnapshotError::io("read", reference))?;
        self.write(SnapshotKind::Orig, &bytes)?;
        debug!(name = %self.name(), from = %reference.display(), "fetched factory default");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Primitives
    // ---------------------------------------------------------------

    fn announce(&self, kind: FsOpKind, path: &Path) -> Fault {
        match &self.faults {
            Some(faults) => faults.before(&FsOp {
                kind,
                path: path.to_path_buf(),
            }),
            None => Fault::Proceed,
        }
    }

    fn interrupt(&self, op: FsOpKind, path: &Path, bytes: &[u8], fault: Fault) -> SnapshotResult<()> {
        if fault == Fault::TornWrite && op != FsOpKind::Remove {
            // Power went away mid-write; whatever landed stays. The result of
            // this partial write is irrelevant to the caller.
            let _ = fsio::write(path, &bytes[..bytes.len() / 2], self.sync);
        }
        Err(SnapshotError::Interrupted {
            op,
            path: path.to_path_buf(),
        })
    }

    fn write_path(&self, path: &Path, bytes: &[u8]) -> SnapshotResult<()> {
        match self.announce(FsOpKind::Write, path) {
            Fault::Proceed => fsio::write(path, bytes, self.sync).map_err(SnapshotError::io("write", path)),
            fault => self.interrupt(FsOpKind::Write, path, bytes, fault),
        }
    }

    fn remove_path(&self, path: &Path) -> SnapshotResult<bool> {
        if !present(path) {
            return Ok(false);
        }
        match self.announce(FsOpKind::Remove, path) {
            Fault::Proceed => fsio::remove(path, self.sync).map_err(SnapshotError::io("remove", path)),
            fault => self.interrupt(FsOpKind::Remove, path, &[], fault).map(|()| false),
        }
    }
}

/// Existence check that also sees dangling symlinks.
fn present(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
