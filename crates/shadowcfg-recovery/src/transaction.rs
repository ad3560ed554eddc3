use shadowcfg_snapshot::{SnapshotKind, SnapshotManager};
use tracing::{debug, info};

use crate::error::{RecoveryError, RecoveryResult};

/// An in-place change of one `conf`, bracketed by a sealed backup.
///
/// `begin` copies `conf` to `back` and seals it, `write` rewrites `conf`
/// without sealing, `commit` seals `conf` and drops `back`. If the process
/// dies in between, the next recovery pass finds an invalid `conf` next to a
/// valid `back` and restores the pre-update content.
///
/// Dropping a transaction leaves it open on disk. Other processes can pick it
/// up again with [`resume`](Self::resume).
#[derive(Debug)]
#[must_use = "an update stays open until commit() or abort()"]
pub struct UpdateTransaction {
    snapshots: SnapshotManager,
}

impl UpdateTransaction {
    /// Back up `conf`. Refuses to start from an invalid `conf`, or while a
    /// merge that a failed pass left behind is still on disk.
    pub fn begin(snapshots: SnapshotManager) -> RecoveryResult<Self> {
        if !snapshots.is_valid(SnapshotKind::Conf) {
            return Err(RecoveryError::ConfNotValid {
                name: snapshots.name().to_string(),
            });
        }
        if snapshots.patch_exists() && !snapshots.is_valid(SnapshotKind::Orig) {
            return Err(RecoveryError::MergePending {
                name: snapshots.name().to_string(),
            });
        }
        snapshots.backup()?;
        debug!(name = %snapshots.name(), "update started");
        Ok(Self { snapshots })
    }

    /// Continue an update started elsewhere. Requires a valid `back`.
    pub fn resume(snapshots: SnapshotManager) -> RecoveryResult<Self> {
        if !snapshots.is_valid(SnapshotKind::Back) {
            return Err(RecoveryError::NoUpdateInProgress {
                name: snapshots.name().to_string(),
            });
        }
        Ok(Self { snapshots })
    }

    pub fn name(&self) -> &str {
        self.snapshots.name()
    }

    /// Current content of `conf`, including uncommitted writes.
    pub fn current(&self) -> RecoveryResult<Vec<u8>> {
        Ok(self.snapshots.read(SnapshotKind::Conf)?)
    }

    /// Content `conf` had when the update began.
    pub fn original(&self) -> RecoveryResult<Vec<u8>> {
        Ok(self.snapshots.read(SnapshotKind::Back)?)
    }

    pub fn write(&self, bytes: &[u8]) -> RecoveryResult<()> {
        self.snapshots.write(SnapshotKind::Conf, bytes)?;
        Ok(())
    }

    pub fn commit(self) -> RecoveryResult<()> {
        self.snapshots.seal(SnapshotKind::Conf)?;
        self.snapshots.discard(SnapshotKind::Back)?;
        info!(name = %self.name(), "update committed");
        Ok(())
    }

    /// Put the pre-update content back.
    pub fn abort(self) -> RecoveryResult<()> {
        self.snapshots.restore()?;
        self.snapshots.discard(SnapshotKind::Back)?;
        info!(name = %self.name(), "update aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Rig;
    use std::fs;

    fn rig() -> Rig {
        let rig = Rig::with_names(&["hostapd"]);
        rig.ship("hostapd", "ssid=factory\n");
        rig.driver().recover("hostapd").unwrap();
        rig
    }

    #[test]
    fn commit_seals_new_content() {
        let rig = rig();
        let txn = UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap();
        txn.write(b"ssid=home\n").unwrap();
        assert_eq!(txn.current().unwrap(), b"ssid=home\n");
        assert_eq!(txn.original().unwrap(), b"ssid=factory\n");
        txn.commit().unwrap();

        let s = rig.snapshots("hostapd");
        assert!(s.is_valid(SnapshotKind::Conf));
        assert!(!s.has_remnants(SnapshotKind::Back));
        assert_eq!(rig.read("hostapd", SnapshotKind::Conf), "ssid=home\n");
    }

    #[test]
    fn abort_restores_original() {
        let rig = rig();
        let txn = UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap();
        txn.write(b"ssid=oops\n").unwrap();
        txn.abort().unwrap();

        let s = rig.snapshots("hostapd");
        assert!(s.is_valid(SnapshotKind::Conf));
        assert!(!s.has_remnants(SnapshotKind::Back));
        assert_eq!(rig.read("hostapd", SnapshotKind::Conf), "ssid=factory\n");
    }

    #[test]
    fn begin_refuses_invalid_conf() {
        let rig = rig();
        fs::write(rig.path("hostapd", SnapshotKind::Conf), "torn").unwrap();
        let err = UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap_err();
        assert!(matches!(err, RecoveryError::ConfNotValid { .. }));
        assert!(!rig.snapshots("hostapd").has_remnants(SnapshotKind::Back));
    }

    #[test]
    fn begin_refuses_unfinished_merge() {
        let rig = rig();
        let s = rig.snapshots("hostapd");
        rig.ship("hostapd", "ssid=factory\nlog=1\n");
        s.fetch_reference().unwrap();
        s.write_patch(b"--- a/hostapd.base\n+++ b/hostapd.conf\n").unwrap();

        let err = UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap_err();
        assert!(matches!(err, RecoveryError::MergePending { .. }));
        assert!(!s.has_remnants(SnapshotKind::Back));

        rig.driver().recover("hostapd").unwrap();
        UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap().commit().unwrap();
    }

    #[test]
    fn begin_allows_pending_upgrade_without_patch() {
        let rig = rig();
        rig.ship("hostapd", "ssid=factory\nlog=1\n");
        rig.snapshots("hostapd").fetch_reference().unwrap();
        UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap().commit().unwrap();
    }

    #[test]
    fn resume_across_handles() {
        let rig = rig();
        let txn = UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap();
        drop(txn);
        fs::write(rig.path("hostapd", SnapshotKind::Conf), "ssid=script\n").unwrap();

        UpdateTransaction::resume(rig.snapshots("hostapd")).unwrap().commit().unwrap();
        assert_eq!(rig.read("hostapd", SnapshotKind::Conf), "ssid=script\n");
        assert!(rig.snapshots("hostapd").is_valid(SnapshotKind::Conf));
    }

    #[test]
    fn resume_without_backup_fails() {
        let rig = rig();
        let err = UpdateTransaction::resume(rig.snapshots("hostapd")).unwrap_err();
        assert!(matches!(err, RecoveryError::NoUpdateInProgress { .. }));
    }

    #[test]
    fn crash_mid_update_rolls_back_on_recovery() {
        let rig = rig();
        let txn = UpdateTransaction::begin(rig.snapshots("hostapd")).unwrap();
        txn.write(b"ssid=half").unwrap();
        drop(txn);

        let outcome = rig.driver().recover("hostapd").unwrap();
        assert_eq!(outcome, crate::Outcome::Restored { merge: None });
        rig.assert_settled("hostapd", "ssid=factory\n", "ssid=factory\n");
    }
}
