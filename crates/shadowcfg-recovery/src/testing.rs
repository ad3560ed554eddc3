//! Temporary store layout shared by the driver and transaction tests.

use std::fs;
use std::path::PathBuf;

use shadowcfg_snapshot::{SnapshotKind, SnapshotManager};
use tempfile::TempDir;

use crate::config::{ManagedConfig, StoreConfig};
use crate::driver::RecoveryDriver;

pub const FACTORY: &str = "ssid=factory\nchannel=1\nhw_mode=g\nbeacon_int=100\nwpa=2\nlog=0\n";
pub const CUSTOM: &str = "ssid=home\nchannel=1\nhw_mode=g\nbeacon_int=100\nwpa=2\nlog=0\n";
/// Compatible with CUSTOM.
pub const UPGRADE: &str = "ssid=factory\nchannel=1\nhw_mode=g\nbeacon_int=100\nwpa=2\nlog=1\n";
pub const MERGED: &str = "ssid=home\nchannel=1\nhw_mode=g\nbeacon_int=100\nwpa=2\nlog=1\n";
/// Touches the line CUSTOM edits.
pub const CONFLICT: &str = "ssid=vendor\nchannel=1\nhw_mode=g\nbeacon_int=100\nwpa=2\nlog=0\n";

pub(crate) struct Rig {
    _dir: TempDir,
    pub config: StoreConfig,
}

impl Rig {
    pub fn with_names(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("etc");
        let readonly_dir = dir.path().join("rom");
        fs::create_dir_all(&config_dir).unwrap();
        fs::create_dir_all(&readonly_dir).unwrap();
        let mut config = StoreConfig::new(config_dir, readonly_dir);
        for name in names {
            config = config.with_managed(ManagedConfig::new(*name));
        }
        Self { _dir: dir, config }
    }

    /// `hostapd` booted once on FACTORY and customised to CUSTOM.
    pub fn customised() -> Self {
        let rig = Self::with_names(&["hostapd"]);
        rig.ship("hostapd", FACTORY);
        rig.driver().recover("hostapd").unwrap();
        rig.driver()
            .update_with("hostapd", |_| CUSTOM.as_bytes().to_vec())
            .unwrap();
        rig
    }

    pub fn driver(&self) -> RecoveryDriver {
        RecoveryDriver::new(self.config.clone()).unwrap()
    }

    pub fn snapshots(&self, name: &str) -> SnapshotManager {
        self.driver().snapshots(name).unwrap()
    }

    pub fn path(&self, name: &str, kind: SnapshotKind) -> PathBuf {
        self.snapshots(name).path(kind).to_path_buf()
    }

    /// Put a factory default on the read-only side (a new image).
    pub fn ship(&self, name: &str, content: &str) {
        fs::write(self.config.readonly_dir.join(format!("{name}.orig")), content).unwrap();
    }

    pub fn read(&self, name: &str, kind: SnapshotKind) -> String {
        String::from_utf8(self.snapshots(name).read(kind).unwrap()).unwrap()
    }

    /// Byte content of every file in the writable directory.
    pub fn disk(&self) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<_> = fs::read_dir(&self.config.config_dir)
            .unwrap()
            .map(|entry| {
                let path = entry.unwrap().path();
                let bytes = fs::read(&path).unwrap();
                (path, bytes)
            })
            .collect();
        files.sort();
        files
    }

    /// The steady state: `conf`, `orig` and `base` valid, no leftovers.
    pub fn assert_settled(&self, name: &str, conf: &str, orig: &str) {
        let s = self.snapshots(name);
        for kind in [SnapshotKind::Conf, SnapshotKind::Orig, SnapshotKind::Base] {
            assert!(s.is_valid(kind), "{name}.{kind}: {:?}", s.verify(kind));
        }
        assert_eq!(self.read(name, SnapshotKind::Conf), conf, "{name}.conf");
        assert_eq!(self.read(name, SnapshotKind::Orig), orig, "{name}.orig");
        assert_eq!(self.read(name, SnapshotKind::Base), orig, "{name}.base");
        assert!(!s.has_remnants(SnapshotKind::Back), "{name}.back left behind");
        assert!(!s.patch_exists(), "{name}.patch left behind");
    }
}
