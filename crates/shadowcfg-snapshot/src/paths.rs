use std::path::{Path, PathBuf};

use crate::kind::SnapshotKind;

/// Every path that belongs to one managed configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub name: String,
    pub orig: PathBuf,
    pub base: PathBuf,
    pub conf: PathBuf,
    pub back: PathBuf,
    /// Transient diff written during a merge.
    pub patch: PathBuf,
    /// Factory copy of `orig` on the read-only filesystem.
    pub reference: PathBuf,
}

impl SnapshotPaths {
    /// Standard layout: `<config_dir>/<name>.<ext>` plus
    /// `<readonly_dir>/<name>.orig` as the reference copy.
    pub fn new(name: &str, config_dir: &Path, readonly_dir: &Path) -> Self {
        let at = |ext: &str| config_dir.join(format!("{name}.{ext}"));
        Self {
            name: name.to_string(),
            orig: at(SnapshotKind::Orig.extension()),
            base: at(SnapshotKind::Base.extension()),
            conf: at(SnapshotKind::Conf.extension()),
            back: at(SnapshotKind::Back.extension()),
            patch: at("patch"),
            reference: readonly_dir.join(format!("{name}.{}", SnapshotKind::Orig.extension())),
        }
    }

    /// Path of a snapshot.
    pub fn get(&self, kind: SnapshotKind) -> &Path {
        match kind {
            SnapshotKind::Orig => &self.orig,
            SnapshotKind::Base => &self.base,
            SnapshotKind::Conf => &self.conf,
            SnapshotKind::Back => &self.back,
        }
    }
}
