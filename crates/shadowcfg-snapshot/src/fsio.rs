use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Flush/sync strategy for snapshot writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` every written file, and its directory after creating or
    /// removing entries (safest; what flash-backed devices want).
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

impl SyncMode {
    fn durable(self) -> bool {
        matches!(self, Self::EveryWrite)
    }
}

/// Replace the content of `path` with `bytes`.
pub(crate) fn write(path: &Path, bytes: &[u8], sync: SyncMode) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    if sync.durable() {
        file.sync_all()?;
        sync_parent(path)?;
    }
    Ok(())
}

/// Unlink `path`. Returns `false` if it was already gone.
pub(crate) fn remove(path: &Path, sync: SyncMode) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            if sync.durable() {
                sync_parent(path)?;
            }
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

// Directory handles cannot be fsynced portably elsewhere.
#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
