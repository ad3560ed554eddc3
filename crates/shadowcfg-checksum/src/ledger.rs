use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::algorithm::ChecksumAlgorithm;
use crate::error::{ChecksumError, ChecksumResult};
use crate::sidecar::Sidecar;

/// Sidecar suffix used when none is configured.
pub const DEFAULT_SUFFIX: &str = ".md5";

/// Detailed result of checking one file against its sidecar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Verification {
    /// File and sidecar agree.
    Valid,
    /// The file itself does not exist.
    MissingFile,
    /// The file exists but has never been sealed (or the seal was removed).
    MissingSidecar,
    /// The sidecar exists but is not a single well-formed record.
    Malformed { reason: String },
    /// The sidecar was taken from a different file.
    PathMismatch { recorded: PathBuf },
    /// The content changed since it was sealed.
    DigestMismatch { expected: String, actual: String },
    /// Something prevented the check from completing (permissions, I/O).
    Unreadable { reason: String },
}

impl Verification {
    /// Returns `true` only for [`Verification::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Seals files with checksum sidecars and checks them later.
///
/// The sidecar for `path` lives at `path` with the suffix appended
/// (`hostapd.conf` -> `hostapd.conf.md5`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    algorithm: ChecksumAlgorithm,
    suffix: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ChecksumAlgorithm::default(), DEFAULT_SUFFIX)
    }
}

impl Ledger {
    /// Create a ledger with an explicit algorithm and sidecar suffix.
    pub fn new(algorithm: ChecksumAlgorithm, suffix: impl Into<String>) -> Self {
        Self {
            algorithm,
            suffix: suffix.into(),
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Location of the sidecar belonging to `path`.
    pub fn sidecar_path(&self, path: &Path) -> PathBuf {
        let mut raw: OsString = path.as_os_str().to_owned();
        raw.push(&self.suffix);
        PathBuf::from(raw)
    }

    /// Compute the record for `path` without writing anything.
    ///
    /// The recorded path is the symlink-free absolute path of the file.
    pub fn compute(&self, path: &Path) -> ChecksumResult<Sidecar> {
        let io_err = |source: io::Error| ChecksumError::Io {
            path: path.to_path_buf(),
            source,
        };
        let resolved = fs::canonicalize(path).map_err(io_err)?;
        let digest = self.algorithm.digest_file(&resolved).map_err(io_err)?;
        Ok(Sidecar::new(digest, resolved))
    }

    /// Compute the record for `path` and write it to the sidecar, replacing
    /// any previous one.
    ///
    /// The sidecar and its directory entry are synced before this returns.
    pub fn seal(&self, path: &Path) -> ChecksumResult<Sidecar> {
        let sidecar = self.compute(path)?;
        let target = self.sidecar_path(path);
        let text = sidecar.render()?;
        write_synced(&target, text.as_bytes()).map_err(|source| ChecksumError::Io {
            path: target.clone(),
            source,
        })?;
        debug!(path = %path.display(), digest = %sidecar.digest, "sealed");
        Ok(sidecar)
    }

    /// Check `path` against its sidecar.
    pub fn verify(&self, path: &Path) -> Verification {
        let resolved = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Verification::MissingFile,
            Err(e) => return Verification::Unreadable { reason: e.to_string() },
        };

        let text = match fs::read_to_string(self.sidecar_path(path)) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Verification::MissingSidecar,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Verification::Malformed { reason: "sidecar is not text".into() }
            }
            Err(e) => return Verification::Unreadable { reason: e.to_string() },
        };

        let sidecar = match Sidecar::parse(&text) {
            Ok(s) => s,
            Err(e) => return Verification::Malformed { reason: e.to_string() },
        };
        if !self.algorithm.is_well_formed(&sidecar.digest) {
            return Verification::Malformed {
                reason: format!("digest is not a {} digest", self.algorithm),
            };
        }

        if !sidecar.names(&resolved) {
            match fs::canonicalize(&sidecar.path) {
                Ok(recorded) if recorded == resolved => {}
                _ => {
                    return Verification::PathMismatch {
                        recorded: sidecar.path,
                    }
                }
            }
        }

        let actual = match self.algorithm.digest_file(&resolved) {
            Ok(d) => d,
            Err(e) => return Verification::Unreadable { reason: e.to_string() },
        };
        if actual != sidecar.digest {
            return Verification::DigestMismatch {
                expected: sidecar.digest,
                actual,
            };
        }
        Verification::Valid
    }

    /// `true` iff `path` and its sidecar exist and agree.
    pub fn is_valid(&self, path: &Path) -> bool {
        self.verify(path).is_valid()
    }

    /// `true` if the sidecar of `path` is missing or no longer matches.
    ///
    /// Applied to a factory default this answers "has it changed since it
    /// was last processed".
    pub fn is_stale_or_absent(&self, path: &Path) -> bool {
        !self.is_valid(path)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    sync_parent(path)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
