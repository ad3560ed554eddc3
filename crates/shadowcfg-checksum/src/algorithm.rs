use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Read buffer used when streaming a file through a hasher.
const CHUNK: usize = 8 * 1024;

/// Digest algorithm used for sidecar records.
///
/// The hex output of each variant is byte-for-byte what the matching
/// coreutils-style tool prints, so shell collaborators can keep using
/// `md5sum -c` (or `b3sum -c`) against the same sidecars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, as printed by `md5sum`.
    #[default]
    Md5,
    /// BLAKE3, as printed by `b3sum`.
    Blake3,
}

impl ChecksumAlgorithm {
    /// Short lowercase name (matches the serialized form).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Blake3 => "blake3",
        }
    }

    /// Length of a hex digest produced by this algorithm.
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Blake3 => 64,
        }
    }

    /// Hex digest of an in-memory buffer.
    pub fn digest_bytes(&self, data: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(data)),
            Self::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }

    /// Hex digest of everything readable from `reader`, streamed in chunks.
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> io::Result<String> {
        let mut buf = [0u8; CHUNK];
        match self {
            Self::Md5 => {
                let mut hasher = Md5::new();
                loop {
                    let n = read_chunk(&mut reader, &mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hex::encode(hasher.finalize()))
            }
            Self::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = read_chunk(&mut reader, &mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hasher.finalize().to_hex().to_string())
            }
        }
    }

    /// Hex digest of a file's content.
    pub fn digest_file(&self, path: &Path) -> io::Result<String> {
        self.digest_reader(File::open(path)?)
    }

    /// Returns `true` if `digest` has the shape of a digest from this algorithm.
    pub fn is_well_formed(&self, digest: &str) -> bool {
        digest.len() == self.hex_len() && digest.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
