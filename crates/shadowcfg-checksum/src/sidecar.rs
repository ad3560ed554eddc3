use std::path::{Path, PathBuf};

use crate::error::{ChecksumError, ChecksumResult};

/// One sidecar record: a hex digest and the absolute path it was taken from.
///
/// On disk this is a single line in coreutils format:
///
/// ```text
/// 3b5d5c3712955042212316173ccf37be  /etc/shadowcfg/hostapd.conf
/// ```
///
/// Parsing also accepts the binary-mode marker (`<hex> *<path>`) that
/// `md5sum -b` emits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sidecar {
    /// Lowercase hex digest.
    pub digest: String,
    /// Resolved absolute path of the sealed file.
    pub path: PathBuf,
}

impl Sidecar {
    /// Build a record, lowercasing the digest.
    pub fn new(digest: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            digest: digest.into().to_ascii_lowercase(),
            path: path.into(),
        }
    }

    /// Parse the content of a sidecar file.
    ///
    /// Exactly one non-empty line is accepted.
    pub fn parse(text: &str) -> ChecksumResult<Self> {
        let mut lines = text.lines().filter(|l| !l.is_empty());
        let line = lines
            .next()
            .ok_or_else(|| ChecksumError::Malformed("empty sidecar".into()))?;
        if lines.next().is_some() {
            return Err(ChecksumError::Malformed("more than one record".into()));
        }
        if line.starts_with('\\') {
            return Err(ChecksumError::Malformed("escaped file names are not supported".into()));
        }

        let (digest, rest) = line
            .split_once(' ')
            .ok_or_else(|| ChecksumError::Malformed(format!("no separator in {line:?}")))?;
        let path = rest
            .strip_prefix(' ')
            .or_else(|| rest.strip_prefix('*'))
            .ok_or_else(|| ChecksumError::Malformed(format!("bad mode marker in {line:?}")))?;

        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChecksumError::Malformed(format!("digest {digest:?} is not hex")));
        }
        if path.is_empty() {
            return Err(ChecksumError::Malformed("missing path".into()));
        }

        Ok(Self::new(digest, path))
    }

    /// Render the record as it is written to disk, newline included.
    pub fn render(&self) -> ChecksumResult<String> {
        let path = self
            .path
            .to_str()
            .filter(|p| !p.contains('\n') && !p.contains('\\'))
            .ok_or_else(|| ChecksumError::UnsupportedPath(self.path.clone()))?;
        Ok(format!("{}  {}\n", self.digest, path))
    }

    /// Whether this record was taken from `path`.
    pub fn names(&self, path: &Path) -> bool {
        self.path == path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_mode() {
        let s = Sidecar::parse("d41d8cd98f00b204e9800998ecf8427e  /etc/a.conf\n").unwrap();
        assert_eq!(s.digest, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(s.path, PathBuf::from("/etc/a.conf"));
    }

    #[test]
    fn parse_binary_mode() {
        let s = Sidecar::parse("D41D8CD98F00B204E9800998ECF8427E */etc/a.conf").unwrap();
        assert_eq!(s.digest, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(s.path, PathBuf::from("/etc/a.conf"));
    }

    #[test]
    fn path_may_contain_spaces() {
        let s = Sidecar::parse("abcd  /etc/my conf/a b.conf\n").unwrap();
        assert_eq!(s.path, PathBuf::from("/etc/my conf/a b.conf"));
    }

    #[test]
    fn render_then_parse() {
        let s = Sidecar::new("ABCDEF", "/data/hostapd.conf");
        let text = s.render().unwrap();
        assert_eq!(text, "abcdef  /data/hostapd.conf\n");
        assert_eq!(Sidecar::parse(&text).unwrap(), s);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Sidecar::parse("").is_err());
        assert!(Sidecar::parse("\n\n").is_err());
        assert!(Sidecar::parse("abcd").is_err());
        assert!(Sidecar::parse("abcd /x").is_err());
        assert!(Sidecar::parse("xyz!  /x").is_err());
        assert!(Sidecar::parse("abcd  ").is_err());
        assert!(Sidecar::parse("abcd  /x\nabcd  /y\n").is_err());
        assert!(Sidecar::parse("\\abcd  /x\\ny").is_err());
    }

    #[test]
    fn torn_sidecar_is_malformed() {
        // First half of a record, as left by power loss mid-write.
        let full = "d41d8cd98f00b204e9800998ecf8427e  /etc/a.conf\n";
        assert!(Sidecar::parse(&full[..20]).is_err());
    }

    #[test]
    fn render_refuses_newlines_in_path() {
        let s = Sidecar::new("abcd", "/etc/bad\nname");
        assert!(matches!(s.render(), Err(ChecksumError::UnsupportedPath(_))));
    }
}
