use serde::{Deserialize, Serialize};

/// The four lifecycle views of one managed configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Factory default for the running image.
    Orig,
    /// The factory default the live config was last derived from.
    Base,
    /// The live configuration.
    Conf,
    /// Backup of `conf` taken right before an in-place change.
    Back,
}

impl SnapshotKind {
    /// All kinds, in lifecycle order.
    pub const ALL: [SnapshotKind; 4] = [Self::Orig, Self::Base, Self::Conf, Self::Back];

    /// File extension used for this snapshot (`name.<ext>`).
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Orig => "orig",
            Self::Base => "base",
            Self::Conf => "conf",
            Self::Back => "back",
        }
    }
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
