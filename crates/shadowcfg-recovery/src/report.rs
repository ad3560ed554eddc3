use std::fmt;

use serde::Serialize;
use shadowcfg_checksum::Verification;
use shadowcfg_merge::MergeOutcome;
use shadowcfg_snapshot::SnapshotKind;

/// What recovery did for one name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// `conf` was valid and no upgrade was pending.
    Intact,
    /// `conf` was rebuilt from `back`, then merged if an upgrade was pending.
    Restored { merge: Option<MergeOutcome> },
    /// A new factory default was merged into a valid `conf`.
    Merged(MergeOutcome),
    /// No usable `conf` or `back`; everything was rebuilt from `orig`.
    Initialized,
    /// Optional name without a factory default on the read-only side.
    Skipped,
}

impl Outcome {
    /// The merge run during this pass, if any.
    pub fn merge(&self) -> Option<&MergeOutcome> {
        match self {
            Self::Merged(merge) | Self::Restored { merge: Some(merge) } => Some(merge),
            _ => None,
        }
    }

    /// `true` if local edits were thrown away.
    pub fn lost_local_edits(&self) -> bool {
        self.merge().is_some_and(|m| !m.kept_local_edits())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intact => write!(f, "intact"),
            Self::Restored { merge: None } => write!(f, "restored from backup"),
            Self::Restored { merge: Some(merge) } => {
                write!(f, "restored from backup, then {}", DisplayMerge(merge))
            }
            Self::Merged(merge) => write!(f, "{}", DisplayMerge(merge)),
            Self::Initialized => write!(f, "initialized from factory default"),
            Self::Skipped => write!(f, "skipped (no factory default)"),
        }
    }
}

struct DisplayMerge<'a>(&'a MergeOutcome);

impl fmt::Display for DisplayMerge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            MergeOutcome::Clean { hunks } => write!(f, "merged new default ({hunks} local hunks kept)"),
            MergeOutcome::Conflict { conflict } => {
                write!(f, "reset to new default, local edits dropped ({conflict})")
            }
            MergeOutcome::HardReset => write!(f, "reset to new default (no valid baseline)"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameFailure {
    pub name: String,
    pub error: String,
}

/// Result of one recovery pass over several names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub outcomes: Vec<NameReport>,
    pub failures: Vec<NameFailure>,
}

impl PassReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|r| r.name == name).map(|r| &r.outcome)
    }

    pub fn failure(&self, name: &str) -> Option<&NameFailure> {
        self.failures.iter().find(|f| f.name == name)
    }

    pub(crate) fn record(&mut self, name: &str, outcome: Outcome) {
        self.outcomes.push(NameReport {
            name: name.to_string(),
            outcome,
        });
    }

    pub(crate) fn fail(&mut self, name: &str, error: impl fmt::Display) {
        self.failures.push(NameFailure {
            name: name.to_string(),
            error: error.to_string(),
        });
    }
}

/// Verification of one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotStatus {
    pub kind: SnapshotKind,
    pub verification: Verification,
}

/// Read-only view of one name's on-disk state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameStatus {
    pub name: String,
    pub optional: bool,
    pub reference_present: bool,
    pub snapshots: Vec<SnapshotStatus>,
    pub patch_present: bool,
    /// `orig` is missing, unsealed or behind the read-only copy, so the next
    /// pass will merge.
    pub upgrade_pending: bool,
}

impl NameStatus {
    pub fn verification(&self, kind: SnapshotKind) -> Option<&Verification> {
        self.snapshots.iter().find(|s| s.kind == kind).map(|s| &s.verification)
    }

    fn is_valid(&self, kind: SnapshotKind) -> bool {
        self.verification(kind).is_some_and(Verification::is_valid)
    }

    /// `true` if the next recovery pass would change anything on disk.
    pub fn needs_recovery(&self) -> bool {
        if self.optional && !self.reference_present {
            return false;
        }
        !self.is_valid(SnapshotKind::Conf)
            || !self.is_valid(SnapshotKind::Base)
            || self.upgrade_pending
            || self.patch_present
            || !matches!(self.verification(SnapshotKind::Back), Some(Verification::MissingFile))
    }
}
