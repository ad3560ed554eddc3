//! Fault injection for crash simulation.
//!
//! The [`SnapshotManager`](crate::SnapshotManager) announces every primitive
//! file operation to its injector before running it. The injector decides
//! whether the operation proceeds, is skipped entirely, or is torn halfway
//! (only the first half of the bytes reach the disk). Skipped and torn
//! operations surface as [`SnapshotError::Interrupted`](crate::SnapshotError).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;

/// The kind of a primitive file operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FsOpKind {
    /// Writing snapshot content (or a transient file).
    Write,
    /// Writing a checksum sidecar.
    Seal,
    /// Unlinking a file or sidecar.
    Remove,
}

impl std::fmt::Display for FsOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Seal => write!(f, "seal"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// One announced file operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsOp {
    pub kind: FsOpKind,
    pub path: PathBuf,
}

/// What an injector wants done with an announced operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Run the operation normally.
    Proceed,
    /// Do nothing and report an interruption.
    Abort,
    /// Write only the first half of the bytes, then report an interruption.
    /// Treated as [`Fault::Abort`] for removals.
    TornWrite,
}

/// Decides the fate of each file operation.
pub trait FaultInjector: Send + Sync + std::fmt::Debug {
    fn before(&self, op: &FsOp) -> Fault;
}

/// Records every announced operation and never interferes.
///
/// Running a scenario once under an `OpRecorder` yields the list of step
/// boundaries a [`PowerCut`] can then target one by one.
#[derive(Debug, Default)]
pub struct OpRecorder {
    ops: Mutex<Vec<FsOp>>,
}

impl OpRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations seen so far, in order.
    pub fn ops(&self) -> Vec<FsOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ops.lock().map(|ops| ops.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FaultInjector for OpRecorder {
    fn before(&self, op: &FsOp) -> Fault {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op.clone());
        }
        Fault::Proceed
    }
}

/// Simulates power loss at the `at`-th operation (0-based).
///
/// Operations before the cut proceed. The cut operation is aborted or torn,
/// and every operation after it is aborted: once power is gone nothing else
/// reaches the disk.
#[derive(Debug)]
pub struct PowerCut {
    at: usize,
    torn: bool,
    seen: AtomicUsize,
    cut: AtomicBool,
}

impl PowerCut {
    /// Cut before the operation runs.
    pub fn abort_at(at: usize) -> Self {
        Self::new(at, false)
    }

    /// Cut halfway through the operation.
    pub fn tear_at(at: usize) -> Self {
        Self::new(at, true)
    }

    fn new(at: usize, torn: bool) -> Self {
        Self {
            at,
            torn,
            seen: AtomicUsize::new(0),
            cut: AtomicBool::new(false),
        }
    }

    /// Whether the cut has happened.
    pub fn fired(&self) -> bool {
        self.cut.load(Ordering::SeqCst)
    }
}

impl FaultInjector for PowerCut {
    fn before(&self, _op: &FsOp) -> Fault {
        if self.fired() {
            return Fault::Abort;
        }
        let index = self.seen.fetch_add(1, Ordering::SeqCst);
        if index < self.at {
            return Fault::Proceed;
        }
        self.cut.store(true, Ordering::SeqCst);
        if self.torn {
            Fault::TornWrite
        } else {
            Fault::Abort
        }
    }
}
