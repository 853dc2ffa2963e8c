//! Progress reporting, cooperative cancellation, and structural warnings.
//!
//! The engine is synchronous; the host supplies a [`ProgressSink`] to move
//! status updates wherever it wants them (a worker channel, a log, nothing).
//! Cancellation is cooperative: passes poll the [`CancelToken`] between
//! outer-loop iterations and bail out with a cancellation error.

use std::sync::atomic::{AtomicBool, Ordering};

/// Receives milestone updates during the build.
///
/// `value`/`total` describe coarse progress within the named stage; stages
/// report `(0, 1)` then `(1, 1)` when they have no finer granularity.
pub trait ProgressSink {
    fn update(&self, status: &str, value: u64, total: u64);
}

/// Sink that discards all updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _status: &str, _value: u64, _total: u64) {}
}

/// Collects status lines in memory, for tests.
#[derive(Default)]
pub struct VecProgress {
    updates: std::sync::Mutex<Vec<String>>,
}

impl VecProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns all recorded status lines.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut self.updates.lock().expect("progress mutex poisoned"))
    }
}

impl ProgressSink for VecProgress {
    fn update(&self, status: &str, value: u64, total: u64) {
        self.updates
            .lock()
            .expect("progress mutex poisoned")
            .push(format!("{status} {value}/{total}"));
    }
}

/// Cooperative cancellation flag shared with the host.
///
/// The host may set it from any thread; passes check it at milestone
/// boundaries and between outer-loop iterations.
#[derive(Debug, Default)]
pub struct CancelToken {
    flag: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation was requested.
    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Cap on retained structural-warning lines.
const MAX_REPORT_ENTRIES: usize = 100;

/// Bounded collection of non-fatal structural warnings.
///
/// Unreachable nodes and weak-only-retained nodes are reported here; the
/// build still produces usable output. Entries past the cap are counted but
/// not stored.
#[derive(Debug, Default)]
pub struct StructuralReport {
    entries: Vec<String>,
    dropped: usize,
}

impl StructuralReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a warning line, dropping it (but counting) past the cap.
    pub fn add(&mut self, line: String) {
        if self.entries.len() < MAX_REPORT_ENTRIES {
            self.entries.push(line);
        } else {
            self.dropped += 1;
        }
    }

    /// Recorded warning lines, in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of warnings dropped after the cap was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Returns true when nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dropped == 0
    }
}
