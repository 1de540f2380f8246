//! Run-wide download counters.
//!
//! The counters are shared by every download task of a run and updated with
//! atomics. The total is fixed at construction, after the plan enumerated
//! every task, and a pending countdown seeded with that total detects
//! completion: the resolution that drains it is the only one reporting
//! [`Progress::finished`].

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

/// How a task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// One of the attempts succeeded.
    Succeeded,
    /// The retry budget was exhausted.
    Failed,
}

/// Snapshot taken right after a task resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub success: usize,
    pub failure: usize,
    pub total: usize,
    /// True for exactly one resolution per run: the last one.
    pub finished: bool,
}

impl Progress {
    /// Tasks resolved so far, successful or not.
    pub fn resolved(&self) -> usize {
        self.success + self.failure
    }
}

/// Final counts of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub failure: usize,
    pub total: usize,
}

impl RunSummary {
    /// True when every task succeeded.
    pub fn is_clean(&self) -> bool {
        self.failure == 0 && self.success == self.total
    }
}

/// Shared success/failure/total counters of one run.
#[derive(Debug)]
pub struct RunCounters {
    total: usize,
    success: AtomicUsize,
    failure: AtomicUsize,
    pending: AtomicUsize,
}

impl RunCounters {
    /// Counters for a run of exactly `total` tasks.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            success: AtomicUsize::new(0),
            failure: AtomicUsize::new(0),
            pending: AtomicUsize::new(total),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn success(&self) -> usize {
        self.success.load(Ordering::Acquire)
    }

    pub fn failure(&self) -> usize {
        self.failure.load(Ordering::Acquire)
    }

    /// Tasks not yet resolved.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// True once every task resolved. Trivially true for an empty run.
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Record the resolution of one task.
    pub fn record(&self, resolution: Resolution) -> Progress {
        match resolution {
            Resolution::Succeeded => self.success.fetch_add(1, Ordering::AcqRel),
            Resolution::Failed => self.failure.fetch_add(1, Ordering::AcqRel),
        };

        // Every decrement is a read-modify-write, so the one that reaches
        // zero observes all counter updates made before earlier decrements.
        let previous = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| p.checked_sub(1));
        if previous.is_err() {
            warn!(total = self.total, "Task resolved after the run completed");
        }

        Progress {
            success: self.success(),
            failure: self.failure(),
            total: self.total,
            finished: previous == Ok(1),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            success: self.success(),
            failure: self.failure(),
            total: self.total,
        }
    }
}
