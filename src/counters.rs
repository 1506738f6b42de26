//! Process-wide query totals.
//!
//! Successes and errors are separate atomics and the executed total is their
//! sum, so a snapshot can never show more errors than executed queries and
//! every total only ever grows.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared totals written by every worker and read by the reporter.
#[derive(Debug, Default)]
pub struct Counters {
    succeeded: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one query that completed successfully.
    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one query that failed. It still counts as executed.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current totals.
    pub fn snapshot(&self) -> Snapshot {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        Snapshot {
            executed: succeeded + errors,
            succeeded,
            errors,
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub executed: u64,
    pub succeeded: u64,
    pub errors: u64,
}
