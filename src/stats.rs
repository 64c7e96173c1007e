//! Run counters.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared counters updated by lookup tasks and read for progress lines and
/// the final summary. Observable output only, nothing reads them back into
/// control flow.
#[derive(Debug, Default)]
pub struct RunStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    invalid: AtomicUsize,
    rate_limited: AtomicUsize,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub succeeded: usize,
    pub failed: usize,
    /// Subset of `failed`: entries rejected before any request.
    pub invalid: usize,
    /// HTTP 429 responses seen, counted per attempt.
    pub rate_limited: usize,
}

impl RunStats {
    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Invalid entries get a failed row, so they count as failures too.
    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Rows accounted for so far.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = RunStats::default();
        stats.record_success();
        stats.record_success();
        stats.record_failure();
        stats.record_rate_limited();

        let snap = stats.snapshot();
        assert_eq!(snap.succeeded, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.rate_limited, 1);
        assert_eq!(snap.completed(), 3);
    }

    #[test]
    fn invalid_counts_as_a_failure() {
        let stats = RunStats::default();
        stats.record_invalid();

        let snap = stats.snapshot();
        assert_eq!(snap.invalid, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.succeeded, 0);
        assert_eq!(snap.completed(), 1);
    }
}
