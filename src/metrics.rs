//! Timing instrumentation for search operations
//!
//! The engine reports three duration signals through the [`Timer`] contract:
//! one per tree swept in a search, one per node evaluation, and one for the
//! final sort. Recorders may fail; the engine logs and discards those
//! failures rather than failing a search over metrics.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error a [`Timer`] implementation may return from a recording hook.
///
/// The engine never propagates these; they surface only through debug logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to record timing metric: {0}")]
pub struct RecordError(String);

impl RecordError {
    /// Create a record error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Recorder contract for the three timing signals of a search.
pub trait Timer: Send + Sync {
    /// Record the time spent sweeping the nodes of a single tree.
    fn record_tree_search(&self, duration: Duration) -> Result<(), RecordError>;

    /// Record the time spent evaluating one node's candidacy for a phrase.
    fn record_node_search_iteration(&self, duration: Duration) -> Result<(), RecordError>;

    /// Record the time spent sorting the final results of a search.
    fn record_sort_time(&self, duration: Duration) -> Result<(), RecordError>;
}

/// The default [`Timer`]: discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTimer;

impl Timer for NoOpTimer {
    fn record_tree_search(&self, _duration: Duration) -> Result<(), RecordError> {
        Ok(())
    }

    fn record_node_search_iteration(&self, _duration: Duration) -> Result<(), RecordError> {
        Ok(())
    }

    fn record_sort_time(&self, _duration: Duration) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Running totals for one signal.
#[derive(Debug, Clone, Copy, Default)]
struct SignalTotals {
    count: u64,
    total: Duration,
}

impl SignalTotals {
    fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
    }

    fn summary(&self) -> SignalSummary {
        let mean = if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / u32::try_from(self.count).unwrap_or(u32::MAX)
        };
        SignalSummary {
            count: self.count,
            total: self.total,
            mean,
        }
    }
}

/// Aggregated view of one timing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalSummary {
    /// Number of recordings.
    pub count: u64,
    /// Sum of all recorded durations.
    pub total: Duration,
    /// Mean recorded duration; zero when nothing was recorded.
    pub mean: Duration,
}

/// Aggregated view of every signal a [`CollectingTimer`] has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingSummary {
    /// Per-tree sweep timings.
    pub tree_search: SignalSummary,
    /// Per-node evaluation timings.
    pub node_search_iteration: SignalSummary,
    /// Result sort timings.
    pub sort: SignalSummary,
}

/// A [`Timer`] that aggregates counts and totals per signal.
///
/// Clones share the underlying store, so a handle given to
/// `DistanceTrees::set_timer` can be kept and read after searches complete.
/// Useful in tests and benchmark harnesses; recording never fails.
#[derive(Debug, Clone, Default)]
pub struct CollectingTimer {
    totals: Arc<Mutex<Totals>>,
}

#[derive(Debug, Default)]
struct Totals {
    tree_search: SignalTotals,
    node_search_iteration: SignalTotals,
    sort: SignalTotals,
}

impl CollectingTimer {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the totals recorded so far.
    #[must_use]
    pub fn summary(&self) -> TimingSummary {
        let totals = self.totals.lock();
        TimingSummary {
            tree_search: totals.tree_search.summary(),
            node_search_iteration: totals.node_search_iteration.summary(),
            sort: totals.sort.summary(),
        }
    }
}

impl Timer for CollectingTimer {
    fn record_tree_search(&self, duration: Duration) -> Result<(), RecordError> {
        self.totals.lock().tree_search.record(duration);
        Ok(())
    }

    fn record_node_search_iteration(&self, duration: Duration) -> Result<(), RecordError> {
        self.totals.lock().node_search_iteration.record(duration);
        Ok(())
    }

    fn record_sort_time(&self, duration: Duration) -> Result<(), RecordError> {
        self.totals.lock().sort.record(duration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_timer_accepts_everything() {
        let timer = NoOpTimer;
        assert_eq!(timer.record_tree_search(Duration::from_millis(5)), Ok(()));
        assert_eq!(
            timer.record_node_search_iteration(Duration::from_millis(5)),
            Ok(())
        );
        assert_eq!(timer.record_sort_time(Duration::from_millis(5)), Ok(()));
    }

    #[test]
    fn test_collecting_timer_aggregates() {
        let timer = CollectingTimer::new();
        timer.record_tree_search(Duration::from_millis(10)).unwrap();
        timer.record_tree_search(Duration::from_millis(20)).unwrap();
        timer
            .record_node_search_iteration(Duration::from_millis(1))
            .unwrap();
        timer.record_sort_time(Duration::from_millis(3)).unwrap();

        let summary = timer.summary();
        assert_eq!(summary.tree_search.count, 2);
        assert_eq!(summary.tree_search.total, Duration::from_millis(30));
        assert_eq!(summary.tree_search.mean, Duration::from_millis(15));
        assert_eq!(summary.node_search_iteration.count, 1);
        assert_eq!(summary.sort.count, 1);
    }

    #[test]
    fn test_collecting_timer_clones_share_state() {
        let timer = CollectingTimer::new();
        let handle = timer.clone();
        timer.record_sort_time(Duration::from_millis(2)).unwrap();
        assert_eq!(handle.summary().sort.count, 1);
    }

    #[test]
    fn test_empty_summary_has_zero_mean() {
        let summary = CollectingTimer::new().summary();
        assert_eq!(summary.tree_search.count, 0);
        assert_eq!(summary.tree_search.mean, Duration::ZERO);
    }
}
