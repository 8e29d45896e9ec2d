// Session metrics module
//
// Tallies driver invocations and their outcomes for the end-of-session summary

use crate::services::ScanOutcome;
use indexmap::IndexMap;
use std::time::{Duration, Instant};

/// Counters for one scan session
///
/// Outcome tallies keep the order in which each kind was first seen, so the
/// summary reads in the order things happened.
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    /// Driver invocations, successful or not
    pub attempts: usize,

    /// Attempts that may have produced a page image
    pub pages_captured: usize,

    /// Time spent waiting on the driver
    pub total_scan_time: Duration,

    /// Count per [`ScanOutcome::kind`]
    pub outcomes: IndexMap<&'static str, usize>,

    /// Session start time
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            pages_captured: 0,
            total_scan_time: Duration::ZERO,
            outcomes: IndexMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Record one driver invocation and how long it took
    pub fn record_attempt(&mut self, outcome: &ScanOutcome, duration: Duration) {
        self.attempts += 1;
        self.total_scan_time += duration;
        if outcome.may_have_written_page() {
            self.pages_captured += 1;
        }
        *self.outcomes.entry(outcome.kind()).or_insert(0) += 1;
    }

    pub fn count(&self, kind: &str) -> usize {
        self.outcomes.get(kind).copied().unwrap_or(0)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average driver time per attempt in milliseconds
    pub fn avg_scan_time_ms(&self) -> f64 {
        if self.attempts > 0 {
            self.total_scan_time.as_millis() as f64 / self.attempts as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Scan Session Summary ===");
        tracing::info!("Elapsed: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Attempts: {}, pages captured: {}",
            self.attempts,
            self.pages_captured
        );
        tracing::info!(
            "Driver time: {:.2}s (avg: {:.2}ms per attempt)",
            self.total_scan_time.as_secs_f64(),
            self.avg_scan_time_ms()
        );
        for (kind, count) in &self.outcomes {
            tracing::info!("  {}: {}", kind, count);
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
