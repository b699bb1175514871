//! Per-dispatcher delivery statistics.
//!
//! Counters are updated from the hook thread and read from anywhere.
//! Nothing is persisted; counts cover the dispatcher's lifetime (or the
//! time since the last `reset`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters for one dispatcher.
#[derive(Debug)]
pub struct DispatchStats {
    /// Normalized events fanned out to the registry
    events_dispatched: AtomicU64,
    /// Individual callback invocations that returned normally
    callbacks_invoked: AtomicU64,
    /// Callback invocations that panicked
    callback_failures: AtomicU64,
    /// Click signals dropped by the debounce window
    clicks_debounced: AtomicU64,
    /// Key signals that resolved to no identifier
    unidentified_keys: AtomicU64,
    started_at: DateTime<Utc>,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self {
            events_dispatched: AtomicU64::new(0),
            callbacks_invoked: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            clicks_debounced: AtomicU64::new(0),
            unidentified_keys: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callbacks_invoked(&self, count: u64) {
        self.callbacks_invoked.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_callback_failures(&self, count: u64) {
        self.callback_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_click_debounced(&self) {
        self.clicks_debounced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unidentified_key(&self) {
        self.unidentified_keys.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            callbacks_invoked: self.callbacks_invoked.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            clicks_debounced: self.clicks_debounced.load(Ordering::Relaxed),
            unidentified_keys: self.unidentified_keys.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self, label: &str) -> String {
        let stats = self.snapshot();
        format!(
            "{label} dispatcher:\n\
             - Events dispatched: {}\n\
             - Callbacks invoked: {}\n\
             - Callback failures: {}\n\
             - Clicks debounced: {}\n\
             - Unidentified keys: {}\n\
             - Uptime: {} seconds",
            stats.events_dispatched,
            stats.callbacks_invoked,
            stats.callback_failures,
            stats.clicks_debounced,
            stats.unidentified_keys,
            stats.uptime_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.events_dispatched.store(0, Ordering::Relaxed);
        self.callbacks_invoked.store(0, Ordering::Relaxed);
        self.callback_failures.store(0, Ordering::Relaxed);
        self.clicks_debounced.store(0, Ordering::Relaxed);
        self.unidentified_keys.store(0, Ordering::Relaxed);
    }
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub events_dispatched: u64,
    pub callbacks_invoked: u64,
    pub callback_failures: u64,
    pub clicks_debounced: u64,
    pub unidentified_keys: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = DispatchStats::new();

        stats.record_event_dispatched();
        stats.record_callbacks_invoked(2);
        stats.record_click_debounced();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_dispatched, 1);
        assert_eq!(snapshot.callbacks_invoked, 2);
        assert_eq!(snapshot.clicks_debounced, 1);
        assert_eq!(snapshot.callback_failures, 0);
    }

    #[test]
    fn test_reset() {
        let stats = DispatchStats::new();

        stats.record_callback_failures(1);
        stats.record_unidentified_key();
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.callback_failures, 0);
        assert_eq!(snapshot.unidentified_keys, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = DispatchStats::new();
        let summary = stats.summary("Mouse");

        assert!(summary.starts_with("Mouse dispatcher:"));
        assert!(summary.contains("Clicks debounced: 0"));
    }
}
