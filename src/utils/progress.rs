//! Periodic progress logging for long loops.
//!
//! A [`ProgressTracker`] counts processed items and logs each time the count crosses a
//! multiple of its interval. It is shared by reference across rayon workers.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Thread-safe counter that logs at regular intervals
///
/// # Example
/// ```
/// use mhc_typer::utils::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Scored alleles").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Scored alleles 250 (complete)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: AtomicU64,
}

impl ProgressTracker {
    /// Tracker starting at zero with an interval of 10,000
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            interval: 10_000,
            message: message.into(),
            count: AtomicU64::new(0),
        }
    }

    /// Log every `interval` items. An interval of zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Add `additional` items, logging once per interval boundary crossed.
    ///
    /// Returns `true` when the new count sits exactly on a boundary.
    pub fn log_if_needed(&self, additional: u64) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count % self.interval == 0;
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            info!("{} {}", self.message, i * self.interval);
        }

        new_count % self.interval == 0
    }

    /// Log the final count unless the last boundary already reported it
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            let count = self.count();
            if count > 0 {
                info!("{} {} (complete)", self.message, count);
            }
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
