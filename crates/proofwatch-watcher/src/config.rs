//! Watcher configuration.

use std::time::Duration;

/// Configuration for a [`CollectionWatcher`](crate::CollectionWatcher).
///
/// # Example
///
/// ```rust
/// use proofwatch_watcher::WatcherConfig;
/// use std::time::Duration;
///
/// let config = WatcherConfig::new()
///     .with_poll_interval(Duration::from_secs(30))
///     .with_poll_limit(100)
///     .with_reanchor_on_tamper(false);
/// ```
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Interval between poll-mode scans.
    pub poll_interval: Duration,
    /// How far back a poll-mode scan looks.
    pub poll_lookback: Duration,
    /// Maximum records examined per poll-mode scan.
    pub poll_limit: usize,
    /// Pause after each anchoring submission, so bursts of new records
    /// don't flood the ledger endpoint.
    pub submit_pacing: Duration,
    /// Whether a detected divergence re-anchors the new digest.
    pub reanchor_on_tamper: bool,
}

impl WatcherConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Poll interval: 15 seconds
    /// - Poll lookback: 24 hours
    /// - Poll limit: 500 records per scan
    /// - Submission pacing: 400 milliseconds
    /// - Re-anchor on tamper: enabled
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            poll_lookback: Duration::from_secs(24 * 60 * 60),
            poll_limit: 500,
            submit_pacing: Duration::from_millis(400),
            reanchor_on_tamper: true,
        }
    }

    /// Sets the poll-mode scan interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the poll-mode lookback window.
    #[must_use]
    pub const fn with_poll_lookback(mut self, lookback: Duration) -> Self {
        self.poll_lookback = lookback;
        self
    }

    /// Sets the per-scan record limit.
    #[must_use]
    pub const fn with_poll_limit(mut self, limit: usize) -> Self {
        self.poll_limit = limit;
        self
    }

    /// Sets the pause after each anchoring submission.
    #[must_use]
    pub const fn with_submit_pacing(mut self, pacing: Duration) -> Self {
        self.submit_pacing = pacing;
        self
    }

    /// Enables or disables re-anchoring of post-tamper digests.
    #[must_use]
    pub const fn with_reanchor_on_tamper(mut self, enabled: bool) -> Self {
        self.reanchor_on_tamper = enabled;
        self
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}
