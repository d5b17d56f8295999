//! Adaptive evaluation timeout.
//!
//! Keeps a sliding window of recent evaluation durations and proposes the
//! configured percentile of that window as the advisory budget for the next
//! evaluation round.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::TimeoutConfig;

/// Bounded window of normalized durations, in whole seconds, oldest first.
pub type DurationWindow = VecDeque<u64>;

/// Percentile-based timeout estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutEstimator {
    config: TimeoutConfig,
    window: DurationWindow,
}

impl TimeoutEstimator {
    /// Creates an estimator with an empty window.
    pub fn new(config: TimeoutConfig) -> Self {
        Self {
            config,
            window: DurationWindow::new(),
        }
    }

    /// Creates an estimator from a previously captured window.
    pub fn with_window(config: TimeoutConfig, window: DurationWindow) -> Self {
        Self { config, window }
    }

    /// Appends durations and evicts the oldest entries beyond
    /// `2 * population_size`.
    ///
    /// Unknown durations are replaced by the configured default; known ones
    /// are truncated to whole seconds.
    pub fn observe(&mut self, durations: &[Option<Duration>], population_size: usize) {
        let default = self.config.default_duration_secs;
        self.window
            .extend(durations.iter().map(|d| d.map_or(default, |d| d.as_secs())));

        let capacity = 2 * population_size;
        while self.window.len() > capacity {
            self.window.pop_front();
        }
    }

    /// Timeout hint for the next evaluation round, in whole seconds.
    ///
    /// Falls back to the initial timeout while the window is empty.
    pub fn estimate(&self) -> u64 {
        if self.window.is_empty() {
            return self.config.initial_timeout_secs;
        }
        let mut sorted: Vec<u64> = self.window.iter().copied().collect();
        sorted.sort_unstable();
        percentile(&sorted, self.config.percentile) as u64
    }

    /// Current window contents, oldest first.
    pub fn window(&self) -> &DurationWindow {
        &self.window
    }
}

/// Percentile of sorted values with linear interpolation between the two
/// closest ranks.
///
/// # Panics
/// Panics if `sorted` is empty.
fn percentile(sorted: &[u64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = (p / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let lower = sorted[lo] as f64;
    let upper = sorted[hi] as f64;
    lower + (upper - lower) * (rank - lo as f64)
}
