//! Keyed rate counters with a trailing window.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::Result;

/// Atomic increment-and-read over a keyed, trailing-window counter.
///
/// The counter store is the only mutable runtime state the engine touches.
/// Each call records one occurrence for `(scope, ip)` and returns the total
/// number of occurrences within the trailing `window`, atomically per key.
/// `scope` isolates the counters of different rate-limit rules so tiers never
/// share a window.
///
/// A production deployment backs this with a distributed counter; the
/// evaluator only requires per-key atomicity and treats any error as
/// "statement did not match".
pub trait RateCounterStore: Send + Sync + std::fmt::Debug {
    /// Records one occurrence and returns the in-window count including it.
    ///
    /// # Errors
    ///
    /// Returns `AdmissionError::CounterUnavailable` if the backing store
    /// cannot serve the operation.
    fn increment_and_read(&self, scope: &str, ip: IpAddr, window: Duration) -> Result<u64>;
}

/// In-memory sliding-window implementation of [`RateCounterStore`].
///
/// Keeps a deque of request timestamps per `(scope, ip)` and prunes entries
/// older than the window on every access. Suitable for single-process
/// deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryRateCounter {
    windows: RwLock<HashMap<(String, IpAddr), VecDeque<Instant>>>,
}

impl InMemoryRateCounter {
    /// Creates an empty counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(scope, ip)` keys currently tracked.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.windows.read().len()
    }

    /// Removes tracking for one `(scope, ip)` key.
    ///
    /// Lets long-running deployments reap idle keys so the map does not
    /// grow without bound under IP churn.
    pub fn remove(&self, scope: &str, ip: IpAddr) {
        self.windows.write().remove(&(scope.to_string(), ip));
    }

    /// Drops all tracked windows.
    pub fn clear(&self) {
        self.windows.write().clear();
    }
}

impl RateCounterStore for InMemoryRateCounter {
    fn increment_and_read(&self, scope: &str, ip: IpAddr, window: Duration) -> Result<u64> {
        let now = Instant::now();

        let mut windows = self.windows.write();
        let timestamps = windows.entry((scope.to_string(), ip)).or_default();

        if let Some(cutoff) = now.checked_sub(window) {
            while timestamps.front().is_some_and(|t| *t < cutoff) {
                timestamps.pop_front();
            }
        }

        timestamps.push_back(now);
        Ok(timestamps.len() as u64)
    }
}
