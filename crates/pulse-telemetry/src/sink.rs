//! The telemetry sink: named counters and value samples with windowed queries.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::types::{CounterName, Sample};

/// Default retention for recorded samples.
const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// In-process telemetry sink.
///
/// Accepts named counter increments and value samples, and answers windowed
/// aggregation queries over a trailing interval. Recording is best-effort:
/// an invalid series name is logged and dropped, never an error, so callers
/// on the request path stay infallible.
///
/// All series share a single retention horizon; samples older than the
/// horizon are pruned on write.
#[derive(Debug)]
pub struct TelemetrySink {
    /// Per-series samples, oldest first.
    series: RwLock<HashMap<CounterName, VecDeque<Sample>>>,
    /// How long samples are kept.
    retention: Duration,
}

impl TelemetrySink {
    /// Creates a sink with the default one-hour retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Creates a sink with a custom retention horizon.
    #[must_use]
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Increments a counter by one.
    pub fn incr(&self, name: &str) {
        self.record_at(name, Utc::now(), 1.0);
    }

    /// Increments a counter by `n`.
    pub fn incr_by(&self, name: &str, n: u64) {
        self.record_at(name, Utc::now(), n as f64);
    }

    /// Records a value sample (e.g. a latency measurement).
    pub fn observe(&self, name: &str, value: f64) {
        self.record_at(name, Utc::now(), value);
    }

    /// Records a value at an explicit timestamp.
    ///
    /// Invalid series names are dropped with a warning.
    pub fn record_at(&self, name: &str, at: DateTime<Utc>, value: f64) {
        let name = match CounterName::new(name) {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "dropping sample with invalid series name");
                return;
            }
        };

        let mut series = self.series.write();
        let points = series.entry(name).or_default();
        points.push_back(Sample::new(at, value));

        // Prune anything past the retention horizon
        let horizon = at
            - chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::hours(1));
        while points.front().is_some_and(|s| s.at < horizon) {
            points.pop_front();
        }
    }

    /// Sum of samples within the trailing `window` ending at `now`.
    ///
    /// Returns `None` when the series has no samples in the window, so
    /// callers can distinguish "no data" from a zero sum.
    #[must_use]
    pub fn sum_over(&self, name: &str, window: Duration, now: DateTime<Utc>) -> Option<f64> {
        self.fold_window(name, window, now, |values| values.iter().sum())
    }

    /// Arithmetic mean of samples within the trailing `window` ending at `now`.
    #[must_use]
    pub fn average_over(&self, name: &str, window: Duration, now: DateTime<Utc>) -> Option<f64> {
        self.fold_window(name, window, now, |values| {
            values.iter().sum::<f64>() / values.len() as f64
        })
    }

    /// The most recent sample value within the trailing `window` ending at `now`.
    #[must_use]
    pub fn last_value(&self, name: &str, window: Duration, now: DateTime<Utc>) -> Option<f64> {
        self.fold_window(name, window, now, |values| values[values.len() - 1])
    }

    /// Number of samples within the trailing `window` ending at `now`.
    #[must_use]
    pub fn count_over(&self, name: &str, window: Duration, now: DateTime<Utc>) -> u64 {
        self.fold_window(name, window, now, |values| values.len() as f64)
            .map_or(0, |n| n as u64)
    }

    /// Returns the number of distinct series recorded.
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.read().len()
    }

    /// Removes all recorded data.
    pub fn clear(&self) {
        self.series.write().clear();
    }

    /// Applies `f` to the in-window values of a series, `None` if empty.
    fn fold_window(
        &self,
        name: &str,
        window: Duration,
        now: DateTime<Utc>,
        f: impl FnOnce(&[f64]) -> f64,
    ) -> Option<f64> {
        let name = CounterName::new(name).ok()?;
        let cutoff =
            now - chrono::Duration::from_std(window).unwrap_or(chrono::Duration::minutes(5));

        let series = self.series.read();
        let points = series.get(&name)?;

        let values: Vec<f64> = points
            .iter()
            .filter(|s| s.at >= cutoff && s.at <= now)
            .map(|s| s.value)
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(f(&values))
        }
    }
}

impl Default for TelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(300);

    fn ts(secs_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::seconds(secs_ago)
    }

    #[test]
    fn test_sum_over_counts_increments() {
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("decision.block", ts(10, now), 1.0);
        sink.record_at("decision.block", ts(20, now), 1.0);
        sink.record_at("decision.block", ts(30, now), 1.0);

        assert_eq!(sink.sum_over("decision.block", WINDOW, now), Some(3.0));
    }

    #[test]
    fn test_sum_excludes_samples_outside_window() {
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("decision.block", ts(400, now), 1.0);
        sink.record_at("decision.block", ts(10, now), 1.0);

        assert_eq!(sink.sum_over("decision.block", WINDOW, now), Some(1.0));
    }

    #[test]
    fn test_missing_series_is_none_not_zero() {
        let sink = TelemetrySink::new();
        assert_eq!(sink.sum_over("decision.block", WINDOW, Utc::now()), None);
        assert_eq!(sink.average_over("decision.block", WINDOW, Utc::now()), None);
    }

    #[test]
    fn test_empty_window_is_none() {
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("backend.latency_ms", ts(600, now), 42.0);

        assert_eq!(sink.average_over("backend.latency_ms", WINDOW, now), None);
    }

    #[test]
    fn test_average_over() {
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("backend.latency_ms", ts(10, now), 100.0);
        sink.record_at("backend.latency_ms", ts(20, now), 300.0);

        assert_eq!(
            sink.average_over("backend.latency_ms", WINDOW, now),
            Some(200.0)
        );
    }

    #[test]
    fn test_last_value_is_most_recent() {
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("billing.estimated_cost", ts(120, now), 10.0);
        sink.record_at("billing.estimated_cost", ts(30, now), 14.0);

        assert_eq!(
            sink.last_value("billing.estimated_cost", WINDOW, now),
            Some(14.0)
        );
    }

    #[test]
    fn test_count_over() {
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("requests.total", ts(5, now), 1.0);
        sink.record_at("requests.total", ts(15, now), 1.0);

        assert_eq!(sink.count_over("requests.total", WINDOW, now), 2);
        assert_eq!(sink.count_over("requests.other", WINDOW, now), 0);
    }

    #[test]
    fn test_invalid_name_dropped_silently() {
        let sink = TelemetrySink::new();
        sink.incr("Not A Valid Name");
        assert_eq!(sink.series_count(), 0);
    }

    #[test]
    fn test_retention_prunes_old_samples() {
        let sink = TelemetrySink::with_retention(Duration::from_secs(60));
        let now = Utc::now();

        sink.record_at("requests.total", ts(120, now), 1.0);
        sink.record_at("requests.total", now, 1.0);

        // The old sample fell off the retention horizon on the second write.
        assert_eq!(
            sink.sum_over("requests.total", Duration::from_secs(3600), now),
            Some(1.0)
        );
    }

    #[test]
    fn test_incr_and_observe_use_wall_clock() {
        let sink = TelemetrySink::new();
        sink.incr("decision.allow");
        sink.incr_by("decision.allow", 4);
        sink.observe("backend.latency_ms", 12.5);

        let now = Utc::now();
        assert_eq!(sink.sum_over("decision.allow", WINDOW, now), Some(5.0));
        assert_eq!(
            sink.last_value("backend.latency_ms", WINDOW, now),
            Some(12.5)
        );
    }

    #[test]
    fn test_clear() {
        let sink = TelemetrySink::new();
        sink.incr("decision.allow");
        assert_eq!(sink.series_count(), 1);

        sink.clear();
        assert_eq!(sink.series_count(), 0);
    }
}
