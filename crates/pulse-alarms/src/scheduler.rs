//! Periodic alarm evaluation, independent of the request path.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulse_telemetry::TelemetrySink;
use tracing::{debug, warn};

use crate::channels::AlarmChannel;
use crate::policy::AlarmPolicy;
use crate::types::AlarmEvent;

/// Default gap between evaluation cycles.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// How many delivery attempts an event gets before it is dropped.
const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// An event waiting to be (re)delivered.
#[derive(Debug, Clone)]
struct PendingDelivery {
    event: AlarmEvent,
    attempts: u32,
    /// Indices of channels still owed this event. Channels that already
    /// accepted it are not re-notified on retry.
    channels: Vec<usize>,
}

/// Drives an [`AlarmPolicy`] on a periodic schedule and fans fired events
/// out to delivery channels.
///
/// The scheduler runs on its own tokio task with no ordering dependency on
/// the evaluator beyond reading the telemetry it produced. A cancelled or
/// skipped cycle simply defers assessment to the next tick; failed
/// deliveries are retried next cycle up to a small attempt cap.
#[derive(Debug)]
pub struct AlarmScheduler {
    policy: Arc<AlarmPolicy>,
    sink: Arc<TelemetrySink>,
    channels: Vec<Arc<dyn AlarmChannel>>,
    interval: Duration,
    /// Events whose delivery failed, carried into the next cycle.
    pending: Mutex<Vec<PendingDelivery>>,
}

impl AlarmScheduler {
    /// Creates a scheduler with the default one-minute interval.
    #[must_use]
    pub fn new(
        policy: Arc<AlarmPolicy>,
        sink: Arc<TelemetrySink>,
        channels: Vec<Arc<dyn AlarmChannel>>,
    ) -> Self {
        Self::with_interval(policy, sink, channels, DEFAULT_INTERVAL)
    }

    /// Creates a scheduler with a custom evaluation interval.
    #[must_use]
    pub fn with_interval(
        policy: Arc<AlarmPolicy>,
        sink: Arc<TelemetrySink>,
        channels: Vec<Arc<dyn AlarmChannel>>,
        interval: Duration,
    ) -> Self {
        Self {
            policy,
            sink,
            channels,
            interval,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Number of events currently awaiting redelivery.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Runs one evaluation-and-delivery cycle at `now`.
    ///
    /// Exposed so tests and embedders can drive cycles with a controlled
    /// clock; [`spawn`](Self::spawn) calls this on every tick.
    pub fn run_cycle(&self, now: DateTime<Utc>) {
        let all_channels: Vec<usize> = (0..self.channels.len()).collect();

        let mut deliveries: Vec<PendingDelivery> = std::mem::take(&mut *self.pending.lock());
        deliveries.extend(
            self.policy
                .evaluate(now, &self.sink)
                .into_iter()
                .map(|event| PendingDelivery {
                    event,
                    attempts: 0,
                    channels: all_channels.clone(),
                }),
        );

        if deliveries.is_empty() {
            debug!("alarm cycle complete, nothing to deliver");
            return;
        }

        let mut carry = Vec::new();
        for mut delivery in deliveries {
            delivery.attempts += 1;

            // Attempt every outstanding channel; one failure must not keep
            // the event from the others.
            let mut still_owed = Vec::new();
            for &idx in &delivery.channels {
                let channel = &self.channels[idx];
                if let Err(e) = channel.deliver(&delivery.event) {
                    warn!(
                        channel = channel.name(),
                        rule = %delivery.event.rule_name,
                        attempt = delivery.attempts,
                        error = %e,
                        "alarm delivery failed"
                    );
                    still_owed.push(idx);
                }
            }

            if still_owed.is_empty() {
                continue;
            }

            if delivery.attempts < MAX_DELIVERY_ATTEMPTS {
                delivery.channels = still_owed;
                carry.push(delivery);
            } else {
                warn!(
                    rule = %delivery.event.rule_name,
                    attempts = delivery.attempts,
                    "dropping undeliverable alarm event"
                );
            }
        }

        *self.pending.lock() = carry;
    }

    /// Spawns the periodic evaluation loop on the current tokio runtime.
    ///
    /// The returned handle can be aborted to stop the loop; no historical
    /// streak data is lost when it is.
    #[must_use]
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                self.run_cycle(Utc::now());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::TracingChannel;
    use crate::defaults::{metrics, standard_alarm_rules};
    use crate::error::AlarmError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct RecordingChannel {
        delivered: AtomicUsize,
        failing: AtomicBool,
    }

    impl AlarmChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        fn deliver(&self, event: &AlarmEvent) -> crate::error::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AlarmError::DeliveryFailed {
                    channel: "recording".to_string(),
                    reason: format!("refused {}", event.rule_name),
                });
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scheduler_with(
        channel: Arc<RecordingChannel>,
        sink: Arc<TelemetrySink>,
    ) -> AlarmScheduler {
        let policy = Arc::new(AlarmPolicy::new(standard_alarm_rules(500.0).unwrap()));
        AlarmScheduler::with_interval(policy, sink, vec![channel], Duration::from_secs(60))
    }

    fn breach_5xx(sink: &TelemetrySink, now: DateTime<Utc>) {
        sink.record_at(metrics::BACKEND_5XX, now - chrono::Duration::seconds(5), 20.0);
    }

    #[test]
    fn test_cycle_delivers_fired_events() {
        let channel = Arc::new(RecordingChannel::default());
        let sink = Arc::new(TelemetrySink::new());
        let scheduler = scheduler_with(Arc::clone(&channel), Arc::clone(&sink));

        let now = Utc::now();
        breach_5xx(&sink, now);
        scheduler.run_cycle(now);

        assert_eq!(channel.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_failed_delivery_retried_next_cycle() {
        let channel = Arc::new(RecordingChannel::default());
        let sink = Arc::new(TelemetrySink::new());
        let scheduler = scheduler_with(Arc::clone(&channel), Arc::clone(&sink));

        channel.failing.store(true, Ordering::SeqCst);
        let now = Utc::now();
        breach_5xx(&sink, now);
        scheduler.run_cycle(now);

        assert_eq!(channel.delivered.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 1);

        // The channel recovers; the carried event goes out on the next tick.
        channel.failing.store(false, Ordering::SeqCst);
        scheduler.run_cycle(now + chrono::Duration::seconds(60));

        assert_eq!(channel.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_undeliverable_event_dropped_after_attempt_cap() {
        let channel = Arc::new(RecordingChannel::default());
        let sink = Arc::new(TelemetrySink::new());
        let scheduler = scheduler_with(Arc::clone(&channel), Arc::clone(&sink));

        channel.failing.store(true, Ordering::SeqCst);
        let now = Utc::now();
        breach_5xx(&sink, now);

        for i in 0..MAX_DELIVERY_ATTEMPTS {
            scheduler.run_cycle(now + chrono::Duration::seconds(i64::from(i) * 60));
        }

        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(channel.delivered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_one_failing_channel_does_not_starve_or_duplicate_others() {
        let flaky = Arc::new(RecordingChannel::default());
        let steady = Arc::new(RecordingChannel::default());
        let sink = Arc::new(TelemetrySink::new());
        let policy = Arc::new(AlarmPolicy::new(standard_alarm_rules(500.0).unwrap()));
        let scheduler = AlarmScheduler::with_interval(
            policy,
            Arc::clone(&sink),
            vec![Arc::clone(&flaky) as Arc<dyn AlarmChannel>, Arc::clone(&steady) as _],
            Duration::from_secs(60),
        );

        flaky.failing.store(true, Ordering::SeqCst);
        let now = Utc::now();
        breach_5xx(&sink, now);
        scheduler.run_cycle(now);

        // The second channel is attempted despite the first one failing.
        assert_eq!(steady.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 1);

        // On retry only the channel still owed the event is notified.
        flaky.failing.store(false, Ordering::SeqCst);
        scheduler.run_cycle(now + chrono::Duration::seconds(60));

        assert_eq!(flaky.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(steady.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_quiet_cycle_is_a_no_op() {
        let channel = Arc::new(RecordingChannel::default());
        let sink = Arc::new(TelemetrySink::new());
        let scheduler = scheduler_with(Arc::clone(&channel), sink);

        scheduler.run_cycle(Utc::now());
        assert_eq!(channel.delivered.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_spawned_loop_runs_and_stops() {
        let policy = Arc::new(AlarmPolicy::new(standard_alarm_rules(500.0).unwrap()));
        let sink = Arc::new(TelemetrySink::new());
        let scheduler = Arc::new(AlarmScheduler::with_interval(
            policy,
            sink,
            vec![Arc::new(TracingChannel::new())],
            Duration::from_millis(10),
        ));

        let handle = Arc::clone(&scheduler).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
