//! Alarm evaluation with consecutive-breach debouncing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pulse_telemetry::TelemetrySink;
use tracing::{debug, info};

use crate::types::{AlarmEvent, AlarmRule, MissingDataPolicy};

/// Evaluates a fixed set of [`AlarmRule`]s against telemetry.
///
/// The rule set is immutable after construction; the only mutable state is
/// the per-rule breach streak. Each call to [`evaluate`] assesses one
/// window per rule and fires an event exactly when a rule's streak reaches
/// its `consecutive_breaches` requirement; a continuing breach beyond that
/// does not re-fire until the streak has been broken and rebuilt.
///
/// Alarms are observability, never a gate: evaluation cannot fail, and a
/// window with missing data simply resets the streak.
///
/// [`evaluate`]: AlarmPolicy::evaluate
#[derive(Debug)]
pub struct AlarmPolicy {
    rules: Vec<AlarmRule>,
    /// Consecutive breaching windows seen per rule name.
    streaks: RwLock<HashMap<String, u32>>,
}

impl AlarmPolicy {
    /// Creates a policy over a set of rules.
    #[must_use]
    pub fn new(rules: Vec<AlarmRule>) -> Self {
        Self {
            rules,
            streaks: RwLock::new(HashMap::new()),
        }
    }

    /// The rules this policy evaluates.
    #[must_use]
    pub fn rules(&self) -> &[AlarmRule] {
        &self.rules
    }

    /// Current breach streak for a rule, 0 if unknown.
    #[must_use]
    pub fn streak(&self, rule_name: &str) -> u32 {
        self.streaks.read().get(rule_name).copied().unwrap_or(0)
    }

    /// Evaluates every rule for the window ending at `now`.
    #[must_use]
    pub fn evaluate(&self, now: DateTime<Utc>, sink: &TelemetrySink) -> Vec<AlarmEvent> {
        let mut events = Vec::new();
        let mut streaks = self.streaks.write();

        for rule in &self.rules {
            let value = rule
                .metric
                .resolve(sink, rule.aggregation, rule.window(), now);

            let streak = streaks.entry(rule.name.clone()).or_insert(0);

            let Some(value) = value else {
                match rule.missing_data {
                    MissingDataPolicy::NotBreaching => {
                        if *streak > 0 {
                            debug!(rule = %rule.name, "no data in window, streak reset");
                        }
                        *streak = 0;
                    }
                }
                continue;
            };

            if value > rule.threshold {
                *streak += 1;
                debug!(
                    rule = %rule.name,
                    value,
                    threshold = rule.threshold,
                    streak = *streak,
                    "window breached"
                );

                if *streak == rule.consecutive_breaches {
                    let event = AlarmEvent::fire(rule, value, now);
                    info!(
                        rule = %rule.name,
                        value,
                        threshold = rule.threshold,
                        severity = %event.severity,
                        "alarm fired"
                    );
                    events.push(event);
                }
            } else {
                *streak = 0;
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Aggregation, AlarmSeverity, MetricExpr};
    use pulse_telemetry::CounterName;
    use std::time::Duration;

    fn counter(name: &str) -> MetricExpr {
        MetricExpr::Counter(CounterName::new(name).unwrap())
    }

    fn blocked_rule(consecutive: u32) -> AlarmRule {
        AlarmRule::builder("blocked-requests", counter("decision.block"))
            .threshold(100.0)
            .window(Duration::from_secs(300))
            .consecutive_breaches(consecutive)
            .build()
            .unwrap()
    }

    /// Fills the current window so the rule's sum resolves to `total`.
    fn seed(sink: &TelemetrySink, now: DateTime<Utc>, total: f64) {
        sink.record_at("decision.block", now - chrono::Duration::seconds(1), total);
    }

    #[test]
    fn test_single_breach_with_debounce_two_fires_nothing() {
        let policy = AlarmPolicy::new(vec![blocked_rule(2)]);
        let sink = TelemetrySink::new();
        let now = Utc::now();

        seed(&sink, now, 150.0);
        assert!(policy.evaluate(now, &sink).is_empty());
        assert_eq!(policy.streak("blocked-requests"), 1);
    }

    #[test]
    fn test_two_consecutive_breaches_fire() {
        let policy = AlarmPolicy::new(vec![blocked_rule(2)]);
        let sink = TelemetrySink::with_retention(Duration::from_secs(7200));
        let now = Utc::now();

        let first_window = now - chrono::Duration::seconds(300);
        seed(&sink, first_window, 150.0);
        assert!(policy.evaluate(first_window, &sink).is_empty());

        seed(&sink, now, 180.0);
        let events = policy.evaluate(now, &sink);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule_name, "blocked-requests");
        assert!((events[0].value - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_breaching_window_resets_streak() {
        let policy = AlarmPolicy::new(vec![blocked_rule(2)]);
        let sink = TelemetrySink::new();

        let t1 = Utc::now() - chrono::Duration::seconds(900);
        let t2 = Utc::now() - chrono::Duration::seconds(450);
        let t3 = Utc::now();

        seed(&sink, t1, 150.0);
        assert!(policy.evaluate(t1, &sink).is_empty());

        seed(&sink, t2, 10.0);
        assert!(policy.evaluate(t2, &sink).is_empty());
        assert_eq!(policy.streak("blocked-requests"), 0);

        // The earlier breach no longer counts toward the requirement.
        seed(&sink, t3, 150.0);
        assert!(policy.evaluate(t3, &sink).is_empty());
    }

    #[test]
    fn test_missing_data_is_not_a_breach_and_resets() {
        let policy = AlarmPolicy::new(vec![blocked_rule(2)]);
        let sink = TelemetrySink::with_retention(Duration::from_secs(7200));

        let t1 = Utc::now() - chrono::Duration::seconds(1200);
        seed(&sink, t1, 150.0);
        assert!(policy.evaluate(t1, &sink).is_empty());
        assert_eq!(policy.streak("blocked-requests"), 1);

        // Quiet period: no samples at all in this window.
        let t2 = t1 + chrono::Duration::seconds(600);
        assert!(policy.evaluate(t2, &sink).is_empty());
        assert_eq!(policy.streak("blocked-requests"), 0);
    }

    #[test]
    fn test_continuing_breach_does_not_refire() {
        let policy = AlarmPolicy::new(vec![blocked_rule(1)]);
        let sink = TelemetrySink::with_retention(Duration::from_secs(7200));

        let t1 = Utc::now() - chrono::Duration::seconds(600);
        seed(&sink, t1, 150.0);
        assert_eq!(policy.evaluate(t1, &sink).len(), 1);

        // Still breaching in the next window: streak is past the target, so
        // no duplicate event until the streak is broken and rebuilt.
        let t2 = t1 + chrono::Duration::seconds(300);
        seed(&sink, t2, 150.0);
        assert!(policy.evaluate(t2, &sink).is_empty());
    }

    #[test]
    fn test_value_at_threshold_does_not_breach() {
        let policy = AlarmPolicy::new(vec![blocked_rule(1)]);
        let sink = TelemetrySink::new();
        let now = Utc::now();

        seed(&sink, now, 100.0);
        assert!(policy.evaluate(now, &sink).is_empty());
    }

    #[test]
    fn test_average_rule() {
        let rule = AlarmRule::builder("slow-backend", counter("backend.latency_ms"))
            .aggregation(Aggregation::Average)
            .threshold(5000.0)
            .consecutive_breaches(1)
            .severity(AlarmSeverity::Critical)
            .build()
            .unwrap();
        let policy = AlarmPolicy::new(vec![rule]);
        let sink = TelemetrySink::new();
        let now = Utc::now();

        sink.record_at("backend.latency_ms", now - chrono::Duration::seconds(5), 6100.0);
        sink.record_at("backend.latency_ms", now - chrono::Duration::seconds(9), 5900.0);

        let events = policy.evaluate(now, &sink);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, AlarmSeverity::Critical);
        assert!((events[0].value - 6000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_independent_rule_streaks() {
        let blocked = blocked_rule(1);
        let errors = AlarmRule::builder("backend-5xx", counter("backend.http_5xx"))
            .threshold(10.0)
            .consecutive_breaches(1)
            .build()
            .unwrap();
        let policy = AlarmPolicy::new(vec![blocked, errors]);
        let sink = TelemetrySink::new();
        let now = Utc::now();

        seed(&sink, now, 150.0);
        sink.record_at("backend.http_5xx", now - chrono::Duration::seconds(2), 3.0);

        let events = policy.evaluate(now, &sink);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule_name, "blocked-requests");
    }
}
