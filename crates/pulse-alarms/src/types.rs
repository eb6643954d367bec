//! Core alarm types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_telemetry::{CounterName, TelemetrySink};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AlarmError, Result};

/// How in-window samples are reduced to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Sum of samples in the window.
    Sum,
    /// Arithmetic mean of samples in the window.
    Average,
}

/// What to do when a window holds no data.
///
/// Absence of data is never itself a breach: zero traffic must not page
/// anyone. This is the only policy the engine supports, kept as an enum so
/// the choice stays visible in every rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingDataPolicy {
    /// Treat the empty window as not breaching and reset the streak.
    #[default]
    NotBreaching,
}

/// Severity attached to fired alarm events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSeverity {
    /// Should be investigated.
    #[default]
    Warning,
    /// Requires immediate attention.
    Critical,
}

impl AlarmSeverity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlarmSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The metric value an alarm rule watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "camelCase")]
pub enum MetricExpr {
    /// A single telemetry series, reduced by the rule's aggregation.
    Counter(CounterName),
    /// `numerator / denominator * 100` over in-window sums. Missing or zero
    /// denominator counts as missing data.
    RatioPercent {
        /// Series summed for the numerator.
        numerator: CounterName,
        /// Series summed for the denominator.
        denominator: CounterName,
    },
}

impl MetricExpr {
    /// Resolves the expression against the sink, `None` on missing data.
    #[must_use]
    pub fn resolve(
        &self,
        sink: &TelemetrySink,
        aggregation: Aggregation,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        match self {
            Self::Counter(name) => match aggregation {
                Aggregation::Sum => sink.sum_over(name.as_str(), window, now),
                Aggregation::Average => sink.average_over(name.as_str(), window, now),
            },
            Self::RatioPercent {
                numerator,
                denominator,
            } => {
                let num = sink.sum_over(numerator.as_str(), window, now)?;
                let den = sink.sum_over(denominator.as_str(), window, now)?;
                if den == 0.0 {
                    None
                } else {
                    Some(num / den * 100.0)
                }
            }
        }
    }
}

/// A threshold alarm over aggregated telemetry.
///
/// Breach means the resolved value is strictly greater than `threshold`.
/// An event fires only after `consecutive_breaches` consecutive evaluation
/// windows breach, which debounces transient spikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmRule {
    /// Unique rule name.
    pub name: String,
    /// The watched metric.
    pub metric: MetricExpr,
    /// Window reduction.
    pub aggregation: Aggregation,
    /// Trailing evaluation window in seconds.
    pub window_secs: u64,
    /// Breach threshold (strictly greater than).
    pub threshold: f64,
    /// Consecutive breaching windows required before firing.
    pub consecutive_breaches: u32,
    /// Missing-data handling.
    pub missing_data: MissingDataPolicy,
    /// Severity of fired events.
    pub severity: AlarmSeverity,
}

impl AlarmRule {
    /// Starts building an alarm rule.
    pub fn builder(name: impl Into<String>, metric: MetricExpr) -> AlarmRuleBuilder {
        AlarmRuleBuilder::new(name, metric)
    }

    /// The evaluation window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Builder for [`AlarmRule`].
#[derive(Debug)]
pub struct AlarmRuleBuilder {
    name: String,
    metric: MetricExpr,
    aggregation: Aggregation,
    window_secs: u64,
    threshold: f64,
    consecutive_breaches: u32,
    severity: AlarmSeverity,
}

impl AlarmRuleBuilder {
    fn new(name: impl Into<String>, metric: MetricExpr) -> Self {
        Self {
            name: name.into(),
            metric,
            aggregation: Aggregation::Sum,
            window_secs: 300,
            threshold: 0.0,
            consecutive_breaches: 1,
            severity: AlarmSeverity::Warning,
        }
    }

    /// Sets the window reduction.
    #[must_use]
    pub const fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Sets the evaluation window.
    #[must_use]
    pub const fn window(mut self, window: Duration) -> Self {
        self.window_secs = window.as_secs();
        self
    }

    /// Sets the breach threshold.
    #[must_use]
    pub const fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets how many consecutive breaching windows are required.
    #[must_use]
    pub const fn consecutive_breaches(mut self, n: u32) -> Self {
        self.consecutive_breaches = n;
        self
    }

    /// Sets the event severity.
    #[must_use]
    pub const fn severity(mut self, severity: AlarmSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Builds the rule.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::InvalidRule` if the name is empty, the window is
    /// zero, or `consecutive_breaches` is zero.
    pub fn build(self) -> Result<AlarmRule> {
        if self.name.is_empty() {
            return Err(AlarmError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }
        if self.window_secs == 0 {
            return Err(AlarmError::InvalidRule {
                reason: "window cannot be zero".to_string(),
            });
        }
        if self.consecutive_breaches == 0 {
            return Err(AlarmError::InvalidRule {
                reason: "consecutive breaches must be at least 1".to_string(),
            });
        }

        Ok(AlarmRule {
            name: self.name,
            metric: self.metric,
            aggregation: self.aggregation,
            window_secs: self.window_secs,
            threshold: self.threshold,
            consecutive_breaches: self.consecutive_breaches,
            missing_data: MissingDataPolicy::NotBreaching,
            severity: self.severity,
        })
    }
}

/// A fired alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Unique identifier of this event.
    pub id: String,
    /// Name of the rule that fired.
    pub rule_name: String,
    /// The value that breached.
    pub value: f64,
    /// The rule's threshold.
    pub threshold: f64,
    /// When the event fired.
    pub fired_at: DateTime<Utc>,
    /// Severity inherited from the rule.
    pub severity: AlarmSeverity,
}

impl AlarmEvent {
    /// Creates an event for a breaching rule.
    #[must_use]
    pub fn fire(rule: &AlarmRule, value: f64, fired_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_name: rule.name.clone(),
            value,
            threshold: rule.threshold,
            fired_at,
            severity: rule.severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(name: &str) -> MetricExpr {
        MetricExpr::Counter(CounterName::new(name).unwrap())
    }

    #[test]
    fn test_builder_defaults() {
        let rule = AlarmRule::builder("blocked-requests", counter("decision.block"))
            .threshold(100.0)
            .build()
            .unwrap();

        assert_eq!(rule.window(), Duration::from_secs(300));
        assert_eq!(rule.aggregation, Aggregation::Sum);
        assert_eq!(rule.consecutive_breaches, 1);
        assert_eq!(rule.missing_data, MissingDataPolicy::NotBreaching);
        assert_eq!(rule.severity, AlarmSeverity::Warning);
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        let result = AlarmRule::builder("", counter("decision.block")).build();
        assert!(matches!(result, Err(AlarmError::InvalidRule { .. })));
    }

    #[test]
    fn test_builder_rejects_zero_window() {
        let result = AlarmRule::builder("r", counter("decision.block"))
            .window(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(AlarmError::InvalidRule { .. })));
    }

    #[test]
    fn test_builder_rejects_zero_breach_count() {
        let result = AlarmRule::builder("r", counter("decision.block"))
            .consecutive_breaches(0)
            .build();
        assert!(matches!(result, Err(AlarmError::InvalidRule { .. })));
    }

    #[test]
    fn test_counter_expr_resolution() {
        let sink = TelemetrySink::new();
        let now = Utc::now();
        sink.record_at("decision.block", now - chrono::Duration::seconds(10), 1.0);
        sink.record_at("decision.block", now - chrono::Duration::seconds(20), 3.0);

        let expr = counter("decision.block");
        let window = Duration::from_secs(300);

        assert_eq!(expr.resolve(&sink, Aggregation::Sum, window, now), Some(4.0));
        assert_eq!(
            expr.resolve(&sink, Aggregation::Average, window, now),
            Some(2.0)
        );
    }

    #[test]
    fn test_ratio_expr_resolution() {
        let sink = TelemetrySink::new();
        let now = Utc::now();
        let t = now - chrono::Duration::seconds(30);
        sink.record_at("backend.errors", t, 6.0);
        sink.record_at("backend.invocations", t, 100.0);

        let expr = MetricExpr::RatioPercent {
            numerator: CounterName::new("backend.errors").unwrap(),
            denominator: CounterName::new("backend.invocations").unwrap(),
        };

        let value = expr
            .resolve(&sink, Aggregation::Sum, Duration::from_secs(300), now)
            .unwrap();
        assert!((value - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_with_missing_or_zero_denominator_is_none() {
        let sink = TelemetrySink::new();
        let now = Utc::now();
        sink.record_at("backend.errors", now - chrono::Duration::seconds(5), 3.0);

        let expr = MetricExpr::RatioPercent {
            numerator: CounterName::new("backend.errors").unwrap(),
            denominator: CounterName::new("backend.invocations").unwrap(),
        };
        let window = Duration::from_secs(300);

        assert_eq!(expr.resolve(&sink, Aggregation::Sum, window, now), None);

        sink.record_at("backend.invocations", now - chrono::Duration::seconds(5), 0.0);
        assert_eq!(expr.resolve(&sink, Aggregation::Sum, window, now), None);
    }

    #[test]
    fn test_event_carries_rule_fields() {
        let rule = AlarmRule::builder("latency", counter("backend.latency_ms"))
            .aggregation(Aggregation::Average)
            .threshold(5000.0)
            .severity(AlarmSeverity::Critical)
            .build()
            .unwrap();

        let now = Utc::now();
        let event = AlarmEvent::fire(&rule, 7200.0, now);

        assert_eq!(event.rule_name, "latency");
        assert!((event.value - 7200.0).abs() < f64::EPSILON);
        assert!((event.threshold - 5000.0).abs() < f64::EPSILON);
        assert_eq!(event.fired_at, now);
        assert_eq!(event.severity, AlarmSeverity::Critical);
        assert!(!event.id.is_empty());
    }

    #[test]
    fn test_rule_serialization_roundtrip() {
        let rule = AlarmRule::builder("blocked-requests", counter("decision.block"))
            .threshold(100.0)
            .consecutive_breaches(2)
            .build()
            .unwrap();

        let json = serde_json::to_string(&rule).unwrap();
        let parsed: AlarmRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }
}
