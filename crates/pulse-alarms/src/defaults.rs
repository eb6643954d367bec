//! The standard Pulsegate alarm policy set.

use std::time::Duration;

use pulse_telemetry::CounterName;

use crate::error::Result;
use crate::types::{Aggregation, AlarmRule, AlarmSeverity, MetricExpr};

/// Telemetry series watched by the standard rules.
pub mod metrics {
    /// Requests blocked by the admission engine.
    pub const BLOCKED: &str = "decision.block";
    /// Backend responses with a 4xx status.
    pub const BACKEND_4XX: &str = "backend.http_4xx";
    /// Backend responses with a 5xx status.
    pub const BACKEND_5XX: &str = "backend.http_5xx";
    /// Backend latency samples in milliseconds.
    pub const BACKEND_LATENCY_MS: &str = "backend.latency_ms";
    /// Backend invocation errors.
    pub const BACKEND_ERRORS: &str = "backend.errors";
    /// Backend invocations.
    pub const BACKEND_INVOCATIONS: &str = "backend.invocations";
    /// Node CPU utilization percentage samples.
    pub const NODE_CPU_PERCENT: &str = "node.cpu_percent";
    /// Estimated spend gauge, same unit as the configured ceiling.
    pub const ESTIMATED_COST: &str = "billing.estimated_cost";
}

const FIVE_MINUTES: Duration = Duration::from_secs(300);

/// Builds the standard alarm rule set.
///
/// `cost_ceiling` is the environment-dependent spend threshold; everything
/// else is fixed policy:
///
/// - blocked requests: sum > 100 per 5 min, 2 consecutive windows
/// - backend 4xx: sum > 50 per 5 min, 2 windows
/// - backend 5xx: sum > 10 per 5 min, 1 window (critical)
/// - backend latency: average > 5000 ms, 3 windows (critical)
/// - backend error ratio: errors/invocations > 5%, 2 windows
/// - node CPU: average > 80%, 2 windows
/// - estimated cost: average > ceiling, 1 window
///
/// # Errors
///
/// Returns `AlarmError::InvalidRule` only if a rule definition is internally
/// inconsistent, which indicates a bug in this module rather than bad input.
pub fn standard_alarm_rules(cost_ceiling: f64) -> Result<Vec<AlarmRule>> {
    let name = |s: &str| -> Result<CounterName> {
        CounterName::new(s).map_err(|e| crate::error::AlarmError::InvalidRule {
            reason: e.to_string(),
        })
    };
    let counter = |s: &str| -> Result<MetricExpr> { Ok(MetricExpr::Counter(name(s)?)) };

    Ok(vec![
        AlarmRule::builder("blocked-requests-high", counter(metrics::BLOCKED)?)
            .window(FIVE_MINUTES)
            .threshold(100.0)
            .consecutive_breaches(2)
            .build()?,
        AlarmRule::builder("backend-4xx-high", counter(metrics::BACKEND_4XX)?)
            .window(FIVE_MINUTES)
            .threshold(50.0)
            .consecutive_breaches(2)
            .build()?,
        AlarmRule::builder("backend-5xx-high", counter(metrics::BACKEND_5XX)?)
            .window(FIVE_MINUTES)
            .threshold(10.0)
            .consecutive_breaches(1)
            .severity(AlarmSeverity::Critical)
            .build()?,
        AlarmRule::builder("backend-latency-high", counter(metrics::BACKEND_LATENCY_MS)?)
            .aggregation(Aggregation::Average)
            .window(FIVE_MINUTES)
            .threshold(5000.0)
            .consecutive_breaches(3)
            .severity(AlarmSeverity::Critical)
            .build()?,
        AlarmRule::builder(
            "backend-error-ratio-high",
            MetricExpr::RatioPercent {
                numerator: name(metrics::BACKEND_ERRORS)?,
                denominator: name(metrics::BACKEND_INVOCATIONS)?,
            },
        )
        .window(FIVE_MINUTES)
        .threshold(5.0)
        .consecutive_breaches(2)
        .build()?,
        AlarmRule::builder("node-cpu-high", counter(metrics::NODE_CPU_PERCENT)?)
            .aggregation(Aggregation::Average)
            .window(FIVE_MINUTES)
            .threshold(80.0)
            .consecutive_breaches(2)
            .build()?,
        AlarmRule::builder("estimated-cost-over-ceiling", counter(metrics::ESTIMATED_COST)?)
            .aggregation(Aggregation::Average)
            .window(FIVE_MINUTES)
            .threshold(cost_ceiling)
            .consecutive_breaches(1)
            .build()?,
    ])
}
