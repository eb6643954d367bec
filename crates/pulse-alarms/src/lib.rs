//! # pulse-alarms
//!
//! Threshold alarms over Pulsegate admission telemetry.
//!
//! The alarm subsystem watches the aggregate counters the admission engine
//! (and the backend it protects) emit into a
//! [`TelemetrySink`](pulse_telemetry::TelemetrySink): blocked-request
//! volume, backend 4xx/5xx volume, backend latency, error ratio, resource
//! saturation and estimated spend. Each [`AlarmRule`] compares a windowed
//! aggregate against a threshold and fires only after a configured number of
//! consecutive breaching windows, debouncing transient spikes. Missing data
//! never breaches, so quiet periods cannot page anyone.
//!
//! Evaluation runs on an independent periodic schedule
//! ([`AlarmScheduler`]), never on the request path; delivery is best-effort
//! with retry on the next cycle.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use pulse_alarms::{standard_alarm_rules, AlarmPolicy};
//! use pulse_telemetry::TelemetrySink;
//!
//! let sink = Arc::new(TelemetrySink::new());
//! let policy = AlarmPolicy::new(standard_alarm_rules(500.0).unwrap());
//!
//! // No telemetry yet: nothing fires.
//! assert!(policy.evaluate(Utc::now(), &sink).is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channels;
pub mod defaults;
pub mod error;
pub mod policy;
pub mod scheduler;
pub mod types;

// Re-export main types
pub use channels::{AlarmChannel, TracingChannel};
pub use defaults::{metrics, standard_alarm_rules};
pub use error::{AlarmError, Result};
pub use policy::AlarmPolicy;
pub use scheduler::AlarmScheduler;
pub use types::{
    Aggregation, AlarmEvent, AlarmRule, AlarmRuleBuilder, AlarmSeverity, MetricExpr,
    MissingDataPolicy,
};
