//! In-process telemetry for the Pulsegate admission engine.
//!
//! `pulse-telemetry` is the shared observability substrate between the
//! admission evaluator (which emits per-rule and per-decision counters) and
//! the alarm policy (which reads them back through windowed aggregation
//! queries).
//!
//! # Design
//!
//! - **Push API**: counters and value samples are pushed by name; there is no
//!   registration step and no query language.
//! - **Best-effort recording**: invalid series names are logged and dropped so
//!   that telemetry can never fail a request.
//! - **Windowed queries**: `sum`, `average` and `last` over a trailing window
//!   with an explicit `now`, so consumers are deterministic under test.
//! - **Missing data is `None`**: an empty window is distinguishable from a
//!   zero sum, which the alarm policy relies on for its missing-data handling.
//!
//! # Example
//!
//! ```rust
//! use pulse_telemetry::TelemetrySink;
//! use std::time::Duration;
//! use chrono::Utc;
//!
//! let sink = TelemetrySink::new();
//! sink.incr("decision.block");
//! sink.observe("backend.latency_ms", 240.0);
//!
//! let window = Duration::from_secs(300);
//! assert_eq!(sink.sum_over("decision.block", window, Utc::now()), Some(1.0));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod sink;
pub mod types;

pub use error::{Result, TelemetryError};
pub use sink::TelemetrySink;
pub use types::{CounterName, Sample};
