//! # pulse-admission
//!
//! Admission control policy engine for the Pulsegate health-data API.
//!
//! Every inbound request is evaluated against an ordered table of declarative
//! rules and receives exactly one decision: allow, block (with a configured
//! response), or fall through to the explicit default. Rules pair a priority
//! with a boolean [`Statement`] over the request:
//!
//! - [`Statement::SignatureGroup`] delegates to a managed catalog of attack
//!   signatures, with per-deployment sub-rule exclusions
//! - [`Statement::RateLimit`] checks an IP-keyed counter over a trailing
//!   5-minute window
//! - [`Statement::ByteMatch`] / [`Statement::SizeConstraint`] test request
//!   bytes and sizes directly
//! - `And` / `Or` / `Not` compose sub-statements with short-circuiting
//!
//! Compilation ([`compiler::compile`]) validates the whole rule set
//! atomically; the resulting [`RuleTable`] is immutable, so evaluation is
//! lock-free and embarrassingly parallel. The only mutable state is behind
//! the [`RateCounterStore`] contract.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pulse_admission::prelude::*;
//! use pulse_telemetry::TelemetrySink;
//!
//! let config = AdmissionConfig::production();
//! let catalog = Arc::new(StaticSignatureCatalog::with_baseline_groups());
//! let table = compiler::compile_checked(standard_rule_specs(&config), catalog.as_ref()).unwrap();
//!
//! let engine = Engine::new(
//!     table,
//!     config.default_decision.clone(),
//!     Arc::new(InMemoryRateCounter::new()),
//!     catalog,
//!     Arc::new(TelemetrySink::new()),
//! );
//!
//! let request = RequestView::builder("203.0.113.1".parse().unwrap())
//!     .path("/v1/records")
//!     .header("Host", "api.pulsegate.example")
//!     .header("Authorization", "Bearer token")
//!     .build();
//!
//! assert!(engine.evaluate(&request).is_allow());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compiler;
pub mod config;
pub mod counter;
pub mod error;
pub mod evaluator;
pub mod request;
pub mod rule;
pub mod signature;
pub mod statement;
pub mod tiering;

// Re-export main types
pub use config::{standard_rule_specs, AdmissionConfig, SignatureGroupSpec};
pub use counter::{InMemoryRateCounter, RateCounterStore};
pub use error::{AdmissionError, Result};
pub use evaluator::Engine;
pub use request::RequestView;
pub use rule::{Action, Decision, Rule, RuleSpec, RuleTable};
pub use signature::{SignatureCatalog, StaticSignatureCatalog};
pub use statement::{
    MatchField, MatchPosition, RateKey, SizeField, SizeOperator, Statement, TextTransform,
    RATE_WINDOW,
};
pub use tiering::tier_rule_specs;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::compiler;
    pub use crate::config::{standard_rule_specs, AdmissionConfig};
    pub use crate::counter::{InMemoryRateCounter, RateCounterStore};
    pub use crate::error::{AdmissionError, Result};
    pub use crate::evaluator::Engine;
    pub use crate::request::RequestView;
    pub use crate::rule::{Action, Decision, RuleSpec, RuleTable};
    pub use crate::signature::{SignatureCatalog, StaticSignatureCatalog};
    pub use crate::statement::Statement;
    pub use crate::tiering::tier_rule_specs;
}
