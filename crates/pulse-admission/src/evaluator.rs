//! Request evaluation against a compiled rule table.

use std::sync::Arc;

use pulse_telemetry::TelemetrySink;
use tracing::{debug, info};

use crate::counter::RateCounterStore;
use crate::request::RequestView;
use crate::rule::{Action, Decision, RuleTable};
use crate::signature::SignatureCatalog;
use crate::statement::EvalContext;

/// Decision counter incremented when a request is admitted.
pub const DECISION_ALLOW_COUNTER: &str = "decision.allow";
/// Decision counter incremented when a request is blocked.
pub const DECISION_BLOCK_COUNTER: &str = "decision.block";
/// Suffix appended to a rule's telemetry tag when a `Count` rule matches.
pub const COUNT_MATCH_SUFFIX: &str = ".matched";

/// The admission engine: a compiled rule table plus its collaborators.
///
/// Evaluation is stateless over the immutable table, so one engine is shared
/// across all concurrent request handlers with no locking. The only mutable
/// state reached during evaluation lives behind the [`RateCounterStore`].
#[derive(Clone)]
pub struct Engine {
    table: Arc<RuleTable>,
    /// Explicit, named fallback when no rule matches. Default-permit:
    /// the table is deny-by-exception and this must stay visible in
    /// configuration rather than emerge from a missed match arm.
    default_decision: Decision,
    counters: Arc<dyn RateCounterStore>,
    catalog: Arc<dyn SignatureCatalog>,
    telemetry: Arc<TelemetrySink>,
}

impl Engine {
    /// Creates an engine over a compiled table.
    #[must_use]
    pub fn new(
        table: RuleTable,
        default_decision: Decision,
        counters: Arc<dyn RateCounterStore>,
        catalog: Arc<dyn SignatureCatalog>,
        telemetry: Arc<TelemetrySink>,
    ) -> Self {
        Self {
            table: Arc::new(table),
            default_decision,
            counters,
            catalog,
            telemetry,
        }
    }

    /// The compiled table this engine evaluates.
    #[must_use]
    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// The configured no-match fallback.
    #[must_use]
    pub const fn default_decision(&self) -> &Decision {
        &self.default_decision
    }

    /// Evaluates one request and returns the admission decision.
    ///
    /// Rules are walked in ascending priority order. The first matching rule
    /// with a terminal action (`Allow`/`Block`) decides the request; matching
    /// `Count` rules are recorded and skipped. When nothing terminal matches,
    /// the configured default decision is returned.
    ///
    /// One counter is incremented per visited rule (the rule's telemetry
    /// tag) plus one decision counter per request.
    #[must_use]
    pub fn evaluate(&self, request: &RequestView) -> Decision {
        for rule in self.table.iter() {
            self.telemetry.incr(rule.telemetry_tag().as_str());

            let ctx = EvalContext {
                scope: rule.name(),
                counters: self.counters.as_ref(),
                catalog: self.catalog.as_ref(),
            };

            if !rule.statement().matches(request, &ctx) {
                continue;
            }

            match rule.action() {
                Action::Count => {
                    self.telemetry
                        .incr(&format!("{}{COUNT_MATCH_SUFFIX}", rule.telemetry_tag()));
                    debug!(
                        rule = rule.name(),
                        ip = %request.source_ip(),
                        "count rule matched, continuing"
                    );
                }
                Action::Allow => {
                    self.telemetry.incr(DECISION_ALLOW_COUNTER);
                    debug!(rule = rule.name(), ip = %request.source_ip(), "request allowed");
                    return Decision::Allow;
                }
                Action::Block {
                    response_code,
                    response_body_key,
                } => {
                    self.telemetry.incr(DECISION_BLOCK_COUNTER);
                    info!(
                        rule = rule.name(),
                        ip = %request.source_ip(),
                        response_code,
                        "request blocked"
                    );
                    return Decision::Block {
                        response_code: *response_code,
                        response_body_key: response_body_key.clone(),
                    };
                }
            }
        }

        match &self.default_decision {
            Decision::Allow => self.telemetry.incr(DECISION_ALLOW_COUNTER),
            Decision::Block { .. } => self.telemetry.incr(DECISION_BLOCK_COUNTER),
        }
        self.default_decision.clone()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.table.len())
            .field("default_decision", &self.default_decision)
            .finish_non_exhaustive()
    }
}
