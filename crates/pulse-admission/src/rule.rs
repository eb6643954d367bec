//! Rules, actions and the compiled rule table.

use pulse_telemetry::CounterName;
use serde::{Deserialize, Serialize};

use crate::statement::Statement;

/// What happens when a rule's statement matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Admit the request immediately.
    Allow,
    /// Reject the request with a configured response.
    Block {
        /// HTTP status code returned to the client.
        response_code: u16,
        /// Key into the static response-template map.
        response_body_key: String,
    },
    /// Record the match and keep evaluating. Used for staged rollout of new
    /// rules; a `Count` match never decides the request.
    Count,
}

impl Action {
    /// True for actions that end evaluation when their rule matches.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Count)
    }
}

/// The outcome of evaluating a request against a rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Decision {
    /// The request may proceed to the backend.
    Allow,
    /// The request is rejected.
    Block {
        /// HTTP status code returned to the client.
        response_code: u16,
        /// Key into the static response-template map.
        response_body_key: String,
    },
}

impl Decision {
    /// True when the request was admitted.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// An uncompiled rule specification, as loaded from configuration.
///
/// Priorities order evaluation ascending and must be unique within a table.
/// By convention priorities 1-9 carry broad signature-group rules and 10+
/// carry custom application rules; the compiler enforces uniqueness only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Unique rule name; also the counter scope for rate-limit statements.
    pub name: String,
    /// Evaluation order, ascending. Unique per table.
    pub priority: u32,
    /// The condition to test.
    pub statement: Statement,
    /// What a match does.
    pub action: Action,
    /// Counter name incremented each time the rule is visited.
    pub telemetry_tag: String,
}

impl RuleSpec {
    /// Creates a rule specification.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        statement: Statement,
        action: Action,
        telemetry_tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            statement,
            action,
            telemetry_tag: telemetry_tag.into(),
        }
    }
}

/// A validated, compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: String,
    pub(crate) priority: u32,
    pub(crate) statement: Statement,
    pub(crate) action: Action,
    pub(crate) telemetry_tag: CounterName,
}

impl Rule {
    /// The rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule priority.
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    /// The rule's statement.
    #[must_use]
    pub const fn statement(&self) -> &Statement {
        &self.statement
    }

    /// The rule's action.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// The validated telemetry counter name for this rule.
    #[must_use]
    pub const fn telemetry_tag(&self) -> &CounterName {
        &self.telemetry_tag
    }
}

/// A priority-ascending, immutable sequence of compiled rules.
///
/// Produced only by [`crate::compiler::compile`]; shared read-only across all
/// concurrent evaluations.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    pub(crate) rules: Vec<Rule>,
}

impl RuleTable {
    /// Iterates rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Number of rules in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the table carries no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks up a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}
