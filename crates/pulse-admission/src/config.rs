//! Environment-scoped admission configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::rule::{Action, Decision, RuleSpec};
use crate::statement::Statement;
use crate::tiering::tier_rule_specs;

/// Base priority for the two rate-limit tier rules.
const TIER_BASE_PRIORITY: u32 = 20;

/// A managed signature group referenced by the standard rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureGroupSpec {
    /// Catalog vendor name.
    pub vendor: String,
    /// Group name within the vendor's catalog.
    pub group: String,
    /// Sub-rules excluded for this deployment (known false positives).
    pub excluded_sub_rules: HashSet<String>,
    /// Rule priority; broad signature groups conventionally sit at 1-9.
    pub priority: u32,
}

/// Configuration surface of the admission engine.
///
/// All thresholds are environment-scoped: construct with [`production`]
/// or [`development`] and adjust fields as needed. The struct is passed
/// explicitly into rule construction; there is no global state.
///
/// [`production`]: AdmissionConfig::production
/// [`development`]: AdmissionConfig::development
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Explicit decision when no rule matches. The engine is
    /// default-permit, deny-by-exception; this makes the fail-open choice a
    /// named, testable value.
    pub default_decision: Decision,
    /// Per-IP request ceiling for authenticated traffic (per 5-minute window).
    pub auth_rate_limit: u64,
    /// Per-IP request ceiling for anonymous traffic (per 5-minute window).
    pub anon_rate_limit: u64,
    /// Maximum accepted body size in bytes; larger bodies get 413.
    pub max_body_bytes: u64,
    /// Case-insensitive substrings that mark a blocked user agent.
    pub blocked_user_agent_substrings: Vec<String>,
    /// Managed signature groups to enforce.
    pub signature_groups: Vec<SignatureGroupSpec>,
}

impl AdmissionConfig {
    /// Production preset: strict ceilings.
    ///
    /// The `oversized_upload` sub-rule is excluded from `common-threats`
    /// because legitimate medical file uploads routinely exceed its internal
    /// size heuristic; the explicit body-size rule enforces the real ceiling.
    #[must_use]
    pub fn production() -> Self {
        Self {
            default_decision: Decision::Allow,
            auth_rate_limit: 2000,
            anon_rate_limit: 100,
            max_body_bytes: 26_214_400, // 25 MiB
            blocked_user_agent_substrings: vec![
                "bot".to_string(),
                "crawler".to_string(),
                "spider".to_string(),
                "scanner".to_string(),
            ],
            signature_groups: vec![
                SignatureGroupSpec {
                    vendor: "pulse".to_string(),
                    group: "common-threats".to_string(),
                    excluded_sub_rules: ["oversized_upload".to_string()].into(),
                    priority: 1,
                },
                SignatureGroupSpec {
                    vendor: "pulse".to_string(),
                    group: "bad-inputs".to_string(),
                    excluded_sub_rules: HashSet::new(),
                    priority: 2,
                },
            ],
        }
    }

    /// Development preset: looser ceilings, same rule shape.
    #[must_use]
    pub fn development() -> Self {
        Self {
            auth_rate_limit: 10_000,
            anon_rate_limit: 1_000,
            max_body_bytes: 104_857_600, // 100 MiB
            ..Self::production()
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// Builds the full deployable rule set from a configuration.
///
/// Layout, in priority order:
/// 1. signature-group rules (403, at their configured 1-9 priorities),
/// 2. body-size ceiling (413, priority 10),
/// 3. blocked user agents (403, priority 11),
/// 4. the two rate-limit tiers (429, priorities 20-21).
#[must_use]
pub fn standard_rule_specs(config: &AdmissionConfig) -> Vec<RuleSpec> {
    let mut specs = Vec::new();

    for group in &config.signature_groups {
        specs.push(RuleSpec::new(
            format!("signatures-{}", group.group),
            group.priority,
            Statement::signature_group(
                group.vendor.clone(),
                group.group.clone(),
                group.excluded_sub_rules.clone(),
            ),
            Action::Block {
                response_code: 403,
                response_body_key: "RequestBlocked".to_string(),
            },
            format!("signatures.{}", group.group.replace('-', "_")),
        ));
    }

    specs.push(RuleSpec::new(
        "body-size-cap",
        10,
        Statement::body_larger_than(config.max_body_bytes),
        Action::Block {
            response_code: 413,
            response_body_key: "PayloadTooLarge".to_string(),
        },
        "rule.body_size_cap",
    ));

    if !config.blocked_user_agent_substrings.is_empty() {
        specs.push(RuleSpec::new(
            "blocked-user-agents",
            11,
            Statement::Or(
                config
                    .blocked_user_agent_substrings
                    .iter()
                    .map(|s| Statement::header_contains_lowercase("user-agent", s))
                    .collect(),
            ),
            Action::Block {
                response_code: 403,
                response_body_key: "AutomatedClientBlocked".to_string(),
            },
            "rule.blocked_user_agents",
        ));
    }

    specs.extend(tier_rule_specs(
        config.auth_rate_limit,
        config.anon_rate_limit,
        TIER_BASE_PRIORITY,
    ));

    specs
}
