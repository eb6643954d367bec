//! Two-tier rate limiting: authenticated and anonymous ceilings.

use crate::rule::{Action, RuleSpec};
use crate::statement::Statement;

/// Rule name for the authenticated tier.
pub const AUTH_TIER_RULE: &str = "rate-tier-authenticated";
/// Rule name for the anonymous tier.
pub const ANON_TIER_RULE: &str = "rate-tier-anonymous";
/// Response template key for rate-limited requests.
pub const RATE_LIMITED_BODY_KEY: &str = "RateLimited";

/// Builds the two tiered rate-limit rules.
///
/// A single IP may carry both authenticated and anonymous traffic. The
/// authenticated tier is a plain per-IP ceiling covering everything from the
/// address. The anonymous tier is tighter and guarded by
/// `Not(Authorization starts with "Bearer")`, so callers that present proof
/// of authentication are never throttled at the anonymous ceiling. The guard
/// evaluates before the rate-limit child: `And` short-circuits, and the
/// counter increment is a side effect, so authenticated requests must never
/// reach it or they would drain the anonymous budget of their IP. The guard
/// is a literal prefix test on the raw header value: a malformed or empty
/// `Authorization` header does not count as authenticated and falls into the
/// stricter tier.
///
/// The rules land at `base_priority` and `base_priority + 1`; the
/// authenticated (looser) tier evaluates first so its counter sees every
/// request from the IP.
#[must_use]
pub fn tier_rule_specs(
    auth_threshold: u64,
    anon_threshold: u64,
    base_priority: u32,
) -> [RuleSpec; 2] {
    let block = Action::Block {
        response_code: 429,
        response_body_key: RATE_LIMITED_BODY_KEY.to_string(),
    };

    let authenticated = RuleSpec::new(
        AUTH_TIER_RULE,
        base_priority,
        Statement::rate_limit_per_ip(auth_threshold),
        block.clone(),
        "tier.authenticated",
    );

    let anonymous = RuleSpec::new(
        ANON_TIER_RULE,
        base_priority + 1,
        Statement::And(vec![
            Statement::Not(Box::new(Statement::header_starts_with(
                "authorization",
                "Bearer",
            ))),
            Statement::rate_limit_per_ip(anon_threshold),
        ]),
        block,
        "tier.anonymous",
    );

    [authenticated, anonymous]
}
