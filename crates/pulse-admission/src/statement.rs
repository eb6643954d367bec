//! The recursive boolean statement AST.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::counter::RateCounterStore;
use crate::request::RequestView;
use crate::signature::SignatureCatalog;

/// The fixed trailing window for rate-limit statements.
pub const RATE_WINDOW: Duration = Duration::from_secs(300);

/// Which part of the request a byte match inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    /// A named header (matched against its value).
    Header(String),
    /// The request body.
    Body,
    /// The request path.
    Uri,
}

/// Transform applied to the inspected text before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    /// Match against the raw text.
    None,
    /// Lowercase the inspected text first. Patterns should be lowercase.
    Lowercase,
}

/// Where in the inspected text the pattern must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchPosition {
    /// Pattern appears anywhere.
    Contains,
    /// Text begins with the pattern.
    StartsWith,
    /// Text equals the pattern.
    Exact,
}

/// How the rate-limit counter is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateKey {
    /// One counter per client source IP.
    ClientIp,
}

/// Field a size constraint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeField {
    /// The request body length.
    Body,
}

/// Comparison used by a size constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeOperator {
    /// Matches when the field is strictly greater than the threshold.
    GreaterThan,
}

/// A single boolean condition over a request, possibly composed from
/// sub-conditions.
///
/// Leaf statements test the request directly or delegate to a collaborator
/// (signature catalog, rate counter store). Composites short-circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "camelCase")]
pub enum Statement {
    /// Delegates to a managed, versioned catalog of attack signatures.
    SignatureGroup {
        /// Catalog vendor name.
        vendor: String,
        /// Group name within the vendor's catalog.
        group: String,
        /// Sub-rules to skip (known false positives for this deployment).
        excluded_sub_rules: HashSet<String>,
    },
    /// True when the keyed counter exceeds the limit within [`RATE_WINDOW`].
    RateLimit {
        /// Maximum in-window occurrences before the statement matches.
        limit_per_window: u64,
        /// How the counter is keyed.
        key: RateKey,
    },
    /// Substring/prefix/equality test over a request field.
    ByteMatch {
        /// Field to inspect.
        field: MatchField,
        /// Pattern to look for.
        pattern: String,
        /// Transform applied before matching.
        transform: TextTransform,
        /// Required pattern position.
        position: MatchPosition,
    },
    /// Numeric comparison over a field length.
    SizeConstraint {
        /// Field whose size is measured.
        field: SizeField,
        /// The comparison operator.
        operator: SizeOperator,
        /// Threshold in bytes.
        threshold_bytes: u64,
    },
    /// True when every child is true. Short-circuits on the first false child.
    And(Vec<Statement>),
    /// True when any child is true. Short-circuits on the first true child.
    Or(Vec<Statement>),
    /// Inverts its child.
    Not(Box<Statement>),
}

/// Collaborators a statement needs at evaluation time.
///
/// `scope` is the evaluating rule's name; it namespaces rate counters so two
/// rate-limit rules never share a window.
pub struct EvalContext<'a> {
    /// Counter scope for rate-limit statements.
    pub scope: &'a str,
    /// The keyed counter store.
    pub counters: &'a dyn RateCounterStore,
    /// The signature catalog.
    pub catalog: &'a dyn SignatureCatalog,
}

impl Statement {
    /// Convenience constructor for a header prefix match on the raw value.
    #[must_use]
    pub fn header_starts_with(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ByteMatch {
            field: MatchField::Header(name.into()),
            pattern: pattern.into(),
            transform: TextTransform::None,
            position: MatchPosition::StartsWith,
        }
    }

    /// Convenience constructor for a case-insensitive header substring match.
    ///
    /// The pattern is lowercased so the lowercase transform lines up.
    #[must_use]
    pub fn header_contains_lowercase(name: impl Into<String>, pattern: &str) -> Self {
        Self::ByteMatch {
            field: MatchField::Header(name.into()),
            pattern: pattern.to_ascii_lowercase(),
            transform: TextTransform::Lowercase,
            position: MatchPosition::Contains,
        }
    }

    /// Convenience constructor for a body-size ceiling.
    #[must_use]
    pub const fn body_larger_than(threshold_bytes: u64) -> Self {
        Self::SizeConstraint {
            field: SizeField::Body,
            operator: SizeOperator::GreaterThan,
            threshold_bytes,
        }
    }

    /// Convenience constructor for an IP-keyed rate limit.
    #[must_use]
    pub const fn rate_limit_per_ip(limit_per_window: u64) -> Self {
        Self::RateLimit {
            limit_per_window,
            key: RateKey::ClientIp,
        }
    }

    /// Convenience constructor for a signature-group delegation.
    #[must_use]
    pub fn signature_group(
        vendor: impl Into<String>,
        group: impl Into<String>,
        excluded_sub_rules: HashSet<String>,
    ) -> Self {
        Self::SignatureGroup {
            vendor: vendor.into(),
            group: group.into(),
            excluded_sub_rules,
        }
    }

    /// Evaluates this statement against a request.
    ///
    /// Composites short-circuit depth-first. Collaborator failures (counter
    /// store, catalog) are logged and treated as "did not match": a degraded
    /// collaborator must never block traffic or stall the pipeline.
    #[must_use]
    pub fn matches(&self, request: &RequestView, ctx: &EvalContext<'_>) -> bool {
        match self {
            Self::SignatureGroup {
                vendor,
                group,
                excluded_sub_rules,
            } => match ctx.catalog.inspect(vendor, group, excluded_sub_rules, request) {
                Ok(hit) => hit,
                Err(e) => {
                    warn!(scope = ctx.scope, error = %e, "catalog failed, treating as non-match");
                    false
                }
            },
            Self::RateLimit {
                limit_per_window, ..
            } => {
                match ctx
                    .counters
                    .increment_and_read(ctx.scope, request.source_ip(), RATE_WINDOW)
                {
                    Ok(count) => count > *limit_per_window,
                    Err(e) => {
                        warn!(scope = ctx.scope, error = %e, "counter store failed, treating as non-match");
                        false
                    }
                }
            }
            Self::ByteMatch {
                field,
                pattern,
                transform,
                position,
            } => byte_match(request, field, pattern, *transform, *position),
            Self::SizeConstraint {
                field: SizeField::Body,
                operator: SizeOperator::GreaterThan,
                threshold_bytes,
            } => request.body_len() > *threshold_bytes,
            Self::And(children) => children.iter().all(|c| c.matches(request, ctx)),
            Self::Or(children) => children.iter().any(|c| c.matches(request, ctx)),
            Self::Not(child) => !child.matches(request, ctx),
        }
    }

    /// Structural validation, recursing into composites.
    ///
    /// Returns the reason a statement is malformed, if any. The compiler
    /// wraps this into `AdmissionError::MalformedStatement`.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::SignatureGroup { vendor, group, .. } => {
                if vendor.is_empty() {
                    return Err("signature group vendor cannot be empty".to_string());
                }
                if group.is_empty() {
                    return Err("signature group name cannot be empty".to_string());
                }
                Ok(())
            }
            Self::RateLimit {
                limit_per_window, ..
            } => {
                if *limit_per_window == 0 {
                    return Err("rate limit must be at least 1".to_string());
                }
                Ok(())
            }
            Self::ByteMatch { field, pattern, .. } => {
                if pattern.is_empty() {
                    return Err("byte match pattern cannot be empty".to_string());
                }
                if let MatchField::Header(name) = field {
                    if name.is_empty() {
                        return Err("byte match header name cannot be empty".to_string());
                    }
                }
                Ok(())
            }
            Self::SizeConstraint { .. } => Ok(()),
            Self::And(children) | Self::Or(children) => {
                if children.is_empty() {
                    return Err("composite statement needs at least one child".to_string());
                }
                children.iter().try_for_each(Self::validate)
            }
            Self::Not(child) => child.validate(),
        }
    }

    /// Visits every signature-group leaf in the statement.
    pub(crate) fn for_each_signature_group<'a>(
        &'a self,
        f: &mut impl FnMut(&'a str, &'a str),
    ) {
        match self {
            Self::SignatureGroup { vendor, group, .. } => f(vendor, group),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.for_each_signature_group(f);
                }
            }
            Self::Not(child) => child.for_each_signature_group(f),
            _ => {}
        }
    }
}

/// Leaf byte-match evaluation.
fn byte_match(
    request: &RequestView,
    field: &MatchField,
    pattern: &str,
    transform: TextTransform,
    position: MatchPosition,
) -> bool {
    let raw: std::borrow::Cow<'_, str> = match field {
        MatchField::Header(name) => match request.header(name) {
            Some(value) => value.into(),
            // Absent header never matches, whatever the position.
            None => return false,
        },
        MatchField::Body => String::from_utf8_lossy(request.body()),
        MatchField::Uri => request.path().into(),
    };

    let text = match transform {
        TextTransform::None => raw,
        TextTransform::Lowercase => raw.to_ascii_lowercase().into(),
    };

    match position {
        MatchPosition::Contains => text.contains(pattern),
        MatchPosition::StartsWith => text.starts_with(pattern),
        MatchPosition::Exact => text == pattern,
    }
}
