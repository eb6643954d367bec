//! Compilation of rule specifications into an immutable rule table.

use std::collections::HashSet;

use pulse_telemetry::CounterName;
use tracing::debug;

use crate::error::{AdmissionError, Result};
use crate::rule::{Rule, RuleSpec, RuleTable};
use crate::signature::SignatureCatalog;

/// Compiles an unordered list of rule specifications into a [`RuleTable`].
///
/// Validation is atomic: any malformed specification fails the whole
/// compilation and no table is produced, so invalid configuration is a
/// deploy-time error, never a runtime one. Rules are returned sorted by
/// ascending priority; insertion order never matters.
///
/// # Errors
///
/// - [`AdmissionError::DuplicatePriority`] naming both colliding rules.
/// - [`AdmissionError::InvalidRule`] for empty or duplicate names and
///   invalid telemetry tags.
/// - [`AdmissionError::MalformedStatement`] for structurally invalid
///   statements.
pub fn compile(specs: Vec<RuleSpec>) -> Result<RuleTable> {
    let mut rules = Vec::with_capacity(specs.len());
    let mut seen_names: HashSet<String> = HashSet::new();

    for spec in specs {
        if spec.name.is_empty() {
            return Err(AdmissionError::InvalidRule {
                rule: spec.name,
                reason: "rule name cannot be empty".to_string(),
            });
        }

        if !seen_names.insert(spec.name.clone()) {
            return Err(AdmissionError::InvalidRule {
                rule: spec.name,
                reason: "rule name is not unique".to_string(),
            });
        }

        spec.statement
            .validate()
            .map_err(|reason| AdmissionError::MalformedStatement {
                rule: spec.name.clone(),
                reason,
            })?;

        let telemetry_tag =
            CounterName::new(&spec.telemetry_tag).map_err(|e| AdmissionError::InvalidRule {
                rule: spec.name.clone(),
                reason: format!("invalid telemetry tag: {e}"),
            })?;

        rules.push(Rule {
            name: spec.name,
            priority: spec.priority,
            statement: spec.statement,
            action: spec.action,
            telemetry_tag,
        });
    }

    rules.sort_by_key(Rule::priority);

    for pair in rules.windows(2) {
        if pair[0].priority == pair[1].priority {
            return Err(AdmissionError::DuplicatePriority {
                priority: pair[0].priority,
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }

    debug!(rules = rules.len(), "compiled rule table");
    Ok(RuleTable { rules })
}

/// Like [`compile`], but additionally resolves every signature-group
/// reference against a catalog.
///
/// # Errors
///
/// All of [`compile`]'s errors, plus [`AdmissionError::MalformedStatement`]
/// when a statement references a vendor/group the catalog does not know.
pub fn compile_checked(specs: Vec<RuleSpec>, catalog: &dyn SignatureCatalog) -> Result<RuleTable> {
    let table = compile(specs)?;

    for rule in table.iter() {
        let mut unknown: Option<(String, String)> = None;
        rule.statement().for_each_signature_group(&mut |vendor, group| {
            if unknown.is_none() && !catalog.contains(vendor, group) {
                unknown = Some((vendor.to_string(), group.to_string()));
            }
        });

        if let Some((vendor, group)) = unknown {
            return Err(AdmissionError::MalformedStatement {
                rule: rule.name().to_string(),
                reason: format!("unknown signature group {vendor}/{group}"),
            });
        }
    }

    Ok(table)
}
