//! Error types for the admission engine.

use thiserror::Error;

/// Errors that can occur when compiling or running the admission engine.
///
/// Compile-time variants (`DuplicatePriority`, `MalformedStatement`,
/// `InvalidRule`) are fatal and surface before the engine sees traffic.
/// Collaborator variants (`CounterUnavailable`, `Catalog`) occur at
/// evaluation time and are downgraded to "statement did not match" by the
/// evaluator; they never fail a request.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Two rule specifications share a priority.
    #[error("duplicate priority {priority}: rules '{first}' and '{second}'")]
    DuplicatePriority {
        /// The colliding priority value.
        priority: u32,
        /// Name of the first rule at this priority.
        first: String,
        /// Name of the second rule at this priority.
        second: String,
    },

    /// A rule's statement failed structural validation.
    #[error("malformed statement in rule '{rule}': {reason}")]
    MalformedStatement {
        /// Name of the offending rule.
        rule: String,
        /// What was wrong with the statement.
        reason: String,
    },

    /// A rule specification is invalid outside of its statement.
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule {
        /// Name of the offending rule (may be empty when the name itself is invalid).
        rule: String,
        /// Why the rule was rejected.
        reason: String,
    },

    /// The rate counter store could not serve an increment-and-read.
    #[error("rate counter unavailable for scope '{scope}': {reason}")]
    CounterUnavailable {
        /// Counter scope (rule name) that was being read.
        scope: String,
        /// Why the store failed.
        reason: String,
    },

    /// The signature catalog could not inspect a request.
    #[error("signature catalog error for {vendor}/{group}: {reason}")]
    Catalog {
        /// Catalog vendor name.
        vendor: String,
        /// Signature group name.
        group: String,
        /// Why the inspection failed.
        reason: String,
    },
}

/// Result type for admission operations.
pub type Result<T> = std::result::Result<T, AdmissionError>;
