//! Error types for the alarm subsystem.

use thiserror::Error;

/// Errors that can occur in alarm operations.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// An alarm rule failed validation.
    #[error("invalid alarm rule: {reason}")]
    InvalidRule {
        /// Why the rule was rejected.
        reason: String,
    },

    /// A notification channel failed to deliver an event.
    #[error("delivery through channel '{channel}' failed: {reason}")]
    DeliveryFailed {
        /// Name of the failing channel.
        channel: String,
        /// Why delivery failed.
        reason: String,
    },
}

/// Result type for alarm operations.
pub type Result<T> = std::result::Result<T, AlarmError>;
