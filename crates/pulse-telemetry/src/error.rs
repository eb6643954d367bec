//! Error types for the telemetry sink.

use thiserror::Error;

/// Errors that can occur in telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A counter name failed validation.
    #[error("invalid counter name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },
}

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_name_display() {
        let err = TelemetryError::InvalidName {
            name: "Bad Name".into(),
            reason: "contains whitespace".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Bad Name"));
        assert!(msg.contains("whitespace"));
    }
}
