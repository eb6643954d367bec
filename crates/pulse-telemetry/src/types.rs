//! Core telemetry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};

/// A validated counter/sample series name.
///
/// Names are lowercase identifiers with `.` as a namespace separator,
/// e.g. `decision.block` or `backend.latency_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterName(String);

impl CounterName {
    /// Maximum allowed length for counter names.
    pub const MAX_LENGTH: usize = 128;

    /// Creates a validated counter name.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidName` if the name is empty, too long,
    /// or contains characters outside `[a-z0-9_.]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(TelemetryError::InvalidName {
                name,
                reason: "name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(TelemetryError::InvalidName {
                name,
                reason: format!("name exceeds {} characters", Self::MAX_LENGTH),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
        {
            return Err(TelemetryError::InvalidName {
                name,
                reason: "name must match [a-z0-9_.]".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CounterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single recorded value with its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the value was recorded.
    pub at: DateTime<Utc>,
    /// The recorded value.
    pub value: f64,
}

impl Sample {
    /// Creates a sample at an explicit timestamp.
    #[must_use]
    pub const fn new(at: DateTime<Utc>, value: f64) -> Self {
        Self { at, value }
    }

    /// Creates a sample timestamped now.
    #[must_use]
    pub fn now(value: f64) -> Self {
        Self {
            at: Utc::now(),
            value,
        }
    }
}
