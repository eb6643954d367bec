//! Delivery channels for fired alarm events.

use tracing::warn;

use crate::error::Result;
use crate::types::AlarmEvent;

/// A destination for fired alarm events.
///
/// Delivery is best-effort: the scheduler logs failures and retries the
/// event on the next evaluation cycle; a broken channel never affects
/// admission decisions.
pub trait AlarmChannel: Send + Sync + std::fmt::Debug {
    /// Human-readable channel name, used in logs.
    fn name(&self) -> &str;

    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::DeliveryFailed` when the event could not be
    /// delivered; the caller decides whether to retry.
    fn deliver(&self, event: &AlarmEvent) -> Result<()>;
}

/// Channel that emits events into the process log.
///
/// The default channel; serializes the event as JSON into a `warn!` record
/// so quiet deployments still surface alarms somewhere.
#[derive(Debug, Default)]
pub struct TracingChannel;

impl TracingChannel {
    /// Creates the channel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AlarmChannel for TracingChannel {
    fn name(&self) -> &str {
        "tracing"
    }

    fn deliver(&self, event: &AlarmEvent) -> Result<()> {
        let payload = serde_json::to_string(event).unwrap_or_else(|_| event.rule_name.clone());
        warn!(
            rule = %event.rule_name,
            value = event.value,
            threshold = event.threshold,
            severity = %event.severity,
            payload = %payload,
            "alarm"
        );
        Ok(())
    }
}
