//! Error types for breaker admission and configuration

use thiserror::Error;

/// Errors surfaced at the edges of the breaker.
///
/// Recording outcomes and querying state never fail; only the `?`-friendly
/// admission check and configuration validation return these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BreakerError {
    /// Circuit is open, calls are being rejected
    #[error("Circuit '{circuit}' is open (opened at {opened_at}, retry in {retry_after_secs:.3}s)")]
    Open {
        circuit: String,
        /// Monotonic clock reading when the cooldown started
        opened_at: f64,
        retry_after_secs: f64,
    },
    /// A configuration value is out of range
    #[error("Invalid breaker configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl BreakerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BreakerError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// True for [`BreakerError::Open`]
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }
}
