//! Error types for telemetry processing.
//!
//! All errors implement the `std::error::Error` trait and carry enough context
//! to log a useful diagnostic. Decode-level errors never reach the end user:
//! the router logs and counts them, then carries on with the next unit.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: checksum mismatches and malformed fields or frames
//! - **Framing Errors**: a partial protocol unit outgrew its buffer bound
//! - **Transport Errors**: socket-level failures that drive the reconnect cycle
//! - **Configuration Errors**: invalid thresholds, ladders or history limits
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use bridgewatch::TelemetryError;
//!
//! let error = TelemetryError::transport_failed("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Checksum mismatch: computed {expected:02X}, sentence carried {found:02X}")]
    ChecksumMismatch { expected: u8, found: u8 },

    #[error("Format error in {context}: {details}")]
    Format { context: String, details: String },

    #[error("Framing buffer exceeded {limit} bytes without a complete unit")]
    FramingOverflow { limit: usize },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Invalid threshold for {key}: {reason}")]
    Threshold { key: String, reason: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Transport { .. } => true,
            TelemetryError::Io(_) => true,
            TelemetryError::ChecksumMismatch { .. } => false,
            TelemetryError::Format { .. } => false,
            TelemetryError::FramingOverflow { .. } => false,
            TelemetryError::ReconnectExhausted { .. } => false,
            TelemetryError::Config { .. } => false,
            TelemetryError::Threshold { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::ChecksumMismatch { .. } => vec![
                "Check the instrument bus wiring for noise",
                "Verify the gateway baud rate matches the talker",
            ],
            TelemetryError::Format { .. } => vec![
                "Check the talker firmware emits standard sentences",
                "Enable trace logging to inspect the offending field",
            ],
            TelemetryError::FramingOverflow { .. } => vec![
                "Verify the endpoint speaks the configured protocol",
                "Increase the framing buffer bound if units are unusually long",
            ],
            TelemetryError::Transport { .. } | TelemetryError::Io(_) => vec![
                "Ensure the gateway is powered and on the network",
                "Check the configured host and port",
                "Wait for the automatic reconnect",
            ],
            TelemetryError::ReconnectExhausted { .. } => vec![
                "Check the gateway is reachable",
                "Reset the connection once the network is back",
                "Raise the maximum attempt count",
            ],
            TelemetryError::Config { .. } => vec![
                "Review the configuration file against the documented defaults",
                "Check numeric ranges are positive and finite",
            ],
            TelemetryError::Threshold { .. } => vec![
                "Check critical and warning levels are ordered for the direction",
                "Use a non-negative hysteresis",
            ],
        }
    }

    /// Helper constructor for transport failures.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport failures with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for field and frame format errors.
    pub fn format(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Format { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TelemetryError::Config { reason: reason.into() }
    }

    /// Helper constructor for threshold validation errors.
    pub fn threshold(key: impl Into<String>, reason: impl Into<String>) -> Self {
        TelemetryError::Threshold { key: key.into(), reason: reason.into() }
    }
}
