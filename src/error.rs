//! Error types for the armband telemetry core

use thiserror::Error;

/// Errors that can occur while orchestrating a wearable session
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Device rejected {command}: {reason}")]
    CommandRejected { command: String, reason: String },

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Orchestrator channel closed")]
    ChannelClosed,
}
