//! Armband Telemetry - orchestration core for BLE armband wearables
//!
//! Reacts to a wearable's connection-state transitions, drives timed
//! device-mode command sequences, and keeps a bounded window of beat-to-beat
//! intervals from which heart-rate variability is derived in real time.
//!
//! ## Data flow
//!
//! - **Payloads**: BLE SDK callback → [`RawPayload`] → [`TelemetryNormalizer`]
//!   → [`TelemetryEvent`] sink
//! - **Connection**: status → [`ConnectionTracker`] → startup and mode-probe
//!   sequencers → [`DeviceCommands`]
//! - **HRV**: heart-rate intervals → [`IntervalBuffer`] → SDNN → HRV event
//!
//! [`Orchestrator`] holds all of this as one single-writer core;
//! [`runtime::spawn`] hosts it as a tokio actor with cancellable timers.

pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod interval;
pub mod normalizer;
pub mod orchestrator;
pub mod payload;
pub mod runtime;
pub mod sequencer;
pub mod types;

pub use config::{OrchestratorConfig, ZeroStepPolicy};
pub use connection::ConnectionTracker;
pub use device::{DeviceCommand, DeviceCommands, RecordingDevice};
pub use error::TelemetryError;
pub use interval::IntervalBuffer;
pub use normalizer::TelemetryNormalizer;
pub use orchestrator::{Effects, Input, Orchestrator};
pub use payload::RawPayload;
pub use runtime::OrchestratorHandle;
pub use types::{ConnectionState, DeviceStatus, TelemetryEvent, TelemetryKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
