//! Core types shared across the telemetry core
//!
//! This module defines the uniform output unit ([`TelemetryEvent`]) and the
//! connection vocabulary exchanged with the BLE collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying what a [`TelemetryEvent`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryKind {
    Bpm,
    Hrv,
    HrvSummary,
    Spo2,
    Spo2Status,
    Steps,
    Battery,
    Temp,
    BodyTemp,
    Status,
    Log,
    DeviceInfo,
    Model,
    Firmware,
    Hardware,
    Software,
    MacAddr,
    RawData,
}

impl TelemetryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryKind::Bpm => "BPM",
            TelemetryKind::Hrv => "HRV",
            TelemetryKind::HrvSummary => "HRV_SUMMARY",
            TelemetryKind::Spo2 => "SPO2",
            TelemetryKind::Spo2Status => "SPO2_STATUS",
            TelemetryKind::Steps => "STEPS",
            TelemetryKind::Battery => "BATTERY",
            TelemetryKind::Temp => "TEMP",
            TelemetryKind::BodyTemp => "BODY_TEMP",
            TelemetryKind::Status => "STATUS",
            TelemetryKind::Log => "LOG",
            TelemetryKind::DeviceInfo => "DEVICE_INFO",
            TelemetryKind::Model => "MODEL",
            TelemetryKind::Firmware => "FIRMWARE",
            TelemetryKind::Hardware => "HARDWARE",
            TelemetryKind::Software => "SOFTWARE",
            TelemetryKind::MacAddr => "MAC_ADDR",
            TelemetryKind::RawData => "RAW_DATA",
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform output unit delivered to the downstream sink.
///
/// Events carry no timestamp; delivery order is the only ordering guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub kind: TelemetryKind,
    pub value: String,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        Self::new(TelemetryKind::Log, message)
    }
}

/// Logical connection state tracked by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Text reported in STATUS events
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Raw connection status reported by the BLE collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Connecting,
    Connected,
    Disconnected,
    /// Any status value the core does not recognize
    #[serde(other)]
    Unknown,
}

impl DeviceStatus {
    /// Map a raw status to the tracked connection state; unrecognized values
    /// count as disconnected.
    pub fn to_state(self) -> ConnectionState {
        match self {
            DeviceStatus::Connecting => ConnectionState::Connecting,
            DeviceStatus::Connected => ConnectionState::Connected,
            DeviceStatus::Disconnected | DeviceStatus::Unknown => ConnectionState::Disconnected,
        }
    }
}
