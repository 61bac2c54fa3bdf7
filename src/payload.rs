//! Inbound collaborator payloads
//!
//! The BLE SDK reports telemetry through a set of discrete callbacks, most of
//! which carry loosely typed maps. [`RawPayload`] names each callback and keeps
//! the loosely typed parts as JSON values so the normalizer can apply its
//! default and suppression rules field by field.
//!
//! Wire form is internally tagged on `callback`:
//!
//! ```json
//! {"callback": "heart_rate", "data": {"heartRate": 72, "interval": [800, 810]}}
//! {"callback": "battery", "percent": 87}
//! ```

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One callback delivered by the BLE collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum RawPayload {
    /// Real-time heart rate map: `heartRate`, optional `interval` list and `SPO2`
    HeartRate {
        #[serde(default)]
        data: Value,
    },
    /// Result of a set-SpO2-mode command
    SetSpo2Result { succeeded: bool },
    /// Raw integer SpO2 reading
    Spo2Value { value: i64 },
    /// SpO2 reading delivered as a map
    Spo2Map {
        #[serde(default)]
        data: Value,
    },
    /// Max-oxygen result
    MaxOxygen { value: i64 },
    /// Result of a get-SpO2-status query
    Spo2Status { status: bool },
    /// Real-time step frequency map with a `steps` field
    StepFrequency {
        #[serde(default)]
        data: Value,
    },
    /// Battery percentage
    Battery { percent: i64 },
    SkinTemperature {
        #[serde(default)]
        data: Value,
    },
    BodyTemperature {
        #[serde(default)]
        data: Value,
    },
    /// Device-computed HRV summary map (`HRV` or `hrv`)
    HrvSummary {
        #[serde(default)]
        data: Value,
    },
    DeviceInfo {
        #[serde(default)]
        info: Option<Value>,
    },
    Model {
        #[serde(default)]
        value: Option<String>,
    },
    Firmware {
        #[serde(default)]
        value: Option<String>,
    },
    Hardware {
        #[serde(default)]
        value: Option<String>,
    },
    Software {
        #[serde(default)]
        value: Option<String>,
    },
    SerialNumber {
        #[serde(default)]
        value: Option<String>,
    },
    Manufacturer {
        #[serde(default)]
        value: Option<String>,
    },
    MacAddress {
        #[serde(default)]
        data: Value,
    },
    /// Raw system bytes
    SystemData {
        #[serde(default)]
        bytes: Option<Vec<u8>>,
    },
    /// Connection diagnostic text from the SDK
    ConnectLog {
        #[serde(default)]
        message: Option<String>,
    },
}

impl RawPayload {
    /// Parse a single payload, failing on unknown callbacks or type mismatches
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Lenient conversion used on the live path: anything that does not match a
    /// known callback shape is "no data" rather than an error.
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::debug!(error = %e, "dropping unrecognized payload");
                None
            }
        }
    }

    /// Callback name as it appears on the wire
    pub fn callback_name(&self) -> &'static str {
        match self {
            RawPayload::HeartRate { .. } => "heart_rate",
            RawPayload::SetSpo2Result { .. } => "set_spo2_result",
            RawPayload::Spo2Value { .. } => "spo2_value",
            RawPayload::Spo2Map { .. } => "spo2_map",
            RawPayload::MaxOxygen { .. } => "max_oxygen",
            RawPayload::Spo2Status { .. } => "spo2_status",
            RawPayload::StepFrequency { .. } => "step_frequency",
            RawPayload::Battery { .. } => "battery",
            RawPayload::SkinTemperature { .. } => "skin_temperature",
            RawPayload::BodyTemperature { .. } => "body_temperature",
            RawPayload::HrvSummary { .. } => "hrv_summary",
            RawPayload::DeviceInfo { .. } => "device_info",
            RawPayload::Model { .. } => "model",
            RawPayload::Firmware { .. } => "firmware",
            RawPayload::Hardware { .. } => "hardware",
            RawPayload::Software { .. } => "software",
            RawPayload::SerialNumber { .. } => "serial_number",
            RawPayload::Manufacturer { .. } => "manufacturer",
            RawPayload::MacAddress { .. } => "mac_address",
            RawPayload::SystemData { .. } => "system_data",
            RawPayload::ConnectLog { .. } => "connect_log",
        }
    }
}
