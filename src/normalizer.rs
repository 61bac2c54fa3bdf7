//! Telemetry normalization
//!
//! This module maps each collaborator payload to zero or more uniform
//! [`TelemetryEvent`]s:
//! - Absent fields are replaced by fixed placeholders ("0", "--", "Unknown")
//! - Non-readings (non-positive SpO2, zero steps) are suppressed
//! - Heart-rate intervals feed the session's [`IntervalBuffer`] for HRV
//!
//! Malformed input never fails; it degrades to fewer events.

use crate::config::ZeroStepPolicy;
use crate::interval::{IntervalBuffer, IntervalSample};
use crate::payload::RawPayload;
use crate::types::{TelemetryEvent, TelemetryKind};
use serde_json::Value;
use tracing::debug;

const NO_READING: &str = "--";
const UNKNOWN: &str = "Unknown";

/// Normalizer for converting collaborator payloads into telemetry events
#[derive(Debug, Clone, Copy)]
pub struct TelemetryNormalizer {
    zero_steps: ZeroStepPolicy,
}

impl Default for TelemetryNormalizer {
    fn default() -> Self {
        Self::new(ZeroStepPolicy::Suppress)
    }
}

impl TelemetryNormalizer {
    pub fn new(zero_steps: ZeroStepPolicy) -> Self {
        Self { zero_steps }
    }

    /// Normalize one payload; intervals on heart-rate payloads go into `buffer`
    pub fn normalize(
        &self,
        payload: &RawPayload,
        buffer: &mut IntervalBuffer,
    ) -> Vec<TelemetryEvent> {
        let mut events = Vec::new();

        match payload {
            RawPayload::HeartRate { data } => normalize_heart_rate(data, buffer, &mut events),

            RawPayload::SetSpo2Result { succeeded } => {
                let (outcome, status) = if *succeeded {
                    ("accepted", "Active")
                } else {
                    ("rejected", "Failed")
                };
                events.push(TelemetryEvent::log(format!("SetSPO2: {}", outcome)));
                events.push(TelemetryEvent::new(TelemetryKind::Spo2Status, status));
            }

            RawPayload::Spo2Value { value } | RawPayload::MaxOxygen { value } => {
                if *value > 0 {
                    events.push(TelemetryEvent::new(TelemetryKind::Spo2, value.to_string()));
                }
            }

            RawPayload::Spo2Map { data } => {
                events.push(TelemetryEvent::new(
                    TelemetryKind::Spo2,
                    first_value_text(data).unwrap_or_else(|| NO_READING.to_string()),
                ));
            }

            RawPayload::Spo2Status { status } => {
                debug!(status, "spo2 status query result");
            }

            RawPayload::StepFrequency { data } => {
                debug!(payload = %data, "step frequency");
                let steps = field_text(data, "steps").unwrap_or_else(|| "0".to_string());
                if steps != "0" || self.zero_steps == ZeroStepPolicy::Emit {
                    events.push(TelemetryEvent::new(TelemetryKind::Steps, steps));
                }
            }

            RawPayload::Battery { percent } => {
                events.push(TelemetryEvent::new(TelemetryKind::Battery, percent.to_string()));
            }

            RawPayload::SkinTemperature { data } => {
                events.push(TelemetryEvent::new(
                    TelemetryKind::Temp,
                    first_value_text(data).unwrap_or_else(|| NO_READING.to_string()),
                ));
            }

            RawPayload::BodyTemperature { data } => {
                events.push(TelemetryEvent::new(
                    TelemetryKind::BodyTemp,
                    first_value_text(data).unwrap_or_else(|| NO_READING.to_string()),
                ));
            }

            RawPayload::HrvSummary { data } => {
                if let Some(hrv) = field_text(data, "HRV").or_else(|| field_text(data, "hrv")) {
                    events.push(TelemetryEvent::new(TelemetryKind::HrvSummary, hrv));
                }
            }

            RawPayload::DeviceInfo { info } => {
                if let Some(text) = info.as_ref().and_then(value_text) {
                    events.push(TelemetryEvent::new(TelemetryKind::DeviceInfo, text));
                }
            }

            RawPayload::Model { value } => {
                push_or_unknown(&mut events, TelemetryKind::Model, value)
            }
            RawPayload::Firmware { value } => {
                push_or_unknown(&mut events, TelemetryKind::Firmware, value)
            }
            RawPayload::Hardware { value } => {
                push_or_unknown(&mut events, TelemetryKind::Hardware, value)
            }
            RawPayload::Software { value } => {
                push_or_unknown(&mut events, TelemetryKind::Software, value)
            }

            RawPayload::SerialNumber { value } => events.push(TelemetryEvent::new(
                TelemetryKind::DeviceInfo,
                format!("Serial: {}", value.as_deref().unwrap_or(UNKNOWN)),
            )),
            RawPayload::Manufacturer { value } => events.push(TelemetryEvent::new(
                TelemetryKind::DeviceInfo,
                format!("Manufacturer: {}", value.as_deref().unwrap_or(UNKNOWN)),
            )),

            RawPayload::MacAddress { data } => {
                events.push(TelemetryEvent::new(
                    TelemetryKind::MacAddr,
                    value_text(data).unwrap_or_else(|| UNKNOWN.to_string()),
                ));
            }

            RawPayload::SystemData { bytes } => {
                if let Some(bytes) = bytes {
                    events.push(TelemetryEvent::new(TelemetryKind::RawData, hex_pairs(bytes)));
                }
            }

            RawPayload::ConnectLog { message } => {
                if let Some(message) = message {
                    debug!(target: "armband_telemetry::sdk", "{}", message);
                }
            }
        }

        events
    }
}

/// BPM always; HRV when the payload carries intervals and the buffer is ready;
/// SPO2 when the map has an `SPO2` key.
fn normalize_heart_rate(
    data: &Value,
    buffer: &mut IntervalBuffer,
    events: &mut Vec<TelemetryEvent>,
) {
    debug!(payload = %data, "heart rate");

    let bpm = field_text(data, "heartRate").unwrap_or_else(|| "0".to_string());
    events.push(TelemetryEvent::new(TelemetryKind::Bpm, bpm));

    // Intervals feed the session window
    if let Some(intervals) = data.get("interval").and_then(Value::as_array) {
        if !intervals.is_empty() {
            let samples: Vec<IntervalSample> =
                intervals.iter().filter_map(interval_sample).collect();
            buffer.append(&samples);

            if buffer.is_ready() {
                let sdnn = buffer.compute_hrv();
                debug!(sdnn, buffered = buffer.len(), "hrv updated");
                events.push(TelemetryEvent::new(TelemetryKind::Hrv, sdnn.to_string()));
            }
        }
    }

    // Some firmware piggybacks SpO2 on the heart-rate map
    if let Some(spo2) = data.as_object().and_then(|map| map.get("SPO2")) {
        let spo2 = value_text(spo2).unwrap_or_else(|| NO_READING.to_string());
        events.push(TelemetryEvent::log(format!("SPO2 (map): {}", spo2)));
        events.push(TelemetryEvent::new(TelemetryKind::Spo2, spo2));
    }
}

fn push_or_unknown(events: &mut Vec<TelemetryEvent>, kind: TelemetryKind, value: &Option<String>) {
    events.push(TelemetryEvent::new(
        kind,
        value.clone().unwrap_or_else(|| UNKNOWN.to_string()),
    ));
}

/// Text of a JSON value as the host would print it; null is absent
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn field_text(data: &Value, key: &str) -> Option<String> {
    data.as_object()
        .and_then(|map| map.get(key))
        .and_then(value_text)
}

fn first_value_text(data: &Value) -> Option<String> {
    data.as_object()
        .and_then(|map| map.values().next())
        .and_then(value_text)
}

/// Integers pass through, floats truncate, numeric strings parse; anything
/// else is skipped
fn interval_sample(value: &Value) -> Option<IntervalSample> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|v| IntervalSample::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Upper-case two-digit hex pairs separated by single spaces
fn hex_pairs(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn event(kind: TelemetryKind, value: &str) -> TelemetryEvent {
        TelemetryEvent::new(kind, value)
    }

    fn normalize(payload: RawPayload) -> Vec<TelemetryEvent> {
        let mut buffer = IntervalBuffer::default();
        TelemetryNormalizer::default().normalize(&payload, &mut buffer)
    }

    #[test]
    fn test_heart_rate_with_intervals_emits_bpm_then_hrv() {
        let mut buffer = IntervalBuffer::default();
        let payload = RawPayload::HeartRate {
            data: json!({"heartRate": "72", "interval": [800, 810, 790, 805, 795]}),
        };

        let events = TelemetryNormalizer::default().normalize(&payload, &mut buffer);

        assert_eq!(
            events,
            vec![event(TelemetryKind::Bpm, "72"), event(TelemetryKind::Hrv, "7")]
        );
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_heart_rate_below_threshold_has_no_hrv() {
        let events = normalize(RawPayload::HeartRate {
            data: json!({"heartRate": 65, "interval": [800, 810]}),
        });
        assert_eq!(events, vec![event(TelemetryKind::Bpm, "65")]);
    }

    #[test]
    fn test_heart_rate_accumulates_across_payloads() {
        let normalizer = TelemetryNormalizer::default();
        let mut buffer = IntervalBuffer::default();

        let first = RawPayload::HeartRate {
            data: json!({"heartRate": 70, "interval": [800, 810, 790]}),
        };
        let second = RawPayload::HeartRate {
            data: json!({"heartRate": 71, "interval": ["805", 795.9, null, true]}),
        };

        assert_eq!(normalizer.normalize(&first, &mut buffer).len(), 1);
        let events = normalizer.normalize(&second, &mut buffer);
        assert_eq!(
            events,
            vec![event(TelemetryKind::Bpm, "71"), event(TelemetryKind::Hrv, "7")]
        );
    }

    #[test]
    fn test_heart_rate_defaults_bpm_to_zero() {
        assert_eq!(
            normalize(RawPayload::HeartRate { data: json!({}) }),
            vec![event(TelemetryKind::Bpm, "0")]
        );
        assert_eq!(
            normalize(RawPayload::HeartRate { data: Value::Null }),
            vec![event(TelemetryKind::Bpm, "0")]
        );
    }

    #[test]
    fn test_heart_rate_spo2_fallback() {
        let events = normalize(RawPayload::HeartRate {
            data: json!({"heartRate": 80, "SPO2": 97}),
        });
        assert_eq!(
            events,
            vec![
                event(TelemetryKind::Bpm, "80"),
                event(TelemetryKind::Log, "SPO2 (map): 97"),
                event(TelemetryKind::Spo2, "97"),
            ]
        );

        let events = normalize(RawPayload::HeartRate {
            data: json!({"heartRate": 80, "SPO2": null}),
        });
        assert_eq!(events[2], event(TelemetryKind::Spo2, "--"));
    }

    #[test]
    fn test_non_positive_spo2_is_suppressed() {
        assert!(normalize(RawPayload::Spo2Value { value: 0 }).is_empty());
        assert!(normalize(RawPayload::MaxOxygen { value: -1 }).is_empty());
        assert_eq!(
            normalize(RawPayload::Spo2Value { value: 98 }),
            vec![event(TelemetryKind::Spo2, "98")]
        );
    }

    #[test]
    fn test_set_spo2_result_reports_status() {
        assert_eq!(
            normalize(RawPayload::SetSpo2Result { succeeded: false }),
            vec![
                event(TelemetryKind::Log, "SetSPO2: rejected"),
                event(TelemetryKind::Spo2Status, "Failed"),
            ]
        );
    }

    #[test]
    fn test_zero_steps_suppressed_by_default() {
        assert!(normalize(RawPayload::StepFrequency { data: json!({"steps": "0"}) }).is_empty());
        assert!(normalize(RawPayload::StepFrequency { data: json!({"steps": 0}) }).is_empty());
        assert!(normalize(RawPayload::StepFrequency { data: json!({}) }).is_empty());
        assert_eq!(
            normalize(RawPayload::StepFrequency { data: json!({"steps": "112"}) }),
            vec![event(TelemetryKind::Steps, "112")]
        );
    }

    #[test]
    fn test_zero_steps_emitted_when_configured() {
        let mut buffer = IntervalBuffer::default();
        let events = TelemetryNormalizer::new(ZeroStepPolicy::Emit).normalize(
            &RawPayload::StepFrequency {
                data: json!({"steps": 0}),
            },
            &mut buffer,
        );
        assert_eq!(events, vec![event(TelemetryKind::Steps, "0")]);
    }

    #[test]
    fn test_temperature_uses_first_value_or_placeholder() {
        assert_eq!(
            normalize(RawPayload::SkinTemperature {
                data: json!({"skin": 33.5, "ambient": 21}),
            }),
            vec![event(TelemetryKind::Temp, "33.5")]
        );
        assert_eq!(
            normalize(RawPayload::BodyTemperature { data: Value::Null }),
            vec![event(TelemetryKind::BodyTemp, "--")]
        );
    }

    #[test]
    fn test_hrv_summary_key_variants() {
        assert_eq!(
            normalize(RawPayload::HrvSummary { data: json!({"hrv": 41}) }),
            vec![event(TelemetryKind::HrvSummary, "41")]
        );
        assert!(normalize(RawPayload::HrvSummary { data: json!({"rmssd": 41}) }).is_empty());
    }

    #[test]
    fn test_device_strings_default_to_unknown() {
        assert_eq!(
            normalize(RawPayload::Model { value: None }),
            vec![event(TelemetryKind::Model, "Unknown")]
        );
        assert_eq!(
            normalize(RawPayload::Firmware {
                value: Some("1.4.2".to_string())
            }),
            vec![event(TelemetryKind::Firmware, "1.4.2")]
        );
        assert_eq!(
            normalize(RawPayload::MacAddress { data: Value::Null }),
            vec![event(TelemetryKind::MacAddr, "Unknown")]
        );
        assert_eq!(
            normalize(RawPayload::SerialNumber {
                value: Some("AB-1".to_string())
            }),
            vec![event(TelemetryKind::DeviceInfo, "Serial: AB-1")]
        );
    }

    #[test]
    fn test_system_data_rendered_as_hex_pairs() {
        assert_eq!(
            normalize(RawPayload::SystemData {
                bytes: Some(vec![0x00, 0x0a, 0xff, 0x42])
            }),
            vec![event(TelemetryKind::RawData, "00 0A FF 42")]
        );
        assert!(normalize(RawPayload::SystemData { bytes: None }).is_empty());
    }

    #[test]
    fn test_silent_payloads() {
        assert!(normalize(RawPayload::Spo2Status { status: true }).is_empty());
        assert!(normalize(RawPayload::ConnectLog {
            message: Some("gatt ready".to_string())
        })
        .is_empty());
        assert!(normalize(RawPayload::DeviceInfo { info: None }).is_empty());
    }
}
