//! Orchestrator configuration
//!
//! Every timing and policy constant used by the sequencers and the interval
//! buffer lives here so hosts can tune them without touching the state
//! machines. Defaults reproduce the reference device behavior.

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of the beat-to-beat interval buffer
pub const DEFAULT_INTERVAL_CAPACITY: usize = 50;

/// Default minimum number of buffered intervals before HRV is reported
pub const DEFAULT_HRV_MIN_SAMPLES: usize = 5;

/// How a step-frequency reading of exactly "0" is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroStepPolicy {
    /// Treat "0" as "no new data" and emit nothing
    Suppress,
    /// Forward "0" like any other reading
    Emit,
}

/// Timing and policy knobs for a wearable session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Delay between entering Connected and the startup commands (ms)
    pub startup_settle_ms: u64,
    /// Delay between entering Connected and the first probe tick (ms)
    pub probe_trigger_ms: u64,
    /// Interval between probe ticks (ms)
    pub probe_interval_ms: u64,
    /// Delay between the terminal probe tick and the restorative command (ms)
    pub restore_delay_ms: u64,
    /// Secondary sensor modes visited by the probe, in order
    pub probe_modes: Vec<i32>,
    /// Maximum number of buffered intervals
    pub interval_capacity: usize,
    /// Minimum buffered intervals before an HRV event is emitted
    pub hrv_min_samples: usize,
    /// Treatment of zero step-frequency readings
    pub zero_steps: ZeroStepPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            startup_settle_ms: 500,
            probe_trigger_ms: 3000,
            probe_interval_ms: 4000,
            restore_delay_ms: 1000,
            probe_modes: vec![0, 1, 2],
            interval_capacity: DEFAULT_INTERVAL_CAPACITY,
            hrv_min_samples: DEFAULT_HRV_MIN_SAMPLES,
            zero_steps: ZeroStepPolicy::Suppress,
        }
    }
}

impl OrchestratorConfig {
    pub fn startup_settle(&self) -> Duration {
        Duration::from_millis(self.startup_settle_ms)
    }

    pub fn probe_trigger(&self) -> Duration {
        Duration::from_millis(self.probe_trigger_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }

    /// Check internal consistency of the configuration
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.interval_capacity == 0 {
            return Err(TelemetryError::InvalidConfig(
                "interval_capacity must be at least 1".to_string(),
            ));
        }
        if self.hrv_min_samples == 0 {
            return Err(TelemetryError::InvalidConfig(
                "hrv_min_samples must be at least 1".to_string(),
            ));
        }
        if self.hrv_min_samples > self.interval_capacity {
            return Err(TelemetryError::InvalidConfig(format!(
                "hrv_min_samples ({}) exceeds interval_capacity ({})",
                self.hrv_min_samples, self.interval_capacity
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
