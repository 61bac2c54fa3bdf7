//! Device command interface
//!
//! The BLE SDK exposes the wearable's command set; the core only needs four
//! one-way commands. Calls are fire-and-forget: responses come back later as
//! payload callbacks, and an `Err` only means the command could not be issued.

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Typed command interface of the wearable
pub trait DeviceCommands {
    /// Enter heart-rate/HRV capture mode
    fn enter_hrv_mode(&mut self, continuous: bool, one_shot: bool) -> Result<(), TelemetryError>;

    /// Enable or disable a secondary (SpO2) sensor mode
    fn set_spo2_mode(&mut self, enabled: bool, mode: i32) -> Result<(), TelemetryError>;

    /// Request firmware/hardware/software version info
    fn query_device_version(&mut self) -> Result<(), TelemetryError>;

    /// Request the battery level
    fn read_battery_power(&mut self) -> Result<(), TelemetryError>;
}

/// A command as issued to the device, for logging and simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeviceCommand {
    EnterHrvMode { continuous: bool, one_shot: bool },
    SetSpo2Mode { enabled: bool, mode: i32 },
    QueryDeviceVersion,
    ReadBatteryPower,
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::EnterHrvMode {
                continuous,
                one_shot,
            } => write!(f, "enter_hrv_mode({}, {})", continuous, one_shot),
            DeviceCommand::SetSpo2Mode { enabled, mode } => {
                write!(f, "set_spo2_mode({}, {})", enabled, mode)
            }
            DeviceCommand::QueryDeviceVersion => f.write_str("query_device_version()"),
            DeviceCommand::ReadBatteryPower => f.write_str("read_battery_power()"),
        }
    }
}

/// Simulated device that records every issued command.
///
/// Clones share the same log, so a host can keep one clone for inspection
/// while the orchestrator owns another. Commands listed via
/// [`RecordingDevice::reject`] are still recorded but return
/// [`TelemetryError::CommandRejected`].
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    issued: Arc<Mutex<Vec<DeviceCommand>>>,
    rejected: HashSet<DeviceCommand>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the device reject `command` every time it is issued
    pub fn reject(mut self, command: DeviceCommand) -> Self {
        self.rejected.insert(command);
        self
    }

    /// Commands issued so far, in order
    pub fn issued(&self) -> Vec<DeviceCommand> {
        match self.issued.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&mut self, command: DeviceCommand) -> Result<(), TelemetryError> {
        match self.issued.lock() {
            Ok(mut log) => log.push(command),
            Err(poisoned) => poisoned.into_inner().push(command),
        }
        if self.rejected.contains(&command) {
            return Err(TelemetryError::CommandRejected {
                command: command.to_string(),
                reason: "rejected by firmware".to_string(),
            });
        }
        Ok(())
    }
}

impl DeviceCommands for RecordingDevice {
    fn enter_hrv_mode(&mut self, continuous: bool, one_shot: bool) -> Result<(), TelemetryError> {
        self.record(DeviceCommand::EnterHrvMode {
            continuous,
            one_shot,
        })
    }

    fn set_spo2_mode(&mut self, enabled: bool, mode: i32) -> Result<(), TelemetryError> {
        self.record(DeviceCommand::SetSpo2Mode { enabled, mode })
    }

    fn query_device_version(&mut self) -> Result<(), TelemetryError> {
        self.record(DeviceCommand::QueryDeviceVersion)
    }

    fn read_battery_power(&mut self) -> Result<(), TelemetryError> {
        self.record(DeviceCommand::ReadBatteryPower)
    }
}
