//! Timed device-command sequences
//!
//! Both sequencers are plain state machines: they issue commands when told a
//! timer fired and report the next timer they want. Scheduling and
//! cancellation belong to the orchestrator that owns them.
//!
//! - [`StartupSequencer`]: once per session, enables HR/HRV capture and asks
//!   for version and battery info.
//! - [`ModeProbeSequencer`]: walks the device through each configured
//!   secondary-sensor mode, one per tick, then restores HR/HRV mode.

use crate::config::OrchestratorConfig;
use crate::device::DeviceCommands;
use crate::types::TelemetryEvent;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timers a session can have outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Startup,
    ProbeTick,
    ProbeRestore,
}

/// Issues the startup commands for a freshly connected device
pub struct StartupSequencer;

impl StartupSequencer {
    /// Run the startup commands in order; returns how many failed.
    ///
    /// A failing command is logged and skipped so the remaining ones still go
    /// out. Nothing is retried.
    pub fn run<D: DeviceCommands + ?Sized>(device: &mut D) -> usize {
        info!("enabling continuous heart rate and HRV capture");
        let results = [
            ("enter_hrv_mode", device.enter_hrv_mode(true, false)),
            ("query_device_version", device.query_device_version()),
            ("read_battery_power", device.read_battery_power()),
        ];

        let mut failures = 0;
        for (command, result) in results {
            if let Err(e) = result {
                warn!(command, error = %e, "startup command failed");
                failures += 1;
            }
        }
        failures
    }
}

/// Probe lifecycle: `Idle -> Probing(step) -> Restoring -> Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Probing { step: usize },
    Restoring,
    Done,
}

/// Result of a probe tick
#[derive(Debug, Default, PartialEq)]
pub struct ProbeTick {
    pub events: Vec<TelemetryEvent>,
    /// Timer the sequencer wants next, if any
    pub next: Option<(TimerKind, Duration)>,
}

/// Diagnostic sequence cycling the device through secondary sensor modes
#[derive(Debug, Clone)]
pub struct ModeProbeSequencer {
    modes: Vec<i32>,
    interval: Duration,
    restore_delay: Duration,
    state: ProbeState,
}

impl ModeProbeSequencer {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            modes: config.probe_modes.clone(),
            interval: config.probe_interval(),
            restore_delay: config.restore_delay(),
            state: ProbeState::Idle,
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Index of the next mode to probe
    pub fn step(&self) -> usize {
        match self.state {
            ProbeState::Idle => 0,
            ProbeState::Probing { step } => step,
            ProbeState::Restoring | ProbeState::Done => self.modes.len(),
        }
    }

    /// Advance one tick. The first tick leaves `Idle`.
    ///
    /// Mode commands are best effort: a rejected mode is logged and the
    /// sequence still advances.
    pub fn tick<D: DeviceCommands + ?Sized>(&mut self, device: &mut D) -> ProbeTick {
        let step = match self.state {
            ProbeState::Idle => 0,
            ProbeState::Probing { step } => step,
            ProbeState::Restoring | ProbeState::Done => {
                debug!(state = ?self.state, "probe tick ignored");
                return ProbeTick::default();
            }
        };

        if let Some(&mode) = self.modes.get(step) {
            let message = format!("Testing SPO2 mode {}...", mode);
            info!(mode, step, "{}", message);

            if let Err(e) = device.set_spo2_mode(true, mode) {
                warn!(mode, error = %e, "probe mode command failed");
            }

            self.state = ProbeState::Probing { step: step + 1 };
            ProbeTick {
                events: vec![TelemetryEvent::log(message)],
                next: Some((TimerKind::ProbeTick, self.interval)),
            }
        } else {
            info!(modes = self.modes.len(), "probe sequence finished");
            self.state = ProbeState::Restoring;
            ProbeTick {
                events: vec![TelemetryEvent::log("SPO2 probe done. 0 = hardware limit.")],
                next: Some((TimerKind::ProbeRestore, self.restore_delay)),
            }
        }
    }

    /// Issue the single restorative HR/HRV command and stop for good
    pub fn restore<D: DeviceCommands + ?Sized>(&mut self, device: &mut D) {
        if self.state != ProbeState::Restoring {
            debug!(state = ?self.state, "probe restore ignored");
            return;
        }
        if let Err(e) = device.enter_hrv_mode(true, false) {
            warn!(error = %e, "restoring HR/HRV mode failed");
        }
        self.state = ProbeState::Done;
    }
}
