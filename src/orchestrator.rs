//! Session orchestration
//!
//! [`Orchestrator`] is the single-writer core. It owns the connection tracker,
//! the interval buffer, the current session's sequencers and the device
//! handle, and turns each input (status, payload or timer expiry) into
//! [`Effects`]: events to emit, timers to schedule, and whether every pending
//! timer must be cancelled first.
//!
//! It never sleeps or spawns; the async host in [`crate::runtime`] applies the
//! effects. Every timer is tagged with the generation of the session that
//! scheduled it, and fires from an older generation are dropped, so a
//! superseded or ended session can never issue another command.

use crate::config::OrchestratorConfig;
use crate::connection::ConnectionTracker;
use crate::device::DeviceCommands;
use crate::error::TelemetryError;
use crate::interval::IntervalBuffer;
use crate::normalizer::TelemetryNormalizer;
use crate::payload::RawPayload;
use crate::sequencer::{ModeProbeSequencer, ProbeState, StartupSequencer, TimerKind};
use crate::types::{ConnectionState, DeviceStatus, TelemetryEvent};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Input delivered to the orchestrator, in queue order
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Status(DeviceStatus),
    Payload(RawPayload),
    Timer(TimerFired),
}

/// A timer expiry, tagged with the session generation that scheduled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub generation: u64,
    pub kind: TimerKind,
}

/// A one-shot timer the host must arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub generation: u64,
    pub kind: TimerKind,
    pub delay: Duration,
}

impl ScheduledTimer {
    /// Expiry message to deliver back once `delay` has elapsed
    pub fn fired(&self) -> TimerFired {
        TimerFired {
            generation: self.generation,
            kind: self.kind,
        }
    }
}

/// What the host must do after an input was handled
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    /// Cancel every outstanding timer before arming `timers`
    pub cancel_pending: bool,
    /// Events for the downstream sink, in emission order
    pub events: Vec<TelemetryEvent>,
    pub timers: Vec<ScheduledTimer>,
}

/// State that lives from one Connected transition until it is superseded or
/// the connection drops
#[derive(Debug)]
struct Session {
    id: Uuid,
    generation: u64,
    probe: ModeProbeSequencer,
}

/// Single-writer telemetry core
pub struct Orchestrator<D> {
    config: OrchestratorConfig,
    device: D,
    tracker: ConnectionTracker,
    normalizer: TelemetryNormalizer,
    buffer: IntervalBuffer,
    session: Option<Session>,
    generation: u64,
}

impl<D: DeviceCommands> Orchestrator<D> {
    /// Create an orchestrator after validating `config`
    pub fn new(device: D, config: OrchestratorConfig) -> Result<Self, TelemetryError> {
        config.validate()?;
        Ok(Self {
            normalizer: TelemetryNormalizer::new(config.zero_steps),
            buffer: IntervalBuffer::new(config.interval_capacity, config.hrv_min_samples),
            config,
            device,
            tracker: ConnectionTracker::new(),
            session: None,
            generation: 0,
        })
    }

    pub fn handle(&mut self, input: Input) -> Effects {
        match input {
            Input::Status(status) => self.on_status(status),
            Input::Payload(payload) => self.on_payload(&payload),
            Input::Timer(fired) => self.on_timer(fired),
        }
    }

    /// Apply a connection-status notification.
    ///
    /// Entering Connected (again) ends any previous session, clears the
    /// buffer, and schedules startup and probing for a fresh session. Leaving
    /// Connected ends the session. Both cancel every pending timer.
    pub fn on_status(&mut self, status: DeviceStatus) -> Effects {
        let transition = self.tracker.on_status(status);
        let mut effects = Effects::default();

        // Session boundary
        if transition.entered_connected() || transition.left_connected() {
            if let Some(old) = self.session.take() {
                info!(session = %old.id, generation = old.generation, "session ended");
            }
            self.generation += 1;
            self.buffer.clear();
            effects.cancel_pending = true;
        }

        if transition.entered_connected() {
            let session = Session {
                id: Uuid::new_v4(),
                generation: self.generation,
                probe: ModeProbeSequencer::new(&self.config),
            };
            info!(session = %session.id, generation = session.generation, "session started");

            // Settle, then probe
            effects.events.push(TelemetryEvent::log("Preparing probe sequence..."));
            effects.timers.push(ScheduledTimer {
                generation: session.generation,
                kind: TimerKind::Startup,
                delay: self.config.startup_settle(),
            });
            effects.timers.push(ScheduledTimer {
                generation: session.generation,
                kind: TimerKind::ProbeTick,
                delay: self.config.probe_trigger(),
            });
            self.session = Some(session);
        }

        effects.events.push(transition.status_event());
        effects
    }

    /// Normalize a collaborator payload into events
    pub fn on_payload(&mut self, payload: &RawPayload) -> Effects {
        Effects {
            events: self.normalizer.normalize(payload, &mut self.buffer),
            ..Default::default()
        }
    }

    /// Run the sequencer step a timer was armed for
    pub fn on_timer(&mut self, fired: TimerFired) -> Effects {
        let mut effects = Effects::default();

        let session = match self.session.as_mut() {
            Some(session) if session.generation == fired.generation => session,
            _ => {
                debug!(generation = fired.generation, kind = ?fired.kind, "dropping stale timer");
                return effects;
            }
        };

        match fired.kind {
            TimerKind::Startup => {
                let failures = StartupSequencer::run(&mut self.device);
                debug!(session = %session.id, failures, "startup sequence issued");
            }
            TimerKind::ProbeTick => {
                let tick = session.probe.tick(&mut self.device);
                effects.events = tick.events;
                if let Some((kind, delay)) = tick.next {
                    effects.timers.push(ScheduledTimer {
                        generation: session.generation,
                        kind,
                        delay,
                    });
                }
            }
            TimerKind::ProbeRestore => {
                session.probe.restore(&mut self.device);
                info!(session = %session.id, "primary mode restored");
            }
        }

        effects
    }

    pub fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    pub fn buffer(&self) -> &IntervalBuffer {
        &self.buffer
    }

    /// Probe state of the current session, if one is active
    pub fn probe_state(&self) -> Option<ProbeState> {
        self.session.as_ref().map(|s| s.probe.state())
    }

    /// Probe step of the current session, if one is active
    pub fn probe_step(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.probe.step())
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Generation of the most recent session boundary
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}
