//! Async host for the orchestrator
//!
//! Runs an [`Orchestrator`] as a tokio actor: one inbox carries status
//! notifications, payloads and timer expiries, and only the actor task touches
//! the orchestrator. Timers are one-shot tasks that sleep and post their
//! expiry back into the inbox; a session boundary aborts them all.
//!
//! Events go to the sink through an unbounded channel, so emission never
//! blocks the actor.

use crate::config::OrchestratorConfig;
use crate::device::DeviceCommands;
use crate::error::TelemetryError;
use crate::orchestrator::{Effects, Input, Orchestrator, ScheduledTimer, TimerFired};
use crate::payload::RawPayload;
use crate::types::{DeviceStatus, TelemetryEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Message {
    Input(Input),
    Timer { id: u64, fired: TimerFired },
    /// The last [`OrchestratorHandle`] was dropped
    Detached,
    Shutdown,
}

/// Cloneable sender side of a running orchestrator.
///
/// Dropping the last clone detaches the actor: it finishes the timers already
/// armed for the current session and then stops.
#[derive(Clone)]
pub struct OrchestratorHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    tx: mpsc::UnboundedSender<Message>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Detached);
    }
}

impl OrchestratorHandle {
    /// Deliver a connection-status notification
    pub fn on_status(&self, status: DeviceStatus) -> Result<(), TelemetryError> {
        self.send(Message::Input(Input::Status(status)))
    }

    /// Deliver a collaborator payload
    pub fn on_payload(&self, payload: RawPayload) -> Result<(), TelemetryError> {
        self.send(Message::Input(Input::Payload(payload)))
    }

    /// Deliver a loosely typed payload; unrecognized shapes are dropped
    pub fn on_json_payload(&self, value: Value) -> Result<(), TelemetryError> {
        match RawPayload::from_value(value) {
            Some(payload) => self.on_payload(payload),
            None => Ok(()),
        }
    }

    /// Stop the actor after the messages already queued, cancelling any
    /// outstanding timers
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.send(Message::Shutdown)
    }

    fn send(&self, message: Message) -> Result<(), TelemetryError> {
        self.inner
            .tx
            .send(message)
            .map_err(|_| TelemetryError::ChannelClosed)
    }
}

/// Spawn the orchestrator actor on the current tokio runtime.
///
/// The actor stops on [`OrchestratorHandle::shutdown`], or once every handle
/// has been dropped and no timer is outstanding.
pub fn spawn<D>(
    device: D,
    config: OrchestratorConfig,
    sink: mpsc::UnboundedSender<TelemetryEvent>,
) -> Result<(OrchestratorHandle, JoinHandle<()>), TelemetryError>
where
    D: DeviceCommands + Send + 'static,
{
    let core = Orchestrator::new(device, config)?;
    let (tx, inbox) = mpsc::unbounded_channel();

    let actor = Actor {
        core,
        inbox,
        timer_tx: tx.clone(),
        pending: Vec::new(),
        next_timer_id: 0,
        detached: false,
        sink,
        sink_closed: false,
    };
    let task = tokio::spawn(actor.run());

    let handle = OrchestratorHandle {
        inner: Arc::new(HandleInner { tx }),
    };
    Ok((handle, task))
}

struct Actor<D> {
    core: Orchestrator<D>,
    inbox: mpsc::UnboundedReceiver<Message>,
    timer_tx: mpsc::UnboundedSender<Message>,
    pending: Vec<(u64, JoinHandle<()>)>,
    next_timer_id: u64,
    detached: bool,
    sink: mpsc::UnboundedSender<TelemetryEvent>,
    sink_closed: bool,
}

impl<D: DeviceCommands> Actor<D> {
    async fn run(mut self) {
        info!("orchestrator started");
        while let Some(message) = self.inbox.recv().await {
            match message {
                Message::Input(input) => {
                    let effects = self.core.handle(input);
                    self.apply(effects);
                }
                Message::Timer { id, fired } => {
                    self.pending.retain(|(pending_id, _)| *pending_id != id);
                    let effects = self.core.handle(Input::Timer(fired));
                    self.apply(effects);
                }
                Message::Detached => {
                    debug!(outstanding = self.pending.len(), "all handles dropped");
                    self.detached = true;
                }
                Message::Shutdown => break,
            }

            if self.detached && self.pending.is_empty() {
                break;
            }
        }
        self.cancel_pending();
        info!("orchestrator stopped");
    }

    fn apply(&mut self, effects: Effects) {
        if effects.cancel_pending {
            self.cancel_pending();
        }

        for event in effects.events {
            self.emit(event);
        }
        for timer in effects.timers {
            self.arm(timer);
        }
    }

    fn emit(&mut self, event: TelemetryEvent) {
        if self.sink.send(event).is_err() && !self.sink_closed {
            warn!("telemetry sink closed; dropping events");
            self.sink_closed = true;
        }
    }

    fn arm(&mut self, timer: ScheduledTimer) {
        debug!(
            kind = ?timer.kind,
            generation = timer.generation,
            delay_ms = timer.delay.as_millis() as u64,
            "timer armed"
        );

        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let tx = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            let _ = tx.send(Message::Timer {
                id,
                fired: timer.fired(),
            });
        });
        self.pending.push((id, task));
    }

    fn cancel_pending(&mut self) {
        for (_, timer) in self.pending.drain(..) {
            timer.abort();
        }
    }
}
