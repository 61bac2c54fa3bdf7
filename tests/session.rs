use armband_telemetry::device::{DeviceCommand, RecordingDevice};
use armband_telemetry::orchestrator::{Effects, ScheduledTimer};
use armband_telemetry::sequencer::TimerKind;
use armband_telemetry::{
    runtime, DeviceStatus, IntervalBuffer, Orchestrator, OrchestratorConfig, RawPayload,
    TelemetryEvent, TelemetryKind,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

fn connected_core() -> (Orchestrator<RecordingDevice>, Effects, RecordingDevice) {
    let device = RecordingDevice::new();
    let mut core = Orchestrator::new(device.clone(), OrchestratorConfig::default()).unwrap();
    let effects = core.on_status(DeviceStatus::Connected);
    (core, effects, device)
}

fn heart_rate(json: serde_json::Value) -> RawPayload {
    RawPayload::from_value(json!({"callback": "heart_rate", "data": json})).unwrap()
}

#[test]
fn buffer_never_exceeds_capacity_and_keeps_tail() {
    let mut buffer = IntervalBuffer::default();
    let mut appended = Vec::new();

    for batch in 0..40 {
        let values: Vec<i32> = (0..(batch % 7)).map(|i| 700 + batch * 10 + i).collect();
        appended.extend(values.iter().copied());
        buffer.append(&values);
        assert!(buffer.len() <= 50);
    }

    let tail = appended[appended.len().saturating_sub(50)..].to_vec();
    assert_eq!(buffer.samples().collect::<Vec<_>>(), tail);
}

#[test]
fn reference_heart_rate_payload_yields_bpm_then_hrv() {
    let (mut core, _, _) = connected_core();
    let effects = core.on_payload(&heart_rate(
        json!({"heartRate": "72", "interval": [800, 810, 790, 805, 795]}),
    ));

    assert_eq!(
        effects.events,
        vec![
            TelemetryEvent::new(TelemetryKind::Bpm, "72"),
            TelemetryEvent::new(TelemetryKind::Hrv, "7"),
        ]
    );
}

#[test]
fn no_hrv_below_five_samples() {
    let (mut core, _, _) = connected_core();
    for interval in [800, 810, 790, 805] {
        let payload = heart_rate(json!({"heartRate": 60, "interval": [interval]}));
        let effects = core.on_payload(&payload);
        assert!(effects.events.iter().all(|e| e.kind != TelemetryKind::Hrv));
    }
    let effects = core.on_payload(&heart_rate(json!({"heartRate": 60, "interval": [795]})));
    assert_eq!(effects.events[1], TelemetryEvent::new(TelemetryKind::Hrv, "7"));
}

#[test]
fn reconnect_always_clears_buffer_and_probe_step() {
    let (mut core, effects, _) = connected_core();
    core.on_payload(&heart_rate(json!({"heartRate": 60, "interval": [800, 810, 790]})));
    let tick = core.on_timer(effects.timers[1].fired());
    assert_eq!(core.probe_step(), Some(1));
    assert_eq!(tick.timers[0].kind, TimerKind::ProbeTick);

    for status in [DeviceStatus::Disconnected, DeviceStatus::Connected] {
        core.on_status(status);
    }
    assert!(core.buffer().is_empty());
    assert_eq!(core.probe_step(), Some(0));
}

#[test]
fn step_zero_never_emits() {
    let (mut core, _, _) = connected_core();
    for steps in [json!("0"), json!(0)] {
        let payload = RawPayload::from_value(
            json!({"callback": "step_frequency", "data": {"steps": steps}}),
        )
        .unwrap();
        assert!(core.on_payload(&payload).events.is_empty());
    }
    let payload =
        RawPayload::from_value(json!({"callback": "step_frequency", "data": {"steps": "9"}})).unwrap();
    assert_eq!(
        core.on_payload(&payload).events,
        vec![TelemetryEvent::new(TelemetryKind::Steps, "9")]
    );
}

#[test]
fn unrecognized_payloads_yield_nothing() {
    assert!(RawPayload::from_value(json!({})).is_none());
    assert!(RawPayload::from_value(json!({"callback": "gyro", "data": [1, 2, 3]})).is_none());

    let (mut core, _, _) = connected_core();
    let payload = RawPayload::from_value(json!({"callback": "hrv_summary", "data": {}})).unwrap();
    assert!(core.on_payload(&payload).events.is_empty());
}

#[test]
fn stale_session_timer_is_inert() {
    let (mut core, first, device) = connected_core();
    let second = core.on_status(DeviceStatus::Connected);

    let stale: &ScheduledTimer = &first.timers[0];
    assert_eq!(core.on_timer(stale.fired()), Effects::default());

    core.on_timer(second.timers[0].fired());
    assert_eq!(device.issued().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn live_session_probe_runs_once_per_connect() {
    let device = RecordingDevice::new();
    let (sink, mut rx) = mpsc::unbounded_channel();
    let (handle, task) =
        runtime::spawn(device.clone(), OrchestratorConfig::default(), sink).unwrap();

    handle.on_status(DeviceStatus::Connecting).unwrap();
    handle.on_status(DeviceStatus::Connected).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    handle.shutdown().unwrap();
    task.await.unwrap();

    let probes: Vec<i32> = device
        .issued()
        .into_iter()
        .filter_map(|c| match c {
            DeviceCommand::SetSpo2Mode { mode, .. } => Some(mode),
            _ => None,
        })
        .collect();
    assert_eq!(probes, vec![0, 1, 2]);

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.kind == TelemetryKind::Status {
            statuses.push(event.value);
        }
    }
    assert_eq!(statuses, vec!["Connecting...", "Connected"]);
}

#[tokio::test(start_paused = true)]
async fn custom_probe_modes_and_timing() {
    let config = OrchestratorConfig::from_json(
        r#"{"probe_modes": [5], "probe_trigger_ms": 100, "probe_interval_ms": 50, "restore_delay_ms": 10}"#,
    )
    .unwrap();
    let device = RecordingDevice::new();
    let (sink, _rx) = mpsc::unbounded_channel();
    let (handle, _task) = runtime::spawn(device.clone(), config, sink).unwrap();

    handle.on_status(DeviceStatus::Connected).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        device.issued().last(),
        Some(&DeviceCommand::SetSpo2Mode {
            enabled: true,
            mode: 5
        })
    );

    // terminal tick at 150 ms, restore at 160 ms
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        device.issued().last(),
        Some(&DeviceCommand::EnterHrvMode {
            continuous: true,
            one_shot: false
        })
    );
}
