//! armband CLI - drive the telemetry core from recorded collaborator traffic
//!
//! Commands:
//! - replay: feed timed status/payload records through a live orchestrator
//! - hrv: compute SDNN for a list of RR intervals
//! - config: print the default orchestrator configuration

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use armband_telemetry::device::{DeviceCommand, RecordingDevice};
use armband_telemetry::interval::IntervalBuffer;
use armband_telemetry::{runtime, DeviceStatus, OrchestratorConfig, TelemetryEvent, VERSION};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// armband - connection sequencing and streaming HRV for BLE armbands
#[derive(Parser)]
#[command(name = "armband")]
#[command(version = VERSION)]
#[command(about = "Replay wearable traffic through the telemetry core", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay timed status and payload records (NDJSON) in real time
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Orchestrator configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Probe mode the simulated device rejects (repeatable)
        #[arg(long = "reject-mode")]
        reject_modes: Vec<i32>,

        /// Time to keep running after the last record (defaults to a full probe cycle)
        #[arg(long)]
        drain_ms: Option<u64>,
    },

    /// Compute SDNN for RR intervals given as arguments or on stdin
    Hrv {
        /// Intervals in milliseconds
        values: Vec<i32>,
    },

    /// Print the default configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// One timed record of collaborator traffic
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    /// Offset from replay start
    #[serde(default)]
    at_ms: u64,
    #[serde(default)]
    status: Option<DeviceStatus>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Console logging on stderr; stdout carries only telemetry
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_ansi(atty::is(atty::Stream::Stderr)),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), ArmbandCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            output_format,
            config,
            reject_modes,
            drain_ms,
        } => cmd_replay(
            &input,
            &output,
            output_format,
            config.as_deref(),
            &reject_modes,
            drain_ms,
        ),
        Commands::Hrv { values } => cmd_hrv(values),
        Commands::Config => {
            println!("{}", OrchestratorConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    config_path: Option<&Path>,
    reject_modes: &[i32],
    drain_ms: Option<u64>,
) -> Result<(), ArmbandCliError> {
    // Load config
    let config = match config_path {
        Some(path) => OrchestratorConfig::from_json(&fs::read_to_string(path)?)?,
        None => OrchestratorConfig::default(),
    };

    // Read input
    let records = parse_records(&read_input(input)?)?;
    if records.is_empty() {
        return Err(ArmbandCliError::NoRecords);
    }

    // Simulated device
    let device = reject_modes.iter().fold(RecordingDevice::new(), |device, &mode| {
        device.reject(DeviceCommand::SetSpo2Mode {
            enabled: true,
            mode,
        })
    });
    let drain = Duration::from_millis(drain_ms.unwrap_or_else(|| full_cycle_ms(&config)));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let events = rt.block_on(replay(records, device.clone(), config, drain))?;

    // Write output
    let output_data = format_output(&events, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    eprintln!("Commands issued");
    eprintln!("===============");
    for command in device.issued() {
        eprintln!("  {}", command);
    }

    Ok(())
}

async fn replay(
    records: Vec<ReplayRecord>,
    device: RecordingDevice,
    config: OrchestratorConfig,
    drain: Duration,
) -> Result<Vec<TelemetryEvent>, ArmbandCliError> {
    let (sink, mut rx) = mpsc::unbounded_channel();
    let (handle, task) = runtime::spawn(device, config, sink)?;

    let start = Instant::now();
    for record in records {
        let due = start
            .checked_add(Duration::from_millis(record.at_ms))
            .ok_or_else(|| {
                ArmbandCliError::ParseError(format!("at_ms out of range: {}", record.at_ms))
            })?;
        tokio::time::sleep_until(due).await;

        if record.status.is_none() && record.payload.is_none() {
            tracing::warn!(at_ms = record.at_ms, "record has neither status nor payload");
        }
        if let Some(status) = record.status {
            handle.on_status(status)?;
        }
        if let Some(payload) = record.payload {
            handle.on_json_payload(payload)?;
        }
    }

    // Let the last session run out before stopping
    tokio::time::sleep(drain).await;
    handle.shutdown()?;
    task.await
        .map_err(|e| ArmbandCliError::ParseError(format!("orchestrator task failed: {}", e)))?;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    Ok(events)
}

/// Time for one connect to run startup, every probe mode and the restore
fn full_cycle_ms(config: &OrchestratorConfig) -> u64 {
    let ticks = config.probe_modes.len() as u64;
    config
        .startup_settle_ms
        .max(config.probe_trigger_ms)
        .saturating_add(config.probe_interval_ms.saturating_mul(ticks))
        .saturating_add(config.restore_delay_ms)
        .saturating_add(500)
}

fn cmd_hrv(mut values: Vec<i32>) -> Result<(), ArmbandCliError> {
    if values.is_empty() && !atty::is(atty::Stream::Stdin) {
        let input = read_input(Path::new("-"))?;
        for token in input.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let value = token
                .parse()
                .map_err(|_| ArmbandCliError::ParseError(format!("Not an interval: {}", token)))?;
            values.push(value);
        }
    }

    let mut buffer = IntervalBuffer::default();
    buffer.append(&values);

    let report = HrvReport {
        samples: buffer.len(),
        ready: buffer.is_ready(),
        sdnn_ms: buffer.compute_hrv(),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn read_input(input: &Path) -> Result<String, ArmbandCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(ndjson: &str) -> Result<Vec<ReplayRecord>, ArmbandCliError> {
    let mut records = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(trimmed).map_err(|e| {
            ArmbandCliError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
        })?;
        records.push(record);
    }
    records.sort_by_key(|r| r.at_ms);
    Ok(records)
}

fn format_output(
    events: &[TelemetryEvent],
    format: &OutputFormat,
) -> Result<String, ArmbandCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut output = String::new();
            for event in events {
                output.push_str(&serde_json::to_string(event)?);
                output.push('\n');
            }
            Ok(output)
        }
        OutputFormat::Json => Ok(serde_json::to_string(events)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(events)? + "\n"),
    }
}

#[derive(Debug)]
enum ArmbandCliError {
    Io(io::Error),
    Telemetry(armband_telemetry::TelemetryError),
    Json(serde_json::Error),
    NoRecords,
    ParseError(String),
}

impl From<io::Error> for ArmbandCliError {
    fn from(e: io::Error) -> Self {
        ArmbandCliError::Io(e)
    }
}

impl From<armband_telemetry::TelemetryError> for ArmbandCliError {
    fn from(e: armband_telemetry::TelemetryError) -> Self {
        ArmbandCliError::Telemetry(e)
    }
}

impl From<serde_json::Error> for ArmbandCliError {
    fn from(e: serde_json::Error) -> Self {
        ArmbandCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ArmbandCliError> for CliError {
    fn from(e: ArmbandCliError) -> Self {
        match e {
            ArmbandCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ArmbandCliError::Telemetry(e) => CliError {
                code: "TELEMETRY_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'armband config' to see a valid configuration".to_string()),
            },
            ArmbandCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ArmbandCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ArmbandCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line needs at_ms plus a status or payload".to_string()),
            },
        }
    }
}

#[derive(serde::Serialize)]
struct HrvReport {
    samples: usize,
    ready: bool,
    sdnn_ms: i32,
}
