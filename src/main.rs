use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hardhat_adapters::{FileLocalStore, JsonRecordStore};
use hardhat_sdk::{AlertOutput, MonitoringSessionManager, Severity, Toast};
use hardhat_watch::duration::{format_duration, parse_duration};
use hardhat_watch::{runner, load_config, load_roster, SampleSource, StreamSource};

#[derive(Parser, Debug)]
#[command(name = "hardhat-watch")]
#[command(about = "Threshold alerts and periodic recording for smart hard hat sensor streams")]
struct Args {
    /// Engine configuration file (TOML); HARDHAT_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of personnel to monitor
    #[arg(short, long)]
    roster: Option<PathBuf>,

    /// Read newline-delimited JSON samples from a file
    #[arg(short, long, conflicts_with = "connect")]
    file: Option<PathBuf>,

    /// Read samples from a TCP gateway (host:port)
    #[arg(short, long, conflicts_with = "file")]
    connect: Option<String>,

    /// Directory for local state and durable records
    #[arg(short, long, default_value = "hardhat-data")]
    data_dir: PathBuf,

    /// Start recording every rostered person
    #[arg(long)]
    record: bool,

    /// Override the recording interval (e.g. "5s", "500ms")
    #[arg(long)]
    recording_interval: Option<String>,

    /// Override the staleness window (e.g. "30s")
    #[arg(long)]
    staleness_window: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(ref s) = args.recording_interval {
        config.recording_interval = parse_duration(s).context("--recording-interval")?;
    }
    if let Some(ref s) = args.staleness_window {
        config.staleness_window = parse_duration(s).context("--staleness-window")?;
    }
    tracing::info!(
        recording_interval = %format_duration(config.recording_interval),
        staleness_window = %format_duration(config.staleness_window),
        "configuration loaded"
    );

    let local = FileLocalStore::open(args.data_dir.join("local"))?;
    let records = JsonRecordStore::open(args.data_dir.join("records")).await?;

    let (alerts, toasts) = AlertOutput::channel(256);
    let printer = tokio::spawn(print_toasts(toasts));

    let manager = MonitoringSessionManager::builder()
        .config(config)
        .local_store(Arc::new(local))
        .record_store(Arc::new(records))
        .alert_output(alerts)
        .build()?;

    if let Some(ref path) = args.roster {
        for person in load_roster(path)? {
            manager.add_person(person);
        }
    }
    if args.record {
        for person in manager.monitored() {
            manager.start_recording(&person.gear_id)?;
        }
    }

    let mut source = open_source(&args).await?;
    tokio::select! {
        _ = runner::drive(&manager, source.as_mut()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }

    let flushed = runner::flush_recordings(&manager).await;
    if flushed > 0 {
        tracing::info!(flushed, "final recordings saved");
    }
    print_summary(&manager);
    manager.shutdown();

    // Dropping the manager closes the alert channel and lets the printer finish
    drop(manager);
    let _ = printer.await;
    Ok(())
}

async fn open_source(args: &Args) -> Result<Box<dyn SampleSource>> {
    if let Some(ref addr) = args.connect {
        tracing::info!(addr = %addr, "connecting");
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;
        return Ok(Box::new(StreamSource::spawn(stream, addr)));
    }

    if let Some(ref path) = args.file {
        let file = open_file(path).await?;
        return Ok(Box::new(StreamSource::spawn(
            file,
            &path.display().to_string(),
        )));
    }

    Ok(Box::new(StreamSource::spawn(tokio::io::stdin(), "stdin")))
}

async fn open_file(path: &Path) -> Result<tokio::fs::File> {
    tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))
}

async fn print_toasts(mut rx: mpsc::Receiver<Toast>) {
    while let Some(toast) = rx.recv().await {
        let tag = match toast.severity {
            Severity::Error => "ALERT",
            Severity::Success => "OK",
            Severity::Info => "INFO",
        };
        println!("[{:<5}] {}", tag, toast.message);
    }
}

fn print_summary(manager: &MonitoringSessionManager) {
    for person in manager.monitored() {
        let Some(status) = manager.status(&person.gear_id) else {
            continue;
        };
        println!(
            "{}{}",
            status.person.display_name(),
            if status.recording { " [recording]" } else { "" }
        );
        for sensor in status.sensors {
            let value = match sensor.value {
                Some(v) => format!("{} {}", v, sensor.sensor.unit()),
                None => "-".to_string(),
            };
            println!(
                "  {:<26} {:>12} {:>2}{}",
                sensor.sensor.label(),
                value,
                sensor.condition.symbol(),
                if sensor.timed_out { " (stale)" } else { "" }
            );
        }
    }
    println!("{} notifications logged", manager.notifications().len());
}
