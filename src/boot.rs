use anyhow::{Context, Result};
use chrono::Local;
use clap::ArgMatches;
use env_logger::{Builder, Logger, Target};
use log::{LevelFilter, Log, Metadata, Record};
use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    core::{notice_channel, Controller, LoadOutcome, LogBuffer, SettingsStore},
    engine::{events, simulated::SimulatorConfig, SimulatedEngine},
};

/// Logger that forwards to env_logger and copies every record it accepts
/// into the console's log buffer.
struct BufferedLogger {
    inner: Logger,
    buffer: LogBuffer,
}

impl Log for BufferedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        self.buffer.append(format!(
            "{} [{}] {}",
            Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        ));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger.
///
/// The terminal belongs to the TUI, so records only reach a file when one is
/// configured (`--log-file` or `OSDP_CONSOLE_LOG_FILE`); the log buffer
/// always receives them. `RUST_LOG` overrides the default `info` filter.
pub fn init_logger(log_file: Option<PathBuf>, buffer: LogBuffer) -> Result<()> {
    let target = match &log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path:?}"))?;
            Target::Pipe(Box::new(file))
        }
        None => Target::Pipe(Box::new(std::io::sink())),
    };

    let inner = Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(target)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .build();

    let max_level = inner.filter();
    log::set_boxed_logger(Box::new(BufferedLogger { inner, buffer }))
        .context("Logger already initialized")?;
    log::set_max_level(max_level);

    if let Some(path) = log_file {
        log::info!("File logger initialized at {path:?}");
    }
    Ok(())
}

/// Wire up logging, settings, the engine and the controller, then hand the
/// terminal to the TUI until the operator quits.
pub fn start(matches: &ArgMatches) -> Result<()> {
    let buffer = LogBuffer::default();
    let log_file = matches
        .get_one::<String>("log-file")
        .cloned()
        .or_else(|| std::env::var("OSDP_CONSOLE_LOG_FILE").ok())
        .map(PathBuf::from);
    init_logger(log_file, buffer.clone())?;

    let store = match matches.get_one::<String>("config") {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::in_working_dir().context("Failed to get current working directory")?,
    };
    let outcome = store.load();
    if let LoadOutcome::Malformed(err) = &outcome {
        log::warn!("Ignoring saved settings: {err}");
    }
    let settings = outcome.into_settings();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("osdp-console-worker")
        .build()
        .context("Failed to start async runtime")?;

    let latency = matches
        .get_one::<u64>("reply-latency-ms")
        .copied()
        .unwrap_or(200);
    let (publisher, subscriptions) = events::channel();
    let engine = Arc::new(SimulatedEngine::new(
        runtime.handle().clone(),
        publisher,
        SimulatorConfig {
            reply_latency: Duration::from_millis(latency),
            ..SimulatorConfig::default()
        },
    ));

    let (notices, notice_rx) = notice_channel();
    let mut controller = Controller::new(
        runtime.handle().clone(),
        engine,
        subscriptions,
        store,
        settings,
        buffer,
        notices,
    );

    log::info!("OSDP console starting");
    let result = crate::tui::start(&mut controller, notice_rx);
    controller.shutdown();
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Print serial ports the OS knows about, one per line.
pub fn list_ports() -> Result<()> {
    let mut ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    ports.sort_by(|a, b| a.port_name.cmp(&b.port_name));
    for port in ports {
        println!("{}\t{:?}", port.port_name, port.port_type);
    }
    Ok(())
}
