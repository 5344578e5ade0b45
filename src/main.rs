// src/main.rs

// Declare modules
pub mod config;
pub mod device;
pub mod glyph;
pub mod grid;
pub mod protocol;
pub mod telemetry;
pub mod transmit;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use nix::sys::signal::{self, SigHandler, Signal};

use crate::config::Config;
use crate::device::{DeviceSink, UsbSink};
use crate::glyph::Symbol;
use crate::grid::{compose, parse_csv_file, Grid};
use crate::telemetry::{usage, TemperatureReader, TelemetryError};
use crate::transmit::Transmitter;

/// Cooperative shutdown flag, flipped by SIGINT/SIGTERM.
static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_shutdown_signal(_signal: i32) {
    RUNNING.store(false, Ordering::SeqCst);
}

/// Drives the 14x14 LED matrix display of a USB-attached CPU cooler.
#[derive(Parser, Debug)]
#[command(name = "matrixd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Run in daemon mode, transmitting until interrupted
    #[arg(short = 'd', long)]
    daemon: bool,

    /// CSV pattern file to display
    #[arg(short = 'f', long, value_name = "PATH", conflicts_with_all = ["temp", "usage"])]
    file: Option<PathBuf>,

    /// Display CPU temperature
    #[arg(short = 't', long, conflicts_with = "usage")]
    temp: bool,

    /// Show the temperature in Celsius instead of Fahrenheit
    #[arg(short = 'c', long, requires = "temp")]
    celsius: bool,

    /// Display CPU usage percentage
    #[arg(short = 'u', long)]
    usage: bool,

    /// Also save the pattern as <NAME>.csv under the config directory
    #[arg(long, value_name = "NAME", requires = "file")]
    save: Option<String>,

    /// Alternate configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Which telemetry source feeds the display in daemon mode.
enum TelemetryMode {
    Temperature { celsius: bool },
    Usage,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("fatal: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    if args.daemon {
        install_signal_handlers()?;
    }

    if let Some(path) = &args.file {
        let grid = parse_csv_file(path)?;
        if let Some(name) = &args.save {
            let saved = grid::export_csv(name, &grid)?;
            info!("saved pattern to {}", saved.display());
        }
        if args.daemon {
            run_daemon_file(&config, &grid)
        } else {
            send_once(&config, &grid)
        }
    } else if args.temp || args.usage {
        if !args.daemon {
            bail!("telemetry modes keep the display refreshed and need --daemon");
        }
        let mode = if args.temp {
            TelemetryMode::Temperature {
                celsius: args.celsius,
            }
        } else {
            TelemetryMode::Usage
        };
        run_daemon_telemetry(&config, mode)
    } else {
        bail!("nothing to display; pass --file, --temp or --usage (see --help)");
    }
}

fn install_signal_handlers() -> Result<()> {
    let handler = SigHandler::Handler(handle_shutdown_signal);
    unsafe {
        signal::signal(Signal::SIGINT, handler).context("failed to install SIGINT handler")?;
        signal::signal(Signal::SIGTERM, handler).context("failed to install SIGTERM handler")?;
    }
    Ok(())
}

/// One-shot mode: encode, write once, exit. Every failure is fatal here.
fn send_once(config: &Config, grid: &Grid) -> Result<()> {
    let frame = protocol::encode(grid)?;
    let mut sink = UsbSink::open(&config.device)?;
    let written = sink
        .write(&frame)
        .context("one-shot frame write failed")?;
    info!("sent {written} bytes via {}", sink.describe());
    Ok(())
}

/// Daemon mode with a fixed pattern: transmit until a shutdown signal.
fn run_daemon_file(config: &Config, grid: &Grid) -> Result<()> {
    let sink = UsbSink::open(&config.device)?;
    let mut transmitter = Transmitter::new(Box::new(sink), config.transmit.send_interval());
    transmitter.set_pattern(grid)?;

    info!("transmitting pattern; send SIGINT or SIGTERM to stop");
    while RUNNING.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    info!("shutting down");
    transmitter.stop();
    Ok(())
}

/// Daemon mode fed by telemetry: refresh the pattern on a fixed cadence.
///
/// Telemetry hiccups are logged and skipped; the loop keeps the last good
/// pattern on the panel and tries again next refresh.
fn run_daemon_telemetry(config: &Config, mode: TelemetryMode) -> Result<()> {
    let sink = UsbSink::open(&config.device)?;
    let mut transmitter = Transmitter::new(Box::new(sink), config.transmit.send_interval());
    let mut reader = TemperatureReader::new(
        config.telemetry.temp_cache(),
        config.telemetry.sensor_cache(),
    );

    info!("transmitting telemetry; send SIGINT or SIGTERM to stop");
    while RUNNING.load(Ordering::SeqCst) {
        match read_sample(&mut reader, &mode, config) {
            Ok((value, symbol)) => refresh_pattern(&mut transmitter, value, symbol, config),
            Err(e) => warn!("telemetry read failed, keeping last pattern: {e}"),
        }
        sleep_while_running(config.transmit.refresh_interval());
    }

    info!("shutting down");
    transmitter.stop();
    Ok(())
}

fn read_sample(
    reader: &mut TemperatureReader,
    mode: &TelemetryMode,
    config: &Config,
) -> Result<(f64, Symbol), TelemetryError> {
    match mode {
        TelemetryMode::Temperature { celsius } => {
            let value = reader.read(!celsius)?;
            let symbol = if *celsius {
                Symbol::Celsius
            } else {
                Symbol::Fahrenheit
            };
            Ok((value, symbol))
        }
        TelemetryMode::Usage => {
            let value = usage::sample(config.telemetry.usage_sample())?;
            Ok((value, Symbol::Percent))
        }
    }
}

fn refresh_pattern(transmitter: &mut Transmitter, value: f64, symbol: Symbol, config: &Config) {
    let rounded = value.round() as i64;
    if !(0..=999).contains(&rounded) {
        warn!("telemetry value {value:.1} not displayable, skipping refresh");
        return;
    }
    match compose(rounded as u16, symbol, config.render.base_row) {
        Ok(grid) => {
            if let Err(e) = transmitter.set_pattern(&grid) {
                warn!("pattern update failed: {e:#}");
            }
        }
        Err(e) => warn!("cannot render telemetry value: {e}"),
    }
}

/// Sleeps `total` in short slices so a shutdown signal is honored promptly.
fn sleep_while_running(total: Duration) {
    let step = Duration::from_millis(200);
    let mut remaining = total;
    while RUNNING.load(Ordering::SeqCst) && !remaining.is_zero() {
        let nap = remaining.min(step);
        thread::sleep(nap);
        remaining -= nap;
    }
}
