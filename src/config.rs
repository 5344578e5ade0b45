// src/config.rs

//! Configuration for the display daemon.
//!
//! Settings deserialize from an optional JSON file
//! (`~/.config/matrixd/config.json`); every field has a sensible default so
//! the file is only needed to override something. Grouped into sections by
//! concern: device identity, transmit cadence, telemetry sampling, and
//! glyph rendering.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Directory name under the user config root.
const APP_DIR: &str = "matrixd";
const CONFIG_FILE: &str = "config.json";

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)] // Apply default values for the entire struct if a field is missing.
pub struct Config {
    /// USB device identity.
    pub device: DeviceConfig,
    /// Transmit loop cadence settings.
    pub transmit: TransmitConfig,
    /// Telemetry sampling and cache settings.
    pub telemetry: TelemetryConfig,
    /// Glyph rendering settings.
    pub render: RenderConfig,
}

/// Identifies the USB display device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// USB vendor id of the cooler's display controller.
    pub vendor_id: u16,
    /// USB product id.
    pub product_id: u16,
    /// Interface number to claim.
    pub interface: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            vendor_id: 0x3633,
            product_id: 0x000C,
            interface: 0,
        }
    }
}

/// Cadence of the background sender and of telemetry refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    /// Milliseconds between repeated sends of the current frame.
    pub send_interval_ms: u64,
    /// Milliseconds between telemetry refreshes in daemon mode.
    pub refresh_interval_ms: u64,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        TransmitConfig {
            send_interval_ms: crate::transmit::DEFAULT_SEND_INTERVAL.as_millis() as u64,
            refresh_interval_ms: 3000,
        }
    }
}

impl TransmitConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Telemetry sampling and cache durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// How long a temperature reading stays fresh, in milliseconds.
    pub temp_cache_ms: u64,
    /// How long the discovered sensor path stays fresh, in hours. The
    /// sensor does not move at runtime, so this is generous.
    pub sensor_cache_hours: u64,
    /// Delay between the two counter snapshots of a CPU usage sample.
    pub usage_sample_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            temp_cache_ms: 1000,
            sensor_cache_hours: 24,
            usage_sample_ms: crate::telemetry::usage::DEFAULT_SAMPLE_INTERVAL.as_millis() as u64,
        }
    }
}

impl TelemetryConfig {
    pub fn temp_cache(&self) -> Duration {
        Duration::from_millis(self.temp_cache_ms)
    }

    pub fn sensor_cache(&self) -> Duration {
        Duration::from_secs(self.sensor_cache_hours * 3600)
    }

    pub fn usage_sample(&self) -> Duration {
        Duration::from_millis(self.usage_sample_ms)
    }
}

/// Glyph placement on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Top row of rendered glyphs. 5 centers a 5-row glyph vertically.
    pub base_row: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { base_row: 5 }
    }
}

/// The application's directory under the user config root.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

impl Config {
    /// Loads configuration.
    ///
    /// An explicitly given path must exist and parse. Without one, the
    /// default location is used if present, and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::read_file(path),
            None => match app_config_dir().map(|dir| dir.join(CONFIG_FILE)) {
                Some(path) if path.exists() => Self::read_file(&path),
                _ => {
                    debug!("no config file, using defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    fn read_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }
}
