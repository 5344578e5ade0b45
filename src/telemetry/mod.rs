// src/telemetry/mod.rs
//! Host telemetry sources rendered on the panel.
//!
//! - `temp`: CPU temperature from the platform hwmon sensor tree
//! - `usage`: CPU utilisation from `/proc/stat` counter deltas
//!
//! Readers own their caches as explicit state; there are no process-wide
//! mutable variables here, which keeps the cache durations configurable and
//! the readers testable against fixture directories.

use std::fmt;

pub mod temp;
pub mod usage;

pub use temp::TemperatureReader;

/// Failure reading or interpreting a telemetry source.
#[derive(Debug)]
pub enum TelemetryError {
    /// The source is missing or unreadable (sensor not present, file gone).
    SensorUnavailable(String),
    /// The source exists but its contents were not understood.
    Parse(String),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::SensorUnavailable(msg) => write!(f, "sensor unavailable: {msg}"),
            TelemetryError::Parse(msg) => write!(f, "malformed telemetry data: {msg}"),
        }
    }
}

impl std::error::Error for TelemetryError {}
