// src/telemetry/temp.rs

//! CPU temperature from the hwmon sensor tree.
//!
//! Discovery scans `<root>/hwmon*/name` for a known CPU sensor driver and
//! reads the sibling `temp1_input` (millidegrees Celsius). The resolved
//! path is cached for a long time (the sensor does not move at runtime)
//! and the value briefly, to keep a tight refresh loop from hammering
//! sysfs. Both durations are owned by the reader and configurable; a zero
//! duration disables that cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, trace};

use super::TelemetryError;

/// hwmon driver names that report the CPU package temperature.
const SENSOR_NAMES: [&str; 3] = ["coretemp", "k10temp", "zenpower"];

const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// Millidegrees per degree in `temp*_input` files.
const MILLIDEGREE: f64 = 1000.0;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Cached CPU temperature reader.
pub struct TemperatureReader {
    hwmon_root: PathBuf,
    value_ttl: Duration,
    sensor_ttl: Duration,
    cached_celsius: Option<(Instant, f64)>,
    cached_sensor: Option<(Instant, PathBuf)>,
}

impl TemperatureReader {
    pub fn new(value_ttl: Duration, sensor_ttl: Duration) -> Self {
        Self::with_root(PathBuf::from(DEFAULT_HWMON_ROOT), value_ttl, sensor_ttl)
    }

    /// Reader over an alternate sensor tree. Tests point this at a fixture
    /// directory.
    pub fn with_root(hwmon_root: PathBuf, value_ttl: Duration, sensor_ttl: Duration) -> Self {
        TemperatureReader {
            hwmon_root,
            value_ttl,
            sensor_ttl,
            cached_celsius: None,
            cached_sensor: None,
        }
    }

    /// Current CPU temperature in degrees Celsius.
    pub fn read_celsius(&mut self) -> Result<f64, TelemetryError> {
        if let Some((at, celsius)) = self.cached_celsius {
            if at.elapsed() < self.value_ttl {
                trace!("temperature cache hit: {celsius:.1}C");
                return Ok(celsius);
            }
        }

        let sensor = self.sensor_path()?;
        let text = fs::read_to_string(&sensor).map_err(|e| {
            TelemetryError::SensorUnavailable(format!("reading {}: {e}", sensor.display()))
        })?;
        let millidegrees: i64 = text.trim().parse().map_err(|e| {
            TelemetryError::Parse(format!("temperature reading '{}': {e}", text.trim()))
        })?;

        let celsius = millidegrees as f64 / MILLIDEGREE;
        self.cached_celsius = Some((Instant::now(), celsius));
        Ok(celsius)
    }

    /// Current CPU temperature, optionally converted to Fahrenheit.
    pub fn read(&mut self, fahrenheit: bool) -> Result<f64, TelemetryError> {
        let celsius = self.read_celsius()?;
        Ok(if fahrenheit {
            celsius_to_fahrenheit(celsius)
        } else {
            celsius
        })
    }

    fn sensor_path(&mut self) -> Result<PathBuf, TelemetryError> {
        if let Some((at, path)) = &self.cached_sensor {
            if at.elapsed() < self.sensor_ttl {
                return Ok(path.clone());
            }
        }

        let path = discover_sensor(&self.hwmon_root)?;
        debug!("CPU temperature sensor: {}", path.display());
        self.cached_sensor = Some((Instant::now(), path.clone()));
        Ok(path)
    }
}

/// Scans the sensor tree for the first known CPU temperature driver.
fn discover_sensor(root: &Path) -> Result<PathBuf, TelemetryError> {
    let entries = fs::read_dir(root).map_err(|e| {
        TelemetryError::SensorUnavailable(format!("listing {}: {e}", root.display()))
    })?;

    for entry in entries.flatten() {
        let name_file = entry.path().join("name");
        let Ok(name) = fs::read_to_string(&name_file) else {
            continue;
        };
        if SENSOR_NAMES.contains(&name.trim()) {
            return Ok(entry.path().join("temp1_input"));
        }
    }

    Err(TelemetryError::SensorUnavailable(format!(
        "no known CPU temperature sensor under {}",
        root.display()
    )))
}
