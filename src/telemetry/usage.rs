// src/telemetry/usage.rs

//! CPU utilisation from `/proc/stat`.
//!
//! Utilisation is the busy share of the delta between two snapshots of the
//! aggregate `cpu` counter line, taken a short interval apart. A single
//! snapshot is meaningless (the counters are cumulative since boot), so
//! every sample blocks for the interval.

use std::fs;
use std::thread;
use std::time::Duration;

use super::TelemetryError;

const PROC_STAT: &str = "/proc/stat";

/// Delay between the two counter snapshots of one sample.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// One snapshot of the aggregate CPU time counters, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq
    }
}

/// Extracts the aggregate `cpu` line from `/proc/stat` contents.
fn parse_cpu_line(stat: &str) -> Result<CpuTimes, TelemetryError> {
    for line in stat.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("cpu") {
            continue;
        }

        let values = fields
            .take(7)
            .map(|field| {
                field.parse::<u64>().map_err(|e| {
                    TelemetryError::Parse(format!("cpu counter '{field}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if values.len() < 7 {
            return Err(TelemetryError::Parse(format!(
                "cpu line has {} counters, need 7",
                values.len()
            )));
        }

        return Ok(CpuTimes {
            user: values[0],
            nice: values[1],
            system: values[2],
            idle: values[3],
            iowait: values[4],
            irq: values[5],
            softirq: values[6],
        });
    }

    Err(TelemetryError::SensorUnavailable(
        "no aggregate cpu line in /proc/stat".to_string(),
    ))
}

/// Busy percentage across the delta between two snapshots.
fn usage_between(prev: CpuTimes, curr: CpuTimes) -> f64 {
    let total_delta = curr.total().saturating_sub(prev.total()) as f64;
    let idle_delta = curr.idle.saturating_sub(prev.idle) as f64;
    if total_delta == 0.0 {
        return 0.0;
    }
    (total_delta - idle_delta) / total_delta * 100.0
}

fn read_times() -> Result<CpuTimes, TelemetryError> {
    let text = fs::read_to_string(PROC_STAT)
        .map_err(|e| TelemetryError::SensorUnavailable(format!("reading {PROC_STAT}: {e}")))?;
    parse_cpu_line(&text)
}

/// Samples CPU utilisation over `interval`, blocking for its duration.
pub fn sample(interval: Duration) -> Result<f64, TelemetryError> {
    let prev = read_times()?;
    thread::sleep(interval);
    let curr = read_times()?;
    Ok(usage_between(prev, curr))
}
