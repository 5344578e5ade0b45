// src/device/sink.rs
//! DeviceSink trait - minimal write contract for the transmit loop.

use anyhow::Result;

use crate::protocol::Frame;

/// A destination for encoded frames.
///
/// The transmit loop owns its sink for as long as it runs and performs one
/// blocking `write` per tick. Writes may fail transiently (the panel can be
/// unplugged at any time); the caller reports the failure and keeps its
/// schedule rather than aborting. `Send` so a background worker can own the
/// sink outright.
pub trait DeviceSink: Send {
    /// Writes one frame, returning the number of bytes accepted.
    fn write(&mut self, frame: &Frame) -> Result<usize>;

    /// Short human-readable description of the sink, for log lines.
    fn describe(&self) -> String;
}
