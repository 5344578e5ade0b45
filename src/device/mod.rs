// src/device/mod.rs
//! Device transport layer.
//!
//! - `DeviceSink`: the minimal write contract consumed by the transmit loop
//! - `UsbSink`: the real USB bulk-transfer implementation
//! - `MockSink`: a recording implementation for tests

pub mod sink;
pub mod usb;

#[cfg(test)]
pub mod mock;

pub use sink::DeviceSink;
pub use usb::UsbSink;
