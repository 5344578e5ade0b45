// src/device/mock.rs
//! Recording mock sink for transmit-loop tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::protocol::Frame;

use super::sink::DeviceSink;

/// A sink that records every frame written to it.
///
/// The record and the failure switch are shared handles, so a test keeps a
/// clone while the transmit worker owns the sink itself.
pub struct MockSink {
    written: Arc<Mutex<Vec<Frame>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockSink {
    pub fn new() -> Self {
        MockSink {
            written: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the frames written so far.
    pub fn written(&self) -> Arc<Mutex<Vec<Frame>>> {
        Arc::clone(&self.written)
    }

    /// Shared switch that makes subsequent writes fail while set.
    pub fn failure_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_writes)
    }
}

impl DeviceSink for MockSink {
    fn write(&mut self, frame: &Frame) -> Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("mock sink write failure"));
        }
        self.written.lock().unwrap().push(*frame);
        Ok(frame.as_bytes().len())
    }

    fn describe(&self) -> String {
        "mock sink".to_string()
    }
}
