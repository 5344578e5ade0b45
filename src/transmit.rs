// src/transmit.rs

//! Continuous frame transmission.
//!
//! The panel forgets its pattern unless the host keeps repeating it, so a
//! background worker re-sends the current frame on a fixed cadence.
//!
//! ## Threading Model
//! - One foreground control path: `set_pattern` / `stop`
//! - At most one background worker, spawned on first activation
//! - The current frame lives in a single-slot mailbox (`PatternSlot`):
//!   writers replace the whole frame, the worker copies it under a read
//!   lock, so a snapshot can never observe a half-written frame
//!
//! ## Lifecycle
//! Idle -> `set_pattern` -> Active -> `stop` (or drop) -> Idle. The device
//! sink moves into the worker on activation and is handed back when the
//! worker exits, so the USB claim is never released under an in-flight
//! write. Stop latency is bounded by one tick: the worker sleeps inside
//! `recv_timeout` on its stop channel and wakes the moment a stop arrives.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{info, trace, warn};

use crate::device::DeviceSink;
use crate::grid::Grid;
use crate::protocol::{encode, Frame};

/// Cadence at which the worker repeats the current frame.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(750);

/// Single-slot last-write-wins mailbox holding the current frame.
#[derive(Clone)]
struct PatternSlot(Arc<RwLock<Frame>>);

impl PatternSlot {
    fn new(frame: Frame) -> Self {
        PatternSlot(Arc::new(RwLock::new(frame)))
    }

    /// Copy of the current frame. Lock poisoning is unreachable: no holder
    /// panics while the lock is held.
    fn snapshot(&self) -> Frame {
        *self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn replace(&self, frame: Frame) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = frame;
    }
}

/// Handles to a running worker.
struct ActiveSender {
    slot: PatternSlot,
    stop_tx: Sender<()>,
    handle: JoinHandle<Box<dyn DeviceSink>>,
}

enum State {
    /// No worker; the transmitter holds the sink.
    Idle(Box<dyn DeviceSink>),
    /// Worker running; it owns the sink until it exits.
    Active(ActiveSender),
}

/// Supervises the background sender.
pub struct Transmitter {
    interval: Duration,
    // None only transiently during a state change, or after a worker panic.
    state: Option<State>,
}

impl Transmitter {
    pub fn new(sink: Box<dyn DeviceSink>, interval: Duration) -> Self {
        Transmitter {
            interval,
            state: Some(State::Idle(sink)),
        }
    }

    /// True while a worker is running.
    pub fn is_active(&self) -> bool {
        matches!(self.state, Some(State::Active(_)))
    }

    /// Installs `grid` as the pattern the worker repeats.
    ///
    /// Encoding failures are returned without touching any state. An
    /// unchanged frame on an active loop is a no-op and does not disturb the
    /// tick schedule. The first call spawns the worker; later calls swap the
    /// frame in place and the running worker picks it up on its next tick.
    pub fn set_pattern(&mut self, grid: &Grid) -> Result<()> {
        let frame = encode(grid)?;

        match self.state.take() {
            Some(State::Active(sender)) => {
                if sender.slot.snapshot() != frame {
                    sender.slot.replace(frame);
                    trace!("pattern replaced in place");
                }
                self.state = Some(State::Active(sender));
                Ok(())
            }
            Some(State::Idle(sink)) => {
                self.state = Some(State::Active(spawn_sender(sink, frame, self.interval)));
                Ok(())
            }
            None => Err(anyhow!("transmitter is wedged after a worker failure")),
        }
    }

    /// Stops the worker, if any, and reclaims the sink. Idempotent.
    ///
    /// Blocks until the worker has fully exited, so by the time this
    /// returns nothing is writing to the device.
    pub fn stop(&mut self) {
        let sender = match self.state.take() {
            Some(State::Active(sender)) => sender,
            other => {
                self.state = other;
                return;
            }
        };

        // Worker wakes from its inter-tick wait as soon as this lands.
        let _ = sender.stop_tx.send(());
        match sender.handle.join() {
            Ok(sink) => {
                info!("sender stopped");
                self.state = Some(State::Idle(sink));
            }
            Err(_) => {
                // The sink died with the worker; nothing left to reclaim.
                warn!("sender thread panicked; device handle lost");
            }
        }
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_sender(sink: Box<dyn DeviceSink>, frame: Frame, interval: Duration) -> ActiveSender {
    let slot = PatternSlot::new(frame);
    let (stop_tx, stop_rx) = mpsc::channel();
    let worker_slot = slot.clone();
    let handle = thread::spawn(move || run_sender(worker_slot, sink, interval, stop_rx));
    ActiveSender {
        slot,
        stop_tx,
        handle,
    }
}

/// Worker body: send a snapshot, wait out the tick, repeat until stopped.
/// Returns the sink to the control path on exit.
fn run_sender(
    slot: PatternSlot,
    mut sink: Box<dyn DeviceSink>,
    interval: Duration,
    stop_rx: Receiver<()>,
) -> Box<dyn DeviceSink> {
    info!(
        "sender started: {} every {}ms",
        sink.describe(),
        interval.as_millis()
    );

    loop {
        let frame = slot.snapshot();
        match sink.write(&frame) {
            Ok(written) => trace!("sent {written} bytes"),
            // The panel may be unplugged at any moment. Report and keep the
            // schedule; the next tick retries with whatever is current.
            Err(e) => warn!("frame write failed, will retry next tick: {e:#}"),
        }

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    sink
}
