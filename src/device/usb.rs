// src/device/usb.rs
//! USB bulk-transfer sink for the display controller.
//!
//! The panel enumerates as a vendor-specific device. Setup is: open by
//! VID/PID, let libusb detach any kernel driver, claim the interface, and
//! resolve the first bulk OUT endpoint from the active configuration. One
//! frame is one bulk write; the device sends nothing back, so success is
//! inferred from the write not failing.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rusb::{Direction, GlobalContext, TransferType};

use crate::config::DeviceConfig;
use crate::protocol::Frame;

use super::sink::DeviceSink;

/// An open, claimed USB connection to the panel.
pub struct UsbSink {
    handle: rusb::DeviceHandle<GlobalContext>,
    interface: u8,
    endpoint: u8,
}

impl UsbSink {
    /// Opens and claims the device described by `config`.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let mut handle = rusb::open_device_with_vid_pid(config.vendor_id, config.product_id)
            .ok_or_else(|| {
                anyhow!(
                    "display device {:04x}:{:04x} not found (is it plugged in, and do you have permission?)",
                    config.vendor_id,
                    config.product_id
                )
            })?;

        // Let libusb unbind hid/kernel drivers while we hold the interface.
        // Not supported on every platform; claiming may still succeed.
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("kernel driver auto-detach unavailable: {e}");
        }

        handle
            .claim_interface(config.interface)
            .with_context(|| format!("failed to claim interface {}", config.interface))?;

        let endpoint = find_bulk_out_endpoint(&handle.device(), config.interface)
            .context("failed to resolve output endpoint")?;

        info!(
            "opened display {:04x}:{:04x}, interface {}, endpoint {:#04x}",
            config.vendor_id, config.product_id, config.interface, endpoint
        );

        Ok(UsbSink {
            handle,
            interface: config.interface,
            endpoint,
        })
    }
}

/// Finds the first bulk OUT endpoint on `interface`.
fn find_bulk_out_endpoint(device: &rusb::Device<GlobalContext>, interface: u8) -> Result<u8> {
    let config = device
        .active_config_descriptor()
        .context("failed to read active config descriptor")?;

    for iface in config.interfaces() {
        if iface.number() != interface {
            continue;
        }
        for descriptor in iface.descriptors() {
            for endpoint in descriptor.endpoint_descriptors() {
                if endpoint.direction() == Direction::Out
                    && endpoint.transfer_type() == TransferType::Bulk
                {
                    return Ok(endpoint.address());
                }
            }
        }
    }

    Err(anyhow!("interface {interface} has no bulk OUT endpoint"))
}

impl DeviceSink for UsbSink {
    fn write(&mut self, frame: &Frame) -> Result<usize> {
        // Zero timeout = wait as long as the transfer takes. A hung write
        // stalls one tick of the transmit loop, never the control path.
        let written = self
            .handle
            .write_bulk(self.endpoint, frame.as_bytes(), Duration::ZERO)
            .with_context(|| format!("bulk write to endpoint {:#04x} failed", self.endpoint))?;
        debug!("sent {written} bytes to endpoint {:#04x}", self.endpoint);
        Ok(written)
    }

    fn describe(&self) -> String {
        format!("usb endpoint {:#04x}", self.endpoint)
    }
}

impl Drop for UsbSink {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!("failed to release interface {}: {e}", self.interface);
        }
    }
}
