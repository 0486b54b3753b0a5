use anyhow::{anyhow, Result};
use hidapi::{HidApi, HidDevice};
use log::{debug, error, info, trace};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::framing::{split_reports, FramingError, Reassembler};
use super::Transport;
use crate::device::DeviceProfile;

const HID_REPORT_SIZE: usize = 64;
const REPORT_ID: u8 = 0;

#[derive(Debug, Error)]
pub enum HidError {
    #[error("HID API error: {0}")]
    HidApi(#[from] hidapi::HidError),
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("no data from device within {0:?}")]
    Timeout(Duration),
}

pub struct HidTransport {
    device: HidDevice,
}

impl HidTransport {
    /// Opens the first device matching `profile`, or the one with the given
    /// serial number.
    pub fn open(profile: &DeviceProfile, serial_number: Option<&str>) -> Result<Self> {
        let api = HidApi::new().map_err(|e| anyhow!("Failed to initialize HID API: {}", e))?;

        let candidates: Vec<_> = api
            .device_list()
            .filter(|info| profile.matches(info.vendor_id(), info.product_id()))
            .collect();

        info!("Found {} {} HID devices", candidates.len(), profile.name);
        if candidates.is_empty() {
            return Err(anyhow!("No {} devices found", profile.name));
        }

        if let Some(serial) = serial_number {
            let info = candidates
                .iter()
                .find(|info| info.serial_number() == Some(serial))
                .ok_or_else(|| {
                    let available: Vec<&str> =
                        candidates.iter().filter_map(|info| info.serial_number()).collect();
                    anyhow!(
                        "Could not find {} device with serial {} (available: {})",
                        profile.name,
                        serial,
                        available.join(", ")
                    )
                })?;
            let device = info.open_device(&api).map_err(|e| {
                error!("Failed to open device with serial {}: {}", serial, e);
                anyhow!(
                    "{} device {} could not be opened; it may be in use by another \
                     application ({})",
                    profile.name,
                    serial,
                    e
                )
            })?;
            return Ok(Self { device });
        }

        for info in &candidates {
            match info.open_device(&api) {
                Ok(device) => {
                    info!("Opened {} HID device {:?}", profile.name, info.serial_number());
                    return Ok(Self { device });
                }
                Err(e) => debug!("Failed to open device {:?}: {}", info.serial_number(), e),
            }
        }

        Err(anyhow!(
            "Found {} {} device(s) but could not open any; close other wallet \
             applications and reconnect the device",
            candidates.len(),
            profile.name
        ))
    }
}

impl Transport for HidTransport {
    type Error = HidError;

    fn write(&mut self, msg: &[u8], _timeout: Duration) -> Result<usize, Self::Error> {
        let mut packets = 0;
        for report in split_reports(msg, HID_REPORT_SIZE) {
            // hidapi expects the report id in front of every report.
            let mut packet = Vec::with_capacity(HID_REPORT_SIZE + 1);
            packet.push(REPORT_ID);
            packet.extend_from_slice(&report);
            self.device.write(&packet)?;
            packets += 1;
        }
        debug!("HID Write: sent {} bytes in {} packets", msg.len(), packets);
        Ok(msg.len())
    }

    fn read(&mut self, buf: &mut Vec<u8>, timeout: Duration) -> Result<(), Self::Error> {
        let started = Instant::now();
        let mut reassembler = Reassembler::new();
        let mut packet = [0u8; HID_REPORT_SIZE];

        loop {
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(HidError::Timeout(timeout));
            }
            let size = self
                .device
                .read_timeout(&mut packet, remaining.as_millis().min(i32::MAX as u128) as i32)?;
            if size == 0 {
                error!("HID Read: no data received after {:?}", timeout);
                return Err(HidError::Timeout(timeout));
            }
            if reassembler.push(&packet[..size])? {
                break;
            }
            trace!("HID Read: {:?} bytes outstanding", reassembler.remaining());
        }

        let frame = reassembler.into_frame();
        debug!("HID Read: {} byte frame", frame.len());
        buf.extend_from_slice(&frame);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        // No reset for HID; drain whatever the device still has queued.
        let mut dummy = [0u8; HID_REPORT_SIZE];
        let mut packets_flushed = 0;
        while let Ok(size) = self.device.read_timeout(&mut dummy, 10) {
            if size == 0 {
                break;
            }
            packets_flushed += 1;
        }
        if packets_flushed > 0 {
            info!("HID Reset: flushed {} packets", packets_flushed);
        }
        Ok(())
    }
}
