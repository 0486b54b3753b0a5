use super::framing::{split_reports, Reassembler};
use super::Transport;
use core::time::Duration;
use log::{debug, trace, warn};
use rusb::{Device, DeviceHandle, Direction, InterfaceDescriptor, TransferType, UsbContext};
use std::time::Instant;

/// Interrupt-endpoint transport over libusb.
pub struct UsbTransport<T: UsbContext> {
    handle: DeviceHandle<T>,
    endpoints: Endpoints,
}

#[derive(Debug, Clone, Copy)]
struct Endpoints {
    read: u8,
    write: u8,
    read_size: usize,
    write_size: usize,
}

impl Endpoints {
    /// The first interrupt IN and OUT endpoints of the interface.
    fn find(descriptor: &InterfaceDescriptor) -> Option<Self> {
        let interrupt = |direction| {
            descriptor.endpoint_descriptors().find(|ep| {
                ep.direction() == direction && ep.transfer_type() == TransferType::Interrupt
            })
        };
        let read = interrupt(Direction::In)?;
        let write = interrupt(Direction::Out)?;
        Some(Self {
            read: read.address(),
            write: write.address(),
            read_size: read.max_packet_size().into(),
            write_size: write.max_packet_size().into(),
        })
    }
}

impl<T: UsbContext> UsbTransport<T> {
    /// Opens `device` and claims the interface at `interface_index` of its
    /// active configuration.
    pub fn new(device: &Device<T>, interface_index: usize) -> Result<Self, rusb::Error> {
        let config = device.active_config_descriptor()?;
        let interface = config
            .interfaces()
            .nth(interface_index)
            .ok_or(rusb::Error::NotFound)?;
        let endpoints = interface
            .descriptors()
            .find_map(|descriptor| Endpoints::find(&descriptor))
            .ok_or(rusb::Error::NotFound)?;

        let mut handle = device.open()?;
        handle.reset()?;
        // The kernel HID driver holds the interface on Linux and macOS.
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(e) => return Err(e),
        }
        handle.claim_interface(interface.number())?;
        handle.set_alternate_setting(interface.number(), 0)?;

        debug!(
            "UsbTransport: interface {} in={:#04x} out={:#04x}",
            interface.number(),
            endpoints.read,
            endpoints.write
        );
        Ok(Self { handle, endpoints })
    }

    fn read_packet(&self, timeout: Duration) -> Result<Vec<u8>, rusb::Error> {
        let mut packet = vec![0u8; self.endpoints.read_size];
        let len = self
            .handle
            .read_interrupt(self.endpoints.read, &mut packet, timeout)?;
        if len != packet.len() {
            return Err(rusb::Error::Other);
        }
        Ok(packet)
    }
}

macro_rules! since {
    ($started:expr, $timeout:expr) => {
        $timeout
            .checked_sub($started.elapsed())
            .filter(|x| *x >= Duration::from_millis(1))
            .ok_or(rusb::Error::Timeout)
    };
}

impl<T: UsbContext> Transport for UsbTransport<T> {
    type Error = rusb::Error;

    fn write(&mut self, msg: &[u8], timeout: Duration) -> Result<usize, Self::Error> {
        let started = Instant::now();
        for packet in split_reports(msg, self.endpoints.write_size) {
            let written =
                self.handle
                    .write_interrupt(self.endpoints.write, &packet, since!(started, timeout)?)?;
            if written != packet.len() {
                return Err(rusb::Error::Other);
            }
        }
        Ok(msg.len())
    }

    fn read(&mut self, buf: &mut Vec<u8>, timeout: Duration) -> Result<(), Self::Error> {
        let started = Instant::now();
        let mut reassembler = Reassembler::new();
        loop {
            let packet = self.read_packet(since!(started, timeout)?)?;
            let done = reassembler.push(&packet).map_err(|e| {
                warn!("UsbTransport::read: dropping malformed packet: {}", e);
                rusb::Error::Other
            })?;
            if done {
                break;
            }
            trace!("UsbTransport::read: {:?} bytes outstanding", reassembler.remaining());
        }

        let frame = reassembler.into_frame();
        debug!("UsbTransport::read: {} byte frame", frame.len());
        buf.extend_from_slice(&frame);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        // libusb cannot flush the read buffer; read until it times out.
        const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
        let mut packet = vec![0u8; self.endpoints.read_size];
        let mut drained = 0usize;
        loop {
            match self
                .handle
                .read_interrupt(self.endpoints.read, &mut packet, DRAIN_TIMEOUT)
            {
                Ok(0) | Err(rusb::Error::Timeout) => break,
                Ok(_) | Err(rusb::Error::Overflow) => drained += 1,
                Err(e) => return Err(e),
            }
        }
        if drained > 0 {
            debug!("UsbTransport::reset: drained {} stale packets", drained);
        }
        Ok(())
    }
}
