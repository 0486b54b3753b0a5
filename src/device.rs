//! Vendor profiles, USB enumeration and transport selection.

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use rusb::{Device, GlobalContext};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::{HidTransport, ProtocolAdapter, UsbTransport};

/// What differs between the supported device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Name shown in prompts ("Confirm address on KeepKey device ...").
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_ids: &'static [u16],
    /// Whether a pending confirmation can be aborted with `Cancel`.
    pub supports_cancel: bool,
    pub minimum_firmware: (u32, u32, u32),
}

pub const KEEPKEY: DeviceProfile = DeviceProfile {
    name: "KeepKey",
    vendor_id: 0x2b24,
    product_ids: &[0x0001, 0x0002],
    supports_cancel: true,
    minimum_firmware: (1, 0, 0),
};

pub const TREZOR_ONE: DeviceProfile = DeviceProfile {
    name: "TREZOR",
    vendor_id: 0x534c,
    product_ids: &[0x0001],
    supports_cancel: true,
    minimum_firmware: (1, 5, 2),
};

impl DeviceProfile {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_ids.contains(&product_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Keepkey,
    Trezor,
}

impl Vendor {
    pub fn profile(self) -> &'static DeviceProfile {
        match self {
            Vendor::Keepkey => &KEEPKEY,
            Vendor::Trezor => &TREZOR_ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// USB first, HID if the interface cannot be claimed.
    #[default]
    Auto,
    Usb,
    Hid,
}

/// Which device to open and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub vendor: Vendor,
    pub serial: Option<String>,
    pub transport: TransportKind,
}

/// User-friendly representation of an enumerated device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub unique_id: String,
    pub name: String,
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    pub fn new(
        unique_id: String,
        vid: u16,
        pid: u16,
        manufacturer: Option<String>,
        product: Option<String>,
        serial_number: Option<String>,
    ) -> Self {
        let name = match (&product, &manufacturer) {
            (Some(p), Some(m)) => format!("{} - {}", m, p),
            (Some(p), None) => p.clone(),
            (None, Some(m)) => m.clone(),
            (None, None) => format!("USB Device (VID: {:04x}, PID: {:04x})", vid, pid),
        };
        Self {
            unique_id,
            name,
            vid,
            pid,
            manufacturer,
            product,
            serial_number,
        }
    }
}

fn usb_devices(profile: &DeviceProfile) -> Result<Vec<Device<GlobalContext>>> {
    Ok(rusb::devices()?
        .iter()
        .filter(|device| match device.device_descriptor() {
            Ok(desc) => profile.matches(desc.vendor_id(), desc.product_id()),
            Err(_) => false,
        })
        .collect())
}

fn describe(device: &Device<GlobalContext>) -> Result<DeviceInfo> {
    let desc = device.device_descriptor()?;
    let handle = device.open().ok();
    let serial_number = handle
        .as_ref()
        .and_then(|h| h.read_serial_number_string_ascii(&desc).ok());
    let manufacturer = handle
        .as_ref()
        .and_then(|h| h.read_manufacturer_string_ascii(&desc).ok());
    let product = handle
        .as_ref()
        .and_then(|h| h.read_product_string_ascii(&desc).ok());
    let unique_id = serial_number
        .clone()
        .unwrap_or_else(|| format!("bus{}_addr{}", device.bus_number(), device.address()));

    Ok(DeviceInfo::new(
        unique_id,
        desc.vendor_id(),
        desc.product_id(),
        manufacturer,
        product,
        serial_number,
    ))
}

/// Describes each device, skipping the ones whose descriptor cannot be read.
fn describe_all<D>(
    profile: &DeviceProfile,
    devices: &[D],
    describe: impl Fn(&D) -> Result<DeviceInfo>,
) -> Vec<DeviceInfo> {
    devices
        .iter()
        .filter_map(|device| match describe(device) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Skipping unreadable {} device: {:#}", profile.name, e);
                None
            }
        })
        .collect()
}

/// Lists connected USB devices of the given family.
pub fn list_devices(profile: &DeviceProfile) -> Result<Vec<DeviceInfo>> {
    Ok(describe_all(profile, &usb_devices(profile)?, describe))
}

fn find_usb_device(
    profile: &DeviceProfile,
    serial: Option<&str>,
) -> Result<Device<GlobalContext>> {
    let devices = usb_devices(profile)?;
    let Some(serial) = serial else {
        return devices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No {} devices found", profile.name));
    };

    let timeout = Duration::from_millis(100);
    for device in devices {
        let Ok(handle) = device.open() else { continue };
        let Ok(desc) = device.device_descriptor() else { continue };
        let Ok(langs) = handle.read_languages(timeout) else { continue };
        let Some(lang) = langs.first() else { continue };
        let found = handle.read_serial_number_string(*lang, &desc, timeout).ok();
        if found.as_deref() == Some(serial) {
            return Ok(device);
        }
    }
    Err(anyhow!("{} device with serial {} not found", profile.name, serial))
}

type Adapter = Box<dyn ProtocolAdapter + Send>;

fn open_usb(profile: &DeviceProfile, serial: Option<&str>) -> Result<Adapter> {
    let device = find_usb_device(profile, serial)?;
    let transport = UsbTransport::new(&device, 0)?;
    Ok(Box::new(transport))
}

fn open_hid(profile: &DeviceProfile, serial: Option<&str>) -> Result<Adapter> {
    Ok(Box::new(HidTransport::open(profile, serial)?))
}

/// Opens a transport for the device selected by `options`.
pub fn open_transport(options: &ConnectOptions) -> Result<Adapter> {
    let profile = options.vendor.profile();
    let serial = options.serial.as_deref();

    let mut adapter = match options.transport {
        TransportKind::Usb => open_usb(profile, serial)?,
        TransportKind::Hid => open_hid(profile, serial)?,
        TransportKind::Auto => match open_usb(profile, serial) {
            Ok(adapter) => {
                info!("Created USB transport for {}", profile.name);
                adapter
            }
            Err(usb_err) => {
                warn!(
                    "USB transport failed for {}: {}, trying HID fallback",
                    profile.name, usb_err
                );
                open_hid(profile, serial).map_err(|hid_err| {
                    anyhow!("Failed with both USB ({}) and HID ({})", usb_err, hid_err)
                })?
            }
        },
    };

    debug!("Flushing stale reports before first exchange");
    adapter.reset()?;
    Ok(adapter)
}
