//! Headless hardware wallet client for KeepKey and TREZOR One devices.
//!
//! A [`HardwareClient`] combines a transport, a vendor [`DeviceProfile`] and a
//! UI [`DeviceHandler`] that answers the device's button, PIN, passphrase and
//! word requests.

pub mod client;
pub mod device;
pub mod error;
pub mod features;
pub mod handler;
pub mod messages;
pub mod prompts;
pub mod transport;
pub mod utils;

pub use client::HardwareClient;
pub use device::{ConnectOptions, DeviceProfile, TransportKind, Vendor, KEEPKEY, TREZOR_ONE};
pub use error::ClientError;
pub use handler::{CancelHandle, DeviceHandler, TerminalHandler};
