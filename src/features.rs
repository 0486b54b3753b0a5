use serde::{Deserialize, Serialize};

use crate::messages::Features;

/// Summary of the device's `Features` for printing and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFeatures {
    pub label: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub firmware_variant: Option<String>,
    pub device_id: Option<String>,
    pub language: Option<String>,
    pub bootloader_mode: bool,
    /// `major.minor.patch`
    pub version: String,
    /// Hex encoded.
    pub firmware_hash: Option<String>,
    /// Hex encoded.
    pub bootloader_hash: Option<String>,
    pub initialized: bool,
    pub imported: Option<bool>,
    /// Set when the seed was never written down during setup.
    pub no_backup: bool,
    pub pin_protection: bool,
    pub pin_cached: bool,
    pub passphrase_protection: bool,
    pub passphrase_cached: bool,
}

impl From<&Features> for DeviceFeatures {
    fn from(features: &Features) -> Self {
        Self {
            label: features.label.clone(),
            vendor: features.vendor.clone(),
            model: features.model.clone(),
            firmware_variant: features.firmware_variant.clone(),
            device_id: features.device_id.clone(),
            language: features.language.clone(),
            bootloader_mode: features.bootloader_mode(),
            version: format!(
                "{}.{}.{}",
                features.major_version(),
                features.minor_version(),
                features.patch_version()
            ),
            firmware_hash: features.firmware_hash.as_ref().map(hex::encode),
            bootloader_hash: features.bootloader_hash.as_ref().map(hex::encode),
            initialized: features.initialized(),
            imported: features.imported,
            no_backup: features.no_backup(),
            pin_protection: features.pin_protection(),
            pin_cached: features.pin_cached(),
            passphrase_protection: features.passphrase_protection(),
            passphrase_cached: features.passphrase_cached(),
        }
    }
}
