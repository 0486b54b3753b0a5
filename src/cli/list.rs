use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use hw_wallet_client::{device::list_devices, DeviceProfile};

/// List connected devices
#[derive(Debug, Clone, Args)]
pub struct List {}

impl List {
    pub fn run(self, profile: &DeviceProfile, json: bool) -> Result<()> {
        let devices = list_devices(profile)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&devices)?);
            return Ok(());
        }
        if devices.is_empty() {
            println!("No {} devices found", profile.name);
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(["Device ID", "Name", "VID:PID", "Serial"]);
        for device in devices {
            table.add_row([
                device.unique_id,
                device.name,
                format!("{:04x}:{:04x}", device.vid, device.pid),
                device.serial_number.unwrap_or_else(|| "<unknown>".to_owned()),
            ]);
        }
        println!("{}", table);
        Ok(())
    }
}
