use super::{output, CliCommand, Client};
use anyhow::Result;
use clap::{ArgAction::SetTrue, Args};
use hw_wallet_client::{features::DeviceFeatures, messages, ClientError};
use serde_json::json;

fn parse_one_of(s: &str, allowed: &[u32]) -> Result<u32, String> {
    s.parse::<u32>()
        .ok()
        .filter(|n| allowed.contains(n))
        .ok_or_else(|| format!("expected one of {:?}", allowed))
}

fn parse_strength(s: &str) -> Result<u32, String> {
    parse_one_of(s, &[128, 192, 256])
}

fn parse_word_count(s: &str) -> Result<u32, String> {
    parse_one_of(s, &[12, 18, 24])
}

/// Show the device's features
#[derive(Debug, Clone, Args)]
pub struct GetFeatures {}

impl CliCommand for GetFeatures {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        let features = DeviceFeatures::from(client.refresh_features()?);
        let supported = client.firmware_supported()?;
        if json {
            return output(true, serde_json::to_value(&features)?, "");
        }
        println!("{:#?}", features);
        if !supported {
            let (major, minor, patch) = client.profile().minimum_firmware;
            println!(
                "Firmware {} is outdated; {}.{}.{} or newer is required",
                features.version, major, minor, patch
            );
        }
        Ok(())
    }
}

/// Send a ping and print the echoed message
#[derive(Debug, Clone, Args)]
pub struct Ping {
    #[arg(default_value = "")]
    message: String,
    /// require confirmation on the device
    #[arg(short, long, action = SetTrue)]
    button_protection: bool,
}

impl CliCommand for Ping {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        let reply = client.ping(&self.message, self.button_protection)?;
        output(json, json!({ "message": reply }), reply)
    }
}

/// Change the device label
#[derive(Debug, Clone, Args)]
pub struct SetLabel {
    label: String,
}

impl CliCommand for SetLabel {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        client.change_label(&self.label)?;
        output(json, json!({ "label": self.label }), format!("Label set to {:?}", self.label))
    }
}

/// Set or remove PIN protection
#[derive(Debug, Clone, Args)]
pub struct ChangePin {
    #[arg(short, long, action = SetTrue)]
    remove: bool,
}

impl CliCommand for ChangePin {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        client.set_pin(self.remove)?;
        let text = if self.remove { "PIN removed" } else { "PIN changed" };
        output(json, json!({ "pin_protection": !self.remove }), text)
    }
}

/// Forget the cached PIN and passphrase
#[derive(Debug, Clone, Args)]
pub struct ClearSession {}

impl CliCommand for ClearSession {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        client.clear_session()?;
        output(json, json!({ "cleared": true }), "Session cleared")
    }
}

/// Erase the seed and all settings
#[derive(Debug, Clone, Args)]
pub struct WipeDevice {}

impl CliCommand for WipeDevice {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        client.wipe_device()?;
        output(json, json!({ "wiped": true }), "Device wiped")
    }
}

/// Generate a new seed on the device
#[derive(Debug, Clone, Args)]
pub struct ResetDevice {
    /// seed strength in bits
    #[arg(long, default_value_t = 256, value_parser = parse_strength)]
    strength: u32,
    #[arg(long)]
    label: Option<String>,
    #[arg(long, action = SetTrue)]
    pin_protection: bool,
    #[arg(long, action = SetTrue)]
    passphrase_protection: bool,
}

impl CliCommand for ResetDevice {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        client.reset_device(messages::ResetDevice {
            display_random: Some(false),
            strength: Some(self.strength),
            pin_protection: Some(self.pin_protection),
            passphrase_protection: Some(self.passphrase_protection),
            label: self.label,
            ..Default::default()
        })?;
        output(
            json,
            json!({ "initialized": true }),
            "Device initialized; write down the words shown on the device",
        )
    }
}

/// Restore a seed word by word
#[derive(Debug, Clone, Args)]
pub struct RecoveryDevice {
    /// number of words in the seed
    #[arg(long, default_value_t = 24, value_parser = parse_word_count)]
    words: u32,
    #[arg(long)]
    label: Option<String>,
    #[arg(long, action = SetTrue)]
    pin_protection: bool,
    #[arg(long, action = SetTrue)]
    passphrase_protection: bool,
}

impl CliCommand for RecoveryDevice {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        match client.recovery_device(messages::RecoveryDevice {
            word_count: Some(self.words),
            pin_protection: Some(self.pin_protection),
            passphrase_protection: Some(self.passphrase_protection),
            label: self.label,
            enforce_wordlist: Some(true),
            ..Default::default()
        }) {
            Ok(()) => output(json, json!({ "recovered": true }), "Device recovered"),
            Err(ClientError::Cancelled) => {
                output(json, json!({ "recovered": false }), "Recovery cancelled")
            }
            Err(e) => Err(e.into()),
        }
    }
}
