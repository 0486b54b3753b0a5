mod address;
mod list;
mod system;

use address::*;
use list::*;
use system::*;

use anyhow::Result;
use clap::{ArgAction::SetTrue, Parser, Subcommand, ValueEnum};
use hw_wallet_client::{ConnectOptions, HardwareClient, TerminalHandler, TransportKind, Vendor};

pub type Client = HardwareClient<TerminalHandler>;

pub trait CliCommand {
    fn handle(self, client: &mut Client, json: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VendorArg {
    Keepkey,
    Trezor,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TransportArg {
    Auto,
    Usb,
    Hid,
}

/// Command line tool for working with KeepKey and TREZOR One devices
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// show debug logging (RUST_LOG overrides)
    #[arg(short, long, default_value_t = false, action = SetTrue)]
    pub verbose: bool,
    /// print results as JSON
    #[arg(long, default_value_t = false, action = SetTrue)]
    pub json: bool,
    /// device family to talk to
    #[arg(long, value_enum, default_value_t = VendorArg::Keepkey)]
    pub vendor: VendorArg,
    /// serial number of the device to open
    #[arg(long)]
    pub serial: Option<String>,
    /// transport used for talking with the device
    #[arg(long, value_enum, default_value_t = TransportArg::Auto)]
    pub transport: TransportArg,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    List(List),
    Features(GetFeatures),
    Ping(Ping),
    SetLabel(SetLabel),
    ChangePin(ChangePin),
    GetAddress(GetAddress),
    ClearSession(ClearSession),
    Wipe(WipeDevice),
    Reset(ResetDevice),
    Recover(RecoveryDevice),
}

impl Cli {
    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            vendor: match self.vendor {
                VendorArg::Keepkey => Vendor::Keepkey,
                VendorArg::Trezor => Vendor::Trezor,
            },
            serial: self.serial.clone(),
            transport: match self.transport {
                TransportArg::Auto => TransportKind::Auto,
                TransportArg::Usb => TransportKind::Usb,
                TransportArg::Hid => TransportKind::Hid,
            },
        }
    }

    pub fn run(self) -> Result<()> {
        let options = self.connect_options();
        let json = self.json;

        let command = match self.command {
            // Listing does not open a device.
            Command::List(list) => return list.run(options.vendor.profile(), json),
            command => command,
        };

        let mut client = HardwareClient::connect(&options, TerminalHandler)?;
        match command {
            Command::List(_) => Ok(()),
            Command::Features(x) => x.handle(&mut client, json),
            Command::Ping(x) => x.handle(&mut client, json),
            Command::SetLabel(x) => x.handle(&mut client, json),
            Command::ChangePin(x) => x.handle(&mut client, json),
            Command::GetAddress(x) => x.handle(&mut client, json),
            Command::ClearSession(x) => x.handle(&mut client, json),
            Command::Wipe(x) => x.handle(&mut client, json),
            Command::Reset(x) => x.handle(&mut client, json),
            Command::Recover(x) => x.handle(&mut client, json),
        }
    }
}

/// Prints `value` as JSON, or `text` otherwise.
pub fn output(json: bool, value: serde_json::Value, text: impl std::fmt::Display) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}
