use super::{output, CliCommand, Client};
use anyhow::Result;
use clap::{ArgAction::SetTrue, Args, ValueEnum};
use hw_wallet_client::{messages::InputScriptType, utils::parse_derivation_path};
use serde_json::json;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScriptType {
    P2pkh,
    P2shP2wpkh,
    P2wpkh,
}

impl From<ScriptType> for InputScriptType {
    fn from(x: ScriptType) -> Self {
        match x {
            ScriptType::P2pkh => InputScriptType::SpendAddress,
            ScriptType::P2shP2wpkh => InputScriptType::SpendP2shWitness,
            ScriptType::P2wpkh => InputScriptType::SpendWitness,
        }
    }
}

/// Get an address for a derivation path
#[derive(Debug, Clone, Args)]
pub struct GetAddress {
    /// BIP-32 path, e.g. m/44'/0'/0'/0/0
    path: String,
    #[arg(short, long, default_value = "Bitcoin")]
    coin: String,
    #[arg(short, long, value_enum, default_value_t = ScriptType::P2pkh)]
    script_type: ScriptType,
    /// show the address on the device for confirmation
    #[arg(short = 'd', long, action = SetTrue)]
    show_display: bool,
}

impl CliCommand for GetAddress {
    fn handle(self, client: &mut Client, json: bool) -> Result<()> {
        let path = parse_derivation_path(&self.path)?;
        let address =
            client.get_address(&path, &self.coin, self.show_display, self.script_type.into())?;
        output(json, json!({ "path": self.path, "address": address }), address)
    }
}
