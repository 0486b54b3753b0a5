//! Texts shown to the user while the device waits for input.

use crate::messages::{ButtonRequestType, PinMatrixRequestType};

/// Replaces the ButtonRequest code when choosing the confirmation prompt,
/// for operations whose device-side code is too generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOverride {
    Label,
    ChangePin,
    RemovePin,
}

/// Confirmation prompt for a ButtonRequest with the given code.
pub fn button_prompt(
    code: Option<i32>,
    prompt_override: Option<PromptOverride>,
    device: &str,
) -> String {
    let template = match prompt_override {
        Some(PromptOverride::Label) => "Confirm label change on {} device to continue",
        Some(PromptOverride::ChangePin) => "Confirm PIN change on {} device to continue",
        Some(PromptOverride::RemovePin) => "Confirm removal of PIN on {} device to continue",
        None => match code.and_then(ButtonRequestType::from_i32) {
            Some(ButtonRequestType::ConfirmOutput) => {
                "Confirm transaction outputs on {} device to continue"
            }
            Some(ButtonRequestType::SignTx) => "Confirm transaction fee on {} device to continue",
            Some(ButtonRequestType::ProtectCall) => {
                "Confirm message to sign on {} device to continue"
            }
            Some(ButtonRequestType::Address) => "Confirm address on {} device to continue",
            _ => "Check {} device to continue",
        },
    };
    template.replace("{}", device)
}

/// Whether the user may abort the confirmation for this code. Only the
/// transaction confirmations can be cancelled from the host.
pub fn button_cancellable(code: Option<i32>) -> bool {
    matches!(
        code.and_then(ButtonRequestType::from_i32),
        Some(ButtonRequestType::ConfirmOutput | ButtonRequestType::SignTx)
    )
}

pub fn pin_prompt(request_type: Option<i32>, device: &str) -> String {
    match request_type.and_then(PinMatrixRequestType::from_i32) {
        Some(PinMatrixRequestType::Current) => format!("Enter your current {} PIN:", device),
        Some(PinMatrixRequestType::NewFirst) => format!("Enter a new {} PIN:", device),
        Some(PinMatrixRequestType::NewSecond) => format!(
            "Please re-enter your new {} PIN.\nNote the numbers have been shuffled!",
            device
        ),
        None => format!("Please enter {} PIN", device),
    }
}

pub fn passphrase_prompt(device: &str) -> String {
    format!("Please enter your {} passphrase", device)
}

pub const WORD_PROMPT: &str = "Enter one word of mnemonic:";
