//! The UI side of a device exchange.

use std::io::{stdin, stderr, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets the UI abort a pending on-device confirmation. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns whether a cancel was pending, clearing it.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Prompts raised by the device during an exchange.
///
/// Returning `None` from a getter makes the client answer the device with
/// `Cancel`.
pub trait DeviceHandler {
    /// Tells the user to act on the device. `cancel` is present when the
    /// confirmation can be aborted from the host.
    ///
    /// The client checks `cancel` once, right after this returns, and then
    /// blocks reading the device's answer. A cancel triggered after that
    /// point is not seen until the next cancellable confirmation, and is
    /// dropped at the start of the next call. An implementation that wants
    /// the user's choice to count must block here until the user decides.
    fn show_message(&self, message: &str, cancel: Option<CancelHandle>);
    /// The PIN as positions on the scrambled 3x3 matrix shown by the device.
    fn get_pin(&self, prompt: &str) -> Option<String>;
    fn get_passphrase(&self, prompt: &str) -> Option<String>;
    fn get_word(&self, prompt: &str) -> Option<String>;
}

const PIN_MATRIX_LEGEND: &str = "    7 8 9\n    4 5 6\n    1 2 3";

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalHandler;

impl TerminalHandler {
    fn read_line(prompt: &str) -> Option<String> {
        eprint!("{} ", prompt);
        stderr().flush().ok()?;
        let mut line = String::new();
        match stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
        }
    }
}

/// A matrix PIN is one to nine positions, each 1-9.
pub fn is_valid_matrix_pin(pin: &str) -> bool {
    (1..=9).contains(&pin.len()) && pin.chars().all(|c| ('1'..='9').contains(&c))
}

impl DeviceHandler for TerminalHandler {
    fn show_message(&self, message: &str, cancel: Option<CancelHandle>) {
        eprintln!("{}", message);
        if cancel.is_some() {
            eprintln!("(reject on the device to cancel)");
        }
    }

    fn get_pin(&self, prompt: &str) -> Option<String> {
        eprintln!(
            "{}\nUse the numeric keypad layout to describe number positions:\n{}",
            prompt, PIN_MATRIX_LEGEND
        );
        loop {
            let pin = Self::read_line("PIN:")?;
            let pin = pin.trim();
            if pin.is_empty() {
                return None;
            }
            if is_valid_matrix_pin(pin) {
                return Some(pin.to_owned());
            }
            eprintln!("Only the digits 1-9 are allowed, at most 9 of them.");
        }
    }

    fn get_passphrase(&self, prompt: &str) -> Option<String> {
        Self::read_line(&format!("{}:", prompt))
    }

    fn get_word(&self, prompt: &str) -> Option<String> {
        let word = Self::read_line(prompt)?;
        let word = word.trim().to_lowercase();
        (!word.is_empty()).then_some(word)
    }
}
