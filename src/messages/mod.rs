mod encoding;
mod macros;
mod protos;
mod timeouts;

pub use encoding::{CodecError, HEADER_LEN};
pub use protos::*;

use macros::wire_message;

wire_message!(
    // Core device messages
    Initialize = 0,
    Ping = 1,
    Success = 2,
    Failure = 3,
    GetFeatures = 55,
    Features = 17,
    Cancel = 20,
    ClearSession = 24,

    // Device management
    ChangePin = 4,
    WipeDevice = 5,
    ApplySettings = 25,

    // Entropy and random
    GetEntropy = 9,
    Entropy = 10,
    EntropyRequest = 35,
    EntropyAck = 36,

    // Setup and recovery
    ResetDevice = 14,
    RecoveryDevice = 45,
    WordRequest = 46,
    WordAck = 47,

    // PIN and passphrase
    PinMatrixRequest = 18,
    PinMatrixAck = 19,
    PassphraseRequest = 41,
    PassphraseAck = 42,

    // Button confirmation
    ButtonRequest = 26,
    ButtonAck = 27,

    // Bitcoin
    GetAddress = 29,
    Address = 30,
);

impl Message {
    /// Messages whose payload carries user secrets.
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Message::PinMatrixAck(_)
                | Message::PassphraseAck(_)
                | Message::WordAck(_)
                | Message::EntropyAck(_)
        )
    }
}

impl core::fmt::Debug for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_sensitive() {
            write!(f, "{:?} {{ <redacted> }}", self.message_type())
        } else {
            self.fmt_payload(f)
        }
    }
}
