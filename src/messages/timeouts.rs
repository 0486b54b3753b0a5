use super::Message;
use core::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(5000);
const QUICK_TIMEOUT: Duration = Duration::from_millis(5000);
// Acks that hand control to the user, who may take a while on the device.
const LONG_TIMEOUT: Duration = Duration::from_millis(5 * 60 * 1000);

impl Message {
    pub fn read_timeout(&self) -> Duration {
        match self {
            Message::ButtonAck(_)
            | Message::PinMatrixAck(_)
            | Message::PassphraseAck(_)
            | Message::WordAck(_)
            | Message::EntropyAck(_) => LONG_TIMEOUT,
            Message::Initialize(_) | Message::GetFeatures(_) => QUICK_TIMEOUT,
            _ => TIMEOUT,
        }
    }

    pub fn write_timeout(&self) -> Duration {
        match self {
            Message::Initialize(_) | Message::GetFeatures(_) => QUICK_TIMEOUT,
            _ => TIMEOUT,
        }
    }
}
