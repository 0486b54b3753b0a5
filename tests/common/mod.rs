#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hw_wallet_client::handler::{CancelHandle, DeviceHandler};
use hw_wallet_client::messages::{self, ButtonRequestType, FailureType, Message};
use hw_wallet_client::transport::Transport;
use hw_wallet_client::{DeviceProfile, HardwareClient};
use mockall::mock;

mock! {
    pub Ui {}
    impl DeviceHandler for Ui {
        fn show_message(&self, message: &str, cancel: Option<CancelHandle>);
        fn get_pin(&self, prompt: &str) -> Option<String>;
        fn get_passphrase(&self, prompt: &str) -> Option<String>;
        fn get_word(&self, prompt: &str) -> Option<String>;
    }
}

pub enum Reply {
    Message(Message),
    /// Bytes handed to the host as-is, for malformed frames.
    Raw(Vec<u8>),
}

#[derive(Default)]
pub struct DeviceState {
    /// Every message the host wrote, in order.
    pub sent: Vec<Message>,
    /// Replies handed out one per read; an exhausted script fails the read.
    pub replies: VecDeque<Reply>,
}

/// In-memory device speaking the framed wire protocol.
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl ScriptedDevice {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        let device = Self::default();
        device.push_replies(replies);
        device
    }

    pub fn sent(&self) -> Vec<Message> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn push_replies(&self, replies: impl IntoIterator<Item = Message>) {
        let mut state = self.state.lock().unwrap();
        state.replies.extend(replies.into_iter().map(Reply::Message));
    }

    pub fn push_raw(&self, frame: &[u8]) {
        self.state.lock().unwrap().replies.push_back(Reply::Raw(frame.to_vec()));
    }

    pub fn pending_replies(&self) -> usize {
        self.state.lock().unwrap().replies.len()
    }
}

impl Transport for ScriptedDevice {
    type Error = io::Error;

    fn write(&mut self, msg: &[u8], _timeout: Duration) -> Result<usize, Self::Error> {
        let decoded = Message::decode(&mut &msg[..])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.state.lock().unwrap().sent.push(decoded);
        Ok(msg.len())
    }

    fn read(&mut self, buf: &mut Vec<u8>, _timeout: Duration) -> Result<(), Self::Error> {
        let reply = self
            .state
            .lock()
            .unwrap()
            .replies
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "device did not answer"))?;
        match reply {
            Reply::Message(msg) => msg
                .encode(buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Reply::Raw(frame) => {
                buf.extend_from_slice(&frame);
                Ok(())
            }
        }
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub fn client_with(
    profile: DeviceProfile,
    replies: impl IntoIterator<Item = Message>,
    ui: MockUi,
) -> (HardwareClient<MockUi>, ScriptedDevice) {
    let device = ScriptedDevice::new(replies);
    let client = HardwareClient::new(Box::new(device.clone()), profile, ui);
    (client, device)
}

pub fn button_request(code: ButtonRequestType) -> Message {
    let mut request = messages::ButtonRequest::default();
    request.set_code(code);
    request.into()
}

pub fn pin_request(kind: messages::PinMatrixRequestType) -> Message {
    messages::PinMatrixRequest {
        r#type: Some(kind as i32),
    }
    .into()
}

pub fn success(message: &str) -> Message {
    messages::Success {
        message: Some(message.to_owned()),
    }
    .into()
}

pub fn failure(code: FailureType, message: &str) -> Message {
    let mut failure = messages::Failure {
        message: Some(message.to_owned()),
        ..Default::default()
    };
    failure.set_code(code);
    failure.into()
}

pub fn features(major: u32, minor: u32, patch: u32) -> Message {
    messages::Features {
        vendor: Some("keepkey.com".to_owned()),
        major_version: Some(major),
        minor_version: Some(minor),
        patch_version: Some(patch),
        initialized: Some(true),
        label: Some("My Wallet".to_owned()),
        ..Default::default()
    }
    .into()
}
