use crate::messages::{FailureType, MessageType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport or codec failed; the client is marked bad.
    #[error("device communication failed: {0:#}")]
    Transport(anyhow::Error),
    /// The user declined on the device or in a prompt.
    #[error("cancelled by user")]
    Cancelled,
    /// `code` is the raw firmware code, kept even when this crate has no
    /// name for it.
    #[error("device failure ({}): {message}", failure_name(.code))]
    Failure { code: Option<i32>, message: String },
    #[error("unexpected response from device: {0:?}")]
    UnexpectedMessage(MessageType),
    #[error("device features not loaded; call init_device first")]
    FeaturesUnavailable,
}

impl ClientError {
    /// The named failure code of a device `Failure`, if it has one.
    pub fn failure_type(&self) -> Option<FailureType> {
        match self {
            ClientError::Failure { code, .. } => code.and_then(FailureType::from_i32),
            _ => None,
        }
    }
}

fn failure_name(code: &Option<i32>) -> String {
    match code {
        Some(c) => match FailureType::from_i32(*c) {
            Some(name) => format!("{:?}", name),
            None => format!("code {}", c),
        },
        None => "no code".to_owned(),
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
