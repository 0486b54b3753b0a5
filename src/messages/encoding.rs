use super::{Message, MessageType};
use thiserror::Error;

/// `##` magic, then a big-endian `u16` message type and `u32` payload length.
pub const HEADER_LEN: usize = 8;
const MAGIC: [u8; 2] = *b"##";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame does not start with '##' (got {0:02x} {1:02x})")]
    BadMagic(u8, u8),
    #[error("frame truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unknown message type {0}")]
    UnknownType(u16),
    #[error("payload of {0} bytes does not fit in a frame")]
    TooLarge(usize),
    #[error("protobuf encode failed: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl Message {
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload_len()
    }

    /// Appends one frame to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        let payload_len = self.payload_len();
        let len = u32::try_from(payload_len).map_err(|_| CodecError::TooLarge(payload_len))?;

        buf.reserve(HEADER_LEN + payload_len);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&self.message_type().id().to_be_bytes());
        buf.extend_from_slice(&len.to_be_bytes());
        self.encode_payload(buf)?;
        Ok(())
    }

    /// Reads one frame from the front of `buf` and advances it past the frame.
    pub fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let (message_type, payload_len) = Self::decode_header(buf)?;
        let total = HEADER_LEN + payload_len;
        if buf.len() < total {
            return Err(CodecError::Truncated {
                expected: total,
                actual: buf.len(),
            });
        }

        let message_type =
            MessageType::from_u16(message_type).ok_or(CodecError::UnknownType(message_type))?;
        let msg = Self::decode_payload(message_type, &buf[HEADER_LEN..total])?;
        *buf = &buf[total..];
        Ok(msg)
    }

    /// Parses the frame header, returning the raw type id and payload length.
    pub fn decode_header(buf: &[u8]) -> Result<(u16, usize), CodecError> {
        if buf.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }
        if buf[..2] != MAGIC {
            return Err(CodecError::BadMagic(buf[0], buf[1]));
        }
        let message_type = u16::from_be_bytes([buf[2], buf[3]]);
        let payload_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        Ok((message_type, payload_len))
    }
}
