//! Report-level framing shared by the USB and HID transports.
//!
//! A frame (`##`, type, length, payload) travels as a run of fixed-size
//! reports. Every report starts with `?` and is zero-padded to the report
//! size; the receiver knows where the frame ends from its header.

use crate::messages::{CodecError, Message, HEADER_LEN};
use thiserror::Error;

pub const REPORT_MARKER: u8 = b'?';

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("report does not start with '?'")]
    MissingMarker,
    #[error("empty report")]
    EmptyReport,
    #[error("invalid frame header: {0}")]
    Header(#[from] CodecError),
}

/// Splits `frame` into `report_size`-byte reports.
pub fn split_reports(frame: &[u8], report_size: usize) -> impl Iterator<Item = Vec<u8>> + '_ {
    frame.chunks(report_size.saturating_sub(1).max(1)).map(move |chunk| {
        let mut report = Vec::with_capacity(report_size);
        report.push(REPORT_MARKER);
        report.extend_from_slice(chunk);
        report.resize(report_size.max(report.len()), 0);
        report
    })
}

/// Collects reports until a complete frame has been received.
#[derive(Debug, Default)]
pub struct Reassembler {
    frame: Vec<u8>,
    expected: Option<usize>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one report. Returns `true` once the frame is complete.
    pub fn push(&mut self, report: &[u8]) -> Result<bool, FramingError> {
        let (&marker, data) = report.split_first().ok_or(FramingError::EmptyReport)?;
        if marker != REPORT_MARKER {
            return Err(FramingError::MissingMarker);
        }
        self.frame.extend_from_slice(data);

        if self.expected.is_none() && self.frame.len() >= HEADER_LEN {
            let (_, payload_len) = Message::decode_header(&self.frame)?;
            self.expected = Some(HEADER_LEN + payload_len);
        }

        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.expected, Some(n) if self.frame.len() >= n)
    }

    /// Bytes still missing, if the header has been seen.
    pub fn remaining(&self) -> Option<usize> {
        self.expected.map(|n| n.saturating_sub(self.frame.len()))
    }

    /// The frame without report padding.
    pub fn into_frame(mut self) -> Vec<u8> {
        if let Some(n) = self.expected {
            self.frame.truncate(n);
        }
        self.frame
    }
}
