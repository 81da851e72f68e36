use std::fmt;

use bytes::Bytes;

use crate::codec::{hex_string, SYNC};

/// A frame whose trailing checksum byte did not match its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub function_code: u8,
    pub length: u8,
    pub expected: u8,
    pub received: u8,
    pub payload: Bytes,
}

impl ChecksumMismatch {
    /// The frame as it appeared on the wire, as space-separated hex.
    pub fn raw_hex(&self) -> String {
        let mut raw = Vec::with_capacity(self.payload.len() + 5);
        raw.extend_from_slice(&SYNC);
        raw.push(self.function_code);
        raw.push(self.length);
        raw.extend_from_slice(&self.payload);
        raw.push(self.received);
        hex_string(&raw)
    }
}

impl fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checksum mismatch on function 0x{:02X} (length {}): expected 0x{:02X}, received 0x{:02X}, raw [{}]",
            self.function_code,
            self.length,
            self.expected,
            self.received,
            self.raw_hex()
        )
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame checksum did not verify.
    #[error("{0}")]
    ChecksumMismatch(ChecksumMismatch),

    /// The payload does not fit in the 1-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload length disagrees with the declared length.
    #[error("payload is {actual} bytes but frame declares {declared}")]
    LengthMismatch { declared: u8, actual: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<ChecksumMismatch> for FrameError {
    fn from(value: ChecksumMismatch) -> Self {
        Self::ChecksumMismatch(value)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
