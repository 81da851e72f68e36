use std::fmt::Write as _;
use std::time::SystemTime;

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::Crc8;
use crate::error::{ChecksumMismatch, FrameError, Result};

/// Sync bytes that open every frame.
pub const SYNC: [u8; 2] = [0xAA, 0x55];

/// Frame header: sync (2) + function code (1) + length (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// The length field is one byte.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// A checksum-verified frame.
///
/// The payload length always equals the declared length; constructors
/// enforce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    function_code: u8,
    payload: Bytes,
    checksum: u8,
    timestamp: SystemTime,
}

impl Frame {
    /// Build a frame for `payload`, computing its checksum and stamping the
    /// current time.
    pub fn new(function_code: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let length = declared_length(payload.len())?;
        let checksum = frame_checksum(function_code, length, &payload);
        Ok(Self::verified(
            function_code,
            payload,
            checksum,
            SystemTime::now(),
        ))
    }

    /// Rebuild a frame from fields captured elsewhere, verifying both the
    /// declared length and the checksum.
    pub fn from_parts(
        function_code: u8,
        length: u8,
        payload: impl Into<Bytes>,
        checksum: u8,
        timestamp: SystemTime,
    ) -> Result<Self> {
        let payload = payload.into();
        if payload.len() != length as usize {
            return Err(FrameError::LengthMismatch {
                declared: length,
                actual: payload.len(),
            });
        }
        let expected = frame_checksum(function_code, length, &payload);
        if expected != checksum {
            return Err(ChecksumMismatch {
                function_code,
                length,
                expected,
                received: checksum,
                payload,
            }
            .into());
        }
        Ok(Self::verified(function_code, payload, checksum, timestamp))
    }

    /// Caller guarantees `payload.len() <= 255` and a matching checksum.
    pub(crate) fn verified(
        function_code: u8,
        payload: Bytes,
        checksum: u8,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            function_code,
            payload,
            checksum,
            timestamp,
        }
    }

    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    /// Declared payload length.
    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Capture time.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + 1
    }

    /// Append the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        put_frame(self.function_code, &self.payload, self.checksum, dst);
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬──────────┬────────┬──────────────────┬──────────┐
/// │ Sync (2B) │ Function │ Length │ Payload          │ CRC-8    │
/// │ 0xAA 0x55 │ (1B)     │ (1B)   │ (Length bytes)   │ (1B)     │
/// └───────────┴──────────┴────────┴──────────────────┴──────────┘
/// ```
///
/// The checksum covers function code, length and payload.
pub fn encode_frame(function_code: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = declared_length(payload.len())?;
    let checksum = frame_checksum(function_code, length, payload);
    put_frame(function_code, payload, checksum, dst);
    Ok(())
}

/// Space-separated uppercase hex, as printed in diagnostics.
pub fn hex_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, b) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02X}");
    }
    out
}

fn put_frame(function_code: u8, payload: &[u8], checksum: u8, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + payload.len() + 1);
    dst.put_slice(&SYNC);
    dst.put_u8(function_code);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(payload);
    dst.put_u8(checksum);
}

fn declared_length(len: usize) -> Result<u8> {
    u8::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: MAX_PAYLOAD,
    })
}

pub(crate) fn frame_checksum(function_code: u8, length: u8, payload: &[u8]) -> u8 {
    let mut crc = Crc8::new();
    crc.update(function_code);
    crc.update(length);
    crc.update_slice(payload);
    crc.finalize()
}
