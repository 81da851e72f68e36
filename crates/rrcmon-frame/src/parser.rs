use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use tracing::warn;

use crate::codec::{frame_checksum, Frame, MAX_PAYLOAD, SYNC};
use crate::error::ChecksumMismatch;

/// Position of the parser within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    WaitHeader1,
    WaitHeader2,
    WaitFunction,
    WaitLength,
    ReadData,
    ReadChecksum,
}

/// Byte-at-a-time frame parser.
///
/// Feed it the raw link stream; it emits a [`Frame`] each time a complete
/// frame with a valid checksum has been consumed. Garbage, truncated frames
/// and bad checksums are dropped and the parser waits for the next
/// `0xAA 0x55` header.
#[derive(Debug)]
pub struct FrameParser {
    state: ParseState,
    function_code: u8,
    length: u8,
    payload: BytesMut,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitHeader1,
            function_code: 0,
            length: 0,
            payload: BytesMut::with_capacity(MAX_PAYLOAD),
        }
    }

    /// Current state.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Drop any partial frame and wait for a header.
    pub fn reset(&mut self) {
        self.state = ParseState::WaitHeader1;
        self.function_code = 0;
        self.length = 0;
        self.payload.clear();
    }

    /// Consume one byte.
    ///
    /// Returns `Ok(Some(frame))` when this byte completed a valid frame and
    /// `Err` when it completed a frame whose checksum did not match. Either
    /// way the parser is back in [`ParseState::WaitHeader1`] afterwards.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, ChecksumMismatch> {
        match self.state {
            ParseState::WaitHeader1 => {
                if byte == SYNC[0] {
                    self.state = ParseState::WaitHeader2;
                }
            }
            ParseState::WaitHeader2 => {
                if byte == SYNC[1] {
                    self.state = ParseState::WaitFunction;
                } else {
                    self.reset();
                }
            }
            ParseState::WaitFunction => {
                self.function_code = byte;
                self.state = ParseState::WaitLength;
            }
            ParseState::WaitLength => {
                self.length = byte;
                self.payload.clear();
                self.state = if byte == 0 {
                    ParseState::ReadChecksum
                } else {
                    ParseState::ReadData
                };
            }
            ParseState::ReadData => {
                self.payload.put_u8(byte);
                if self.payload.len() == self.length as usize {
                    self.state = ParseState::ReadChecksum;
                }
            }
            ParseState::ReadChecksum => {
                let result = self.finish(byte);
                self.reset();
                return result.map(Some);
            }
        }
        Ok(None)
    }

    /// Consume one byte, reporting checksum mismatches as diagnostics.
    pub fn consume_byte(&mut self, byte: u8) -> Option<Frame> {
        match self.feed(byte) {
            Ok(frame) => frame,
            Err(mismatch) => {
                report_mismatch(&mismatch);
                None
            }
        }
    }

    /// Consume a chunk, returning every valid frame it completed in order.
    pub fn consume_slice(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| self.consume_byte(b)).collect()
    }

    fn finish(&mut self, received: u8) -> Result<Frame, ChecksumMismatch> {
        let expected = frame_checksum(self.function_code, self.length, &self.payload);
        let payload = self.payload.split().freeze();

        if expected == received {
            Ok(Frame::verified(
                self.function_code,
                payload,
                received,
                SystemTime::now(),
            ))
        } else {
            Err(ChecksumMismatch {
                function_code: self.function_code,
                length: self.length,
                expected,
                received,
                payload,
            })
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit the checksum-mismatch diagnostic.
pub fn report_mismatch(mismatch: &ChecksumMismatch) {
    warn!(
        function_code = mismatch.function_code,
        length = mismatch.length,
        expected = mismatch.expected,
        received = mismatch.received,
        raw = %mismatch.raw_hex(),
        "checksum mismatch, frame discarded"
    );
}
