//! Frame layer of the RRC controller wire protocol.
//!
//! Every message on the link is framed as:
//! - two sync bytes `0xAA 0x55`
//! - a 1-byte function code selecting the payload layout
//! - a 1-byte payload length
//! - the payload
//! - a CRC-8 over function code, length and payload
//!
//! [`FrameParser`] consumes the stream one byte at a time and resynchronizes
//! on the next header after any corruption. [`FrameReader`] and
//! [`FrameWriter`] wrap it for `Read`/`Write` streams.

pub mod codec;
pub mod crc;
pub mod error;
pub mod function;
pub mod parser;
pub mod reader;
pub mod writer;

pub use codec::{encode_frame, hex_string, Frame, HEADER_SIZE, MAX_PAYLOAD, SYNC};
pub use crc::{checksum, Crc8};
pub use error::{ChecksumMismatch, FrameError, Result};
pub use function::{
    function_name, is_known, BUS_SERVO, ENCODER, GAMEPAD, IMU, IMU_ALT, KEY_EVENT, OLED,
    SYSTEM_INFO,
};
pub use parser::{report_mismatch, FrameParser, ParseState};
pub use reader::FrameReader;
pub use writer::FrameWriter;
