//! Telemetry monitor for RRC robot controller boards.
//!
//! The controller streams `0xAA 0x55`-framed, CRC-8 checked packets over a
//! serial link. rrcmon parses the stream, decodes each packet into a typed
//! record and keeps the latest value of every category in a lock-free
//! snapshot store.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte sources (serial port, capture files, any `Read`)
//! - [`frame`]: CRC-8, the frame parser state machine, frame reader/writer
//! - [`packet`]: Typed records and the function-code dispatcher
//! - [`monitor`]: Snapshot store, ingest loop and presentation sinks

/// Re-export transport types.
pub mod transport {
    pub use rrcmon_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rrcmon_frame::*;
}

/// Re-export packet types.
pub mod packet {
    pub use rrcmon_packet::*;
}

/// Re-export monitor types.
pub mod monitor {
    pub use rrcmon_monitor::*;
}
