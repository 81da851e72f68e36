//! Byte sources for the RRC controller link.
//!
//! The controller streams framed telemetry over a serial line. Everything
//! above this crate only needs "give me the next byte, or tell me the read
//! timed out", which is what [`ByteSource`] provides:
//! - [`SerialSource`] reads from a serial port (behind the `serial` feature)
//! - [`StreamSource`] adapts any [`std::io::Read`] (capture files, pipes, tests)
//!
//! This is the lowest layer of rrcmon.

pub mod error;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::{ByteSource, StreamSource};

#[cfg(feature = "serial")]
pub use serial::{available_ports, SerialConfig, SerialSource};
