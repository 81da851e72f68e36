use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteSource, StreamSource};

/// Default serial device name for the controller board.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM21";
/// Default serial device name for the controller board.
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// The controller firmware streams at 1 Mbaud.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Default blocking read timeout. Bounds how long cancellation can take.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device name (`/dev/ttyUSB0`, `COM21`, ...).
    pub port: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Maximum time a single read blocks.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Config for `port` with default speed and timeout.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Override the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A serial port opened as a [`ByteSource`].
pub struct SerialSource {
    stream: StreamSource<Box<dyn SerialPort>>,
    config: SerialConfig,
}

impl SerialSource {
    /// Open the port described by `config`.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(port = %config.port, baud = config.baud_rate, "serial port opened");

        let label = format!("serial:{}@{}", config.port, config.baud_rate);
        Ok(Self {
            stream: StreamSource::with_label(port, label),
            config,
        })
    }

    /// Parameters the port was opened with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl ByteSource for SerialSource {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        self.stream.read_byte()
    }

    fn describe(&self) -> String {
        self.stream.describe()
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        debug!(port = %self.config.port, "serial port released");
    }
}

impl std::fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSource")
            .field("config", &self.config)
            .finish()
    }
}

/// Names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(|err| TransportError::Io(err.into()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
