/// Errors that can occur while acquiring or reading a byte source.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The serial port could not be opened.
    #[cfg(feature = "serial")]
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// A capture file could not be opened.
    #[error("failed to open {path}: {source}")]
    OpenFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred while reading the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source reached end of stream or was unplugged.
    #[error("byte source closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
