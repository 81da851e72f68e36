use std::time::Duration;

/// Errors that can occur while running the ingest loop.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The byte source could not be opened.
    #[error("transport error: {0}")]
    Transport(#[from] rrcmon_transport::TransportError),

    /// `start` was called on a loop that already ran.
    #[error("ingest loop already started")]
    AlreadyStarted,

    /// The ingest thread did not exit in time after cancellation.
    #[error("ingest thread did not stop within {0:?}")]
    JoinTimeout(Duration),

    /// The ingest thread could not be spawned.
    #[error("failed to spawn ingest thread: {0}")]
    ThreadSpawn(std::io::Error),

    /// The ingest thread panicked.
    #[error("ingest thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
