use std::time::Duration;

use rrcmon_packet::DispatchConfig;

/// Default upper bound on waiting for the ingest thread to exit.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Controls the ingest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// How long `stop` waits for the ingest thread. Cancellation is only
    /// observed between byte reads, so this should exceed the source's read
    /// timeout.
    pub join_timeout: Duration,
    /// Passed to the loop's packet dispatcher.
    pub dispatch: DispatchConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            dispatch: DispatchConfig::default(),
        }
    }
}
