//! Live state for RRC controller telemetry.
//!
//! [`IngestLoop`] owns the byte source, the frame parser and the packet
//! dispatcher on one thread and writes every decoded record into a
//! [`DataStore`]. Presenters read [`DataStore::snapshot`] on their own
//! schedule and render it through a [`PresentationSink`].

pub mod config;
pub mod error;
pub mod ingest;
pub mod sink;
pub mod store;

pub use config::{IngestConfig, DEFAULT_JOIN_TIMEOUT};
pub use error::{MonitorError, Result};
pub use ingest::{IngestLoop, IngestState, IngestStats};
pub use sink::{PresentationSink, Presenter};
pub use store::{DataStore, Snapshot, Stats, Timestamped};
