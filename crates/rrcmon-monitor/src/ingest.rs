//! The single producer: byte source → parser → dispatcher → store.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rrcmon_frame::{report_mismatch, FrameParser};
use rrcmon_packet::PacketDispatcher;
use rrcmon_transport::{ByteSource, TransportError};
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::error::{MonitorError, Result};
use crate::store::DataStore;

const THREAD_NAME: &str = "rrcmon-ingest";
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Lifecycle of an [`IngestLoop`]. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IngestState {
    Idle = 0,
    Connected = 1,
    Running = 2,
    Stopped = 3,
}

impl IngestState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => IngestState::Idle,
            1 => IngestState::Connected,
            2 => IngestState::Running,
            _ => IngestState::Stopped,
        }
    }
}

/// Point-in-time copy of the loop's own counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub bytes_read: u64,
    pub frames: u64,
    pub checksum_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    bytes_read: AtomicU64,
    frames: AtomicU64,
    checksum_errors: AtomicU64,
}

impl Counters {
    fn load(&self) -> IngestStats {
        IngestStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    cancel: AtomicBool,
    counters: Counters,
}

impl Shared {
    fn set_state(&self, state: IngestState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Drives one byte source into a [`DataStore`] on a dedicated thread.
///
/// One session per loop: after the source fails or `stop` is called the
/// loop stays [`IngestState::Stopped`]. Dropping the loop stops it.
#[derive(Debug)]
pub struct IngestLoop {
    store: DataStore,
    config: IngestConfig,
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

#[derive(Debug)]
struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl IngestLoop {
    pub fn new(store: DataStore) -> Self {
        Self::with_config(store, IngestConfig::default())
    }

    pub fn with_config(store: DataStore, config: IngestConfig) -> Self {
        Self {
            store,
            config,
            shared: Arc::new(Shared {
                state: AtomicU8::new(IngestState::Idle as u8),
                cancel: AtomicBool::new(false),
                counters: Counters::default(),
            }),
            worker: None,
        }
    }

    /// Open the byte source with `connect` and start ingesting.
    ///
    /// A failed connect leaves the loop `Stopped` and is not retried.
    pub fn start<S, F>(&mut self, connect: F) -> Result<()>
    where
        S: ByteSource + 'static,
        F: FnOnce() -> rrcmon_transport::Result<S>,
    {
        if self.state() != IngestState::Idle {
            return Err(MonitorError::AlreadyStarted);
        }

        let source = match connect() {
            Ok(source) => source,
            Err(err) => {
                self.shared.set_state(IngestState::Stopped);
                error!(error = %err, "failed to connect byte source");
                return Err(err.into());
            }
        };
        self.shared.set_state(IngestState::Connected);
        info!(source = %source.describe(), "byte source connected");

        let (done_tx, done_rx) = mpsc::channel();
        let done = DoneSignal {
            done: done_tx,
            shared: Arc::clone(&self.shared),
        };
        let session = Session {
            source,
            parser: FrameParser::new(),
            dispatcher: PacketDispatcher::with_config(self.config.dispatch),
            store: self.store.clone(),
            shared: Arc::clone(&self.shared),
        };

        self.shared.set_state(IngestState::Running);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let _done = done;
                session.run();
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    handle,
                    done: done_rx,
                });
                Ok(())
            }
            Err(err) => {
                self.shared.set_state(IngestState::Stopped);
                Err(MonitorError::ThreadSpawn(err))
            }
        }
    }

    /// Request cancellation and wait up to the configured join timeout.
    ///
    /// On timeout the thread is detached; it exits after its current read.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.cancel.store(true, Ordering::Release);
        let Some(worker) = self.worker.take() else {
            if self.state() == IngestState::Idle {
                self.shared.set_state(IngestState::Stopped);
            }
            return Ok(());
        };

        let timeout = self.config.join_timeout;
        match worker.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let joined = worker.handle.join();
                self.shared.set_state(IngestState::Stopped);
                info!("ingest stopped");
                joined.map_err(|_| MonitorError::WorkerPanicked)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "ingest thread did not stop in time");
                Err(MonitorError::JoinTimeout(timeout))
            }
        }
    }

    /// Wait for the thread to end on its own, e.g. at the end of a capture.
    /// Returns true if it has ended.
    ///
    /// A thread detached by a timed-out `stop` is still waited for, by
    /// polling the state until it leaves `Running`.
    pub fn wait(&self, timeout: Duration) -> bool {
        match &self.worker {
            Some(worker) => !matches!(
                worker.done.recv_timeout(timeout),
                Err(RecvTimeoutError::Timeout)
            ),
            None => {
                let deadline = Instant::now() + timeout;
                loop {
                    if !self.is_active() {
                        return true;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    thread::sleep(WAIT_POLL.min(deadline - now));
                }
            }
        }
    }

    fn is_active(&self) -> bool {
        matches!(
            self.state(),
            IngestState::Connected | IngestState::Running
        )
    }

    pub fn state(&self) -> IngestState {
        IngestState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Counters maintained by the ingest thread.
    pub fn counters(&self) -> IngestStats {
        self.shared.counters.load()
    }

    /// The store this loop writes into.
    pub fn store(&self) -> &DataStore {
        &self.store
    }
}

impl Drop for IngestLoop {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.stop() {
                error!(error = %err, "ingest loop did not shut down cleanly");
            }
        }
    }
}

/// Marks the loop stopped and signals the owner when the ingest thread
/// exits, including by panic.
struct DoneSignal {
    done: Sender<()>,
    shared: Arc<Shared>,
}

impl Drop for DoneSignal {
    fn drop(&mut self) {
        self.shared.set_state(IngestState::Stopped);
        let _ = self.done.send(());
    }
}

struct Session<S> {
    source: S,
    parser: FrameParser,
    dispatcher: PacketDispatcher,
    store: DataStore,
    shared: Arc<Shared>,
}

impl<S: ByteSource> Session<S> {
    fn run(mut self) {
        let counters = &self.shared.counters;
        while !self.shared.cancel.load(Ordering::Acquire) {
            let byte = match self.source.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => continue,
                Err(TransportError::Closed) => {
                    info!(source = %self.source.describe(), "byte source closed");
                    break;
                }
                Err(err) => {
                    error!(source = %self.source.describe(), error = %err, "read failed, ingest stopping");
                    break;
                }
            };
            counters.bytes_read.fetch_add(1, Ordering::Relaxed);

            match self.parser.feed(byte) {
                Ok(None) => {}
                Ok(Some(frame)) => {
                    counters.frames.fetch_add(1, Ordering::Relaxed);
                    let decoded = self
                        .dispatcher
                        .dispatch(&frame)
                        .map(|record| (record, frame.timestamp()));
                    self.store.commit(frame.function_code(), decoded);
                }
                Err(mismatch) => {
                    counters.checksum_errors.fetch_add(1, Ordering::Relaxed);
                    report_mismatch(&mismatch);
                    self.store.record_checksum_error();
                }
            }
        }
        self.shared.set_state(IngestState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::SystemTime;

    use rrcmon_frame::FrameWriter;
    use rrcmon_transport::StreamSource;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn capture(build: impl FnOnce(&mut FrameWriter<Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        build(&mut writer);
        writer.into_inner().into_inner()
    }

    fn replay(bytes: Vec<u8>) -> (IngestLoop, DataStore) {
        let store = DataStore::new();
        let mut ingest = IngestLoop::new(store.clone());
        ingest
            .start(|| Ok(StreamSource::new(Cursor::new(bytes))))
            .unwrap();
        assert!(ingest.wait(WAIT));
        (ingest, store)
    }

    /// Times out forever; optionally slow.
    struct IdleSource {
        delay: Duration,
    }

    impl ByteSource for IdleSource {
        fn read_byte(&mut self) -> rrcmon_transport::Result<Option<u8>> {
            thread::sleep(self.delay);
            Ok(None)
        }

        fn describe(&self) -> String {
            "idle".to_string()
        }
    }

    /// Delivers bytes sent from the test; closes when the sender is dropped.
    struct ChannelSource {
        rx: Receiver<u8>,
    }

    impl ByteSource for ChannelSource {
        fn read_byte(&mut self) -> rrcmon_transport::Result<Option<u8>> {
            match self.rx.recv_timeout(Duration::from_millis(10)) {
                Ok(byte) => Ok(Some(byte)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
            }
        }

        fn describe(&self) -> String {
            "channel".to_string()
        }
    }

    fn wait_for_packets(store: &DataStore, total: u64) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if store.snapshot().stats.total_packets >= total {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    struct FailingSource;

    impl ByteSource for FailingSource {
        fn read_byte(&mut self) -> rrcmon_transport::Result<Option<u8>> {
            Err(TransportError::Io(std::io::Error::other("unplugged")))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn replays_capture_into_store() {
        let bytes = capture(|w| {
            w.write_raw(&[0x00, 0x13, 0x55]).unwrap();
            w.send(0x00, &[0x04, 0x4C, 0x1D]).unwrap();
            w.send(0x07, &[0u8; 24]).unwrap();
            w.write_raw(&[0xAA, 0x01]).unwrap();
            w.send(0x06, &[0x05, 0x20]).unwrap();
            w.send(0x0C, &[0x01]).unwrap();
        });

        let (ingest, store) = replay(bytes.clone());
        assert_eq!(ingest.state(), IngestState::Stopped);

        let snap = store.snapshot();
        assert_eq!(snap.battery.value.voltage_volts, 7.5);
        assert!(snap.imu.is_set());
        assert_eq!(snap.key.value.event_name, "single click");
        assert_eq!(snap.stats.total_packets, 4);
        assert_eq!(snap.stats.per_type_counts.get(&0x0C), Some(&1));

        let counters = ingest.counters();
        assert_eq!(counters.bytes_read, bytes.len() as u64);
        assert_eq!(counters.frames, 4);
        assert_eq!(counters.checksum_errors, 0);
    }

    #[test]
    fn bad_checksum_never_mutates_store() {
        let mut bytes = capture(|w| w.send(0x07, &[0u8; 24]).unwrap());
        let last = bytes.len() - 1;
        bytes[last] ^= 0x5A;

        let (ingest, store) = replay(bytes);
        let snap = store.snapshot();
        assert_eq!(snap.imu.last_update, None);
        assert_eq!(snap.stats.total_packets, 0);
        assert_eq!(snap.stats.crc_errors, 1);
        assert_eq!(ingest.counters().checksum_errors, 1);
    }

    #[test]
    fn wrong_length_payload_keeps_previous_value() {
        let mut imu = Vec::new();
        for v in [1.0f32, 0.0, 0.0, 0.0, 0.0, 0.0] {
            imu.extend_from_slice(&v.to_le_bytes());
        }

        let (tx, rx) = mpsc::channel();
        let store = DataStore::new();
        let mut ingest = IngestLoop::new(store.clone());
        ingest.start(|| Ok(ChannelSource { rx })).unwrap();

        for b in capture(|w| w.send(0x07, &imu).unwrap()) {
            tx.send(b).unwrap();
        }
        assert!(wait_for_packets(&store, 1));
        let first_update = store.snapshot().imu.last_update;
        assert!(first_update.is_some());

        for b in capture(|w| w.send(0x07, &[0u8; 20]).unwrap()) {
            tx.send(b).unwrap();
        }
        assert!(wait_for_packets(&store, 2));

        let snap = store.snapshot();
        assert_eq!(snap.imu.value.accel.x, 1.0);
        assert_eq!(snap.imu.last_update, first_update);
        assert_eq!(snap.stats.per_type_counts.get(&0x07), Some(&2));

        drop(tx);
        assert!(ingest.wait(WAIT));
        ingest.stop().unwrap();
    }

    #[test]
    fn panicking_source_ends_in_stopped() {
        struct PanickingSource;

        impl ByteSource for PanickingSource {
            fn read_byte(&mut self) -> rrcmon_transport::Result<Option<u8>> {
                panic!("source failed");
            }

            fn describe(&self) -> String {
                "panicking".to_string()
            }
        }

        let mut ingest = IngestLoop::new(DataStore::new());
        ingest.start(|| Ok(PanickingSource)).unwrap();
        assert!(ingest.wait(WAIT));
        assert_eq!(ingest.state(), IngestState::Stopped);

        let err = ingest.stop().unwrap_err();
        assert!(matches!(err, MonitorError::WorkerPanicked));
        assert_eq!(ingest.state(), IngestState::Stopped);
    }

    #[test]
    fn encoder_batch_end_to_end() {
        let mut payload = vec![0x10];
        for (id, counter, rps) in [(0u8, 0i32, 0.0f32), (1, 0, 0.0), (2, 1000, 10.0), (3, 0, 0.0)] {
            payload.push(id);
            payload.extend_from_slice(&counter.to_le_bytes());
            payload.extend_from_slice(&rps.to_le_bytes());
        }
        let bytes = capture(|w| w.send(0x0B, &payload).unwrap());

        let (_ingest, store) = replay(bytes);
        let snap = store.snapshot();
        assert_eq!(snap.encoders.value.motors()[2].speed_rpm, 600.0);
        assert!(!snap.rc_receiver.is_set());
    }

    #[test]
    fn failed_connect_leaves_loop_stopped() {
        let mut ingest = IngestLoop::new(DataStore::new());
        let err = ingest
            .start(|| Err::<IdleSource, _>(TransportError::Closed))
            .unwrap_err();
        assert!(matches!(err, MonitorError::Transport(TransportError::Closed)));
        assert_eq!(ingest.state(), IngestState::Stopped);

        let err = ingest
            .start(|| Ok(IdleSource { delay: Duration::ZERO }))
            .unwrap_err();
        assert!(matches!(err, MonitorError::AlreadyStarted));
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut ingest = IngestLoop::new(DataStore::new());
        ingest
            .start(|| Ok(IdleSource { delay: Duration::from_millis(1) }))
            .unwrap();
        assert_eq!(ingest.state(), IngestState::Running);

        let err = ingest
            .start(|| Ok(IdleSource { delay: Duration::ZERO }))
            .unwrap_err();
        assert!(matches!(err, MonitorError::AlreadyStarted));
        ingest.stop().unwrap();
    }

    #[test]
    fn stop_cancels_idle_source() {
        let mut ingest = IngestLoop::new(DataStore::new());
        ingest
            .start(|| Ok(IdleSource { delay: Duration::from_millis(5) }))
            .unwrap();
        assert!(!ingest.wait(Duration::from_millis(20)));

        let started = Instant::now();
        ingest.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(ingest.state(), IngestState::Stopped);
    }

    #[test]
    fn stop_times_out_on_slow_source() {
        let config = IngestConfig {
            join_timeout: Duration::from_millis(50),
            ..IngestConfig::default()
        };
        let mut ingest = IngestLoop::with_config(DataStore::new(), config);
        ingest
            .start(|| Ok(IdleSource { delay: Duration::from_millis(500) }))
            .unwrap();
        thread::sleep(Duration::from_millis(10));

        let err = ingest.stop().unwrap_err();
        assert!(matches!(err, MonitorError::JoinTimeout(d) if d == Duration::from_millis(50)));
    }

    #[test]
    fn wait_after_timed_out_stop_tracks_detached_thread() {
        let config = IngestConfig {
            join_timeout: Duration::from_millis(20),
            ..IngestConfig::default()
        };
        let mut ingest = IngestLoop::with_config(DataStore::new(), config);
        ingest
            .start(|| Ok(IdleSource { delay: Duration::from_millis(300) }))
            .unwrap();
        thread::sleep(Duration::from_millis(10));

        assert!(matches!(ingest.stop(), Err(MonitorError::JoinTimeout(_))));
        assert_eq!(ingest.state(), IngestState::Running);
        assert!(!ingest.wait(Duration::ZERO));

        assert!(ingest.wait(WAIT));
        assert_eq!(ingest.state(), IngestState::Stopped);
    }

    #[test]
    fn read_error_stops_loop() {
        let mut ingest = IngestLoop::new(DataStore::new());
        ingest.start(|| Ok(FailingSource)).unwrap();
        assert!(ingest.wait(WAIT));
        assert_eq!(ingest.state(), IngestState::Stopped);
        ingest.stop().unwrap();
    }

    #[test]
    fn source_released_when_thread_exits() {
        struct Tracked(Arc<Mutex<bool>>);
        impl ByteSource for Tracked {
            fn read_byte(&mut self) -> rrcmon_transport::Result<Option<u8>> {
                Err(TransportError::Closed)
            }
            fn describe(&self) -> String {
                "tracked".to_string()
            }
        }
        impl Drop for Tracked {
            fn drop(&mut self) {
                *self.0.lock().unwrap() = true;
            }
        }

        let released = Arc::new(Mutex::new(false));
        let mut ingest = IngestLoop::new(DataStore::new());
        let flag = Arc::clone(&released);
        ingest.start(move || Ok(Tracked(flag))).unwrap();
        ingest.stop().unwrap();
        assert!(*released.lock().unwrap());
    }

    #[test]
    fn stop_before_start_is_harmless() {
        let mut ingest = IngestLoop::new(DataStore::new());
        ingest.stop().unwrap();
        assert_eq!(ingest.state(), IngestState::Stopped);
        assert!(ingest.wait(Duration::ZERO));
        assert!(ingest.store().snapshot().stats.start_time <= SystemTime::now());
    }
}
