//! Latest-value store shared between the ingest thread and presenters.
//!
//! The whole state lives in one immutable [`Snapshot`] behind an
//! [`ArcSwap`]. Writers clone, modify and swap; readers load an `Arc` and
//! never observe a half-applied update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use rrcmon_packet::{
    BatteryStatus, BusServoStatus, EncoderBatch, GamepadState, ImuSample, KeyEvent,
    RcReceiverFrame, Record,
};
use serde::Serialize;

/// A value and the capture time of the frame that last set it.
///
/// `last_update` is `None` until the first successful decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timestamped<T> {
    pub value: T,
    #[serde(serialize_with = "unix_time::serialize_opt")]
    pub last_update: Option<SystemTime>,
}

impl<T> Timestamped<T> {
    fn set(&mut self, value: T, at: SystemTime) {
        self.value = value;
        self.last_update = Some(at);
    }

    /// True once the value has been set by a decoded frame.
    pub fn is_set(&self) -> bool {
        self.last_update.is_some()
    }
}

/// Cumulative counters.
///
/// `total_packets` and `valid_packets` count frames that passed the
/// checksum, whether or not their payload decoded, so the two are always
/// equal. `crc_errors` counts frames dropped for a bad checksum; those frames
/// are not part of `total_packets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_packets: u64,
    pub valid_packets: u64,
    pub crc_errors: u64,
    pub per_type_counts: BTreeMap<u8, u64>,
    #[serde(serialize_with = "unix_time::serialize")]
    pub start_time: SystemTime,
}

impl Stats {
    fn starting_at(start_time: SystemTime) -> Self {
        Self {
            total_packets: 0,
            valid_packets: 0,
            crc_errors: 0,
            per_type_counts: BTreeMap::new(),
            start_time,
        }
    }

    fn count_frame(&mut self, function_code: u8) {
        self.total_packets += 1;
        self.valid_packets += 1;
        *self.per_type_counts.entry(function_code).or_insert(0) += 1;
    }

    /// Valid over total, as a percentage. `None` before the first frame.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_packets == 0 {
            return None;
        }
        Some(self.valid_packets as f64 / self.total_packets as f64 * 100.0)
    }

    /// Time since the store was created.
    pub fn uptime(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
    }
}

/// A point-in-time view of every category plus statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub battery: Timestamped<BatteryStatus>,
    pub encoders: Timestamped<EncoderBatch>,
    pub imu: Timestamped<ImuSample>,
    pub gamepad: Timestamped<GamepadState>,
    pub key: Timestamped<KeyEvent>,
    pub rc_receiver: Timestamped<RcReceiverFrame>,
    pub bus_servo: Timestamped<BusServoStatus>,
    pub stats: Stats,
}

impl Snapshot {
    fn empty(start_time: SystemTime) -> Self {
        Self {
            battery: Timestamped::default(),
            encoders: Timestamped::default(),
            imu: Timestamped::default(),
            gamepad: Timestamped::default(),
            key: Timestamped::default(),
            rc_receiver: Timestamped::default(),
            bus_servo: Timestamped::default(),
            stats: Stats::starting_at(start_time),
        }
    }

    fn apply(&mut self, record: Record, at: SystemTime) {
        match record {
            Record::Battery(v) => self.battery.set(v, at),
            Record::Encoders(v) => self.encoders.set(v, at),
            Record::Imu(v) => self.imu.set(v, at),
            Record::Gamepad(v) => self.gamepad.set(v, at),
            Record::Key(v) => self.key.set(v, at),
            Record::RcReceiver(v) => self.rc_receiver.set(v, at),
            Record::BusServo(v) => self.bus_servo.set(v, at),
        }
    }
}

/// Shared handle to the latest-value store. Clones share state.
#[derive(Debug, Clone)]
pub struct DataStore {
    inner: Arc<ArcSwap<Snapshot>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(Snapshot::empty(SystemTime::now()))),
        }
    }

    /// Count a frame that passed its checksum.
    pub fn record_frame(&self, function_code: u8) {
        self.update(|s| s.stats.count_frame(function_code));
    }

    /// Overwrite the record's category and its timestamp.
    pub fn apply(&self, record: Record, at: SystemTime) {
        self.update(|s| s.apply(record.clone(), at));
    }

    /// Count a frame and apply its decoded record, if any, in one swap.
    pub fn commit(&self, function_code: u8, decoded: Option<(Record, SystemTime)>) {
        self.update(|s| {
            s.stats.count_frame(function_code);
            if let Some((record, at)) = &decoded {
                s.apply(record.clone(), *at);
            }
        });
    }

    /// Count a frame dropped for a bad checksum.
    pub fn record_checksum_error(&self) {
        self.update(|s| s.stats.crc_errors += 1);
    }

    /// Consistent point-in-time read. Never blocks the writer.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.load_full()
    }

    /// Clear every category and counter. The start time is kept.
    pub fn reset(&self) {
        self.inner
            .rcu(|old| Arc::new(Snapshot::empty(old.stats.start_time)));
    }

    // `rcu` may run the closure more than once under contention.
    fn update(&self, mut f: impl FnMut(&mut Snapshot)) {
        self.inner.rcu(|old| {
            let mut next = Snapshot::clone(old);
            f(&mut next);
            Arc::new(next)
        });
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamps serialize as fractional seconds since the UNIX epoch.
mod unix_time {
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde::Serializer;

    fn seconds(t: &SystemTime) -> f64 {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        }
    }

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(seconds(t))
    }

    pub fn serialize_opt<S: Serializer>(t: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_some(&seconds(t)),
            None => s.serialize_none(),
        }
    }
}
