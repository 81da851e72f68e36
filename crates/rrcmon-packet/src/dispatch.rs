use std::collections::BTreeMap;

use rrcmon_frame::{function_name, Frame};
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::decode::decode_payload;
use crate::error::{DecodeError, Result};
use crate::records::Record;

/// Routes verified frames to their decoder.
///
/// Decode failures are reported as diagnostics and swallowed: the caller
/// gets `None` and keeps the previous value for that category.
#[derive(Debug, Default)]
pub struct PacketDispatcher {
    config: DispatchConfig,
    seen: BTreeMap<u8, u64>,
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            config,
            seen: BTreeMap::new(),
        }
    }

    /// Decode a frame, reporting any failure.
    pub fn dispatch(&mut self, frame: &Frame) -> Option<Record> {
        self.sample(frame);
        match self.decode(frame) {
            Ok(record) => Some(record),
            Err(err) => {
                report(&err);
                None
            }
        }
    }

    /// Decode a frame without logging or counting.
    pub fn decode(&self, frame: &Frame) -> Result<Record> {
        decode_payload(frame.function_code(), frame.payload(), &self.config)
    }

    /// Frames seen so far for `function_code`.
    pub fn seen(&self, function_code: u8) -> u64 {
        self.seen.get(&function_code).copied().unwrap_or(0)
    }

    /// Current dispatch configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn sample(&mut self, frame: &Frame) {
        let count = self.seen.entry(frame.function_code()).or_insert(0);
        *count += 1;

        let every = self.config.sample_every;
        if every > 0 && (*count - 1) % every == 0 {
            debug!(
                function_code = frame.function_code(),
                name = function_name(frame.function_code()),
                length = frame.length(),
                count = *count,
                "frame received"
            );
        }
    }
}

fn report(err: &DecodeError) {
    if err.is_malformed() {
        warn!(error = %err, "payload discarded");
    } else {
        debug!(error = %err, "payload not decoded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ImuSample;

    #[test]
    fn dispatches_valid_frame() {
        let mut dispatcher = PacketDispatcher::new();
        let frame = Frame::new(0x07, vec![0u8; 24]).unwrap();
        assert_eq!(
            dispatcher.dispatch(&frame),
            Some(Record::Imu(ImuSample::default()))
        );
        assert_eq!(dispatcher.seen(0x07), 1);
    }

    #[test]
    fn wrong_length_yields_nothing() {
        let mut dispatcher = PacketDispatcher::new();
        let frame = Frame::new(0x0A, vec![0u8; 6]).unwrap();
        assert_eq!(dispatcher.dispatch(&frame), None);
        assert!(matches!(
            dispatcher.decode(&frame),
            Err(DecodeError::LengthMismatch { actual: 6, .. })
        ));
    }

    #[test]
    fn unknown_code_yields_nothing_but_is_seen() {
        let mut dispatcher = PacketDispatcher::new();
        let frame = Frame::new(0x42, vec![1, 2, 3]).unwrap();
        assert_eq!(dispatcher.dispatch(&frame), None);
        assert_eq!(dispatcher.dispatch(&frame), None);
        assert_eq!(dispatcher.seen(0x42), 2);
        assert_eq!(dispatcher.seen(0x07), 0);
    }

    #[test]
    fn sampling_disabled_still_counts() {
        let mut dispatcher = PacketDispatcher::with_config(DispatchConfig {
            sample_every: 0,
            ..DispatchConfig::default()
        });
        let frame = Frame::new(0x06, vec![0x01, 0x01]).unwrap();
        for _ in 0..3 {
            assert!(dispatcher.dispatch(&frame).is_some());
        }
        assert_eq!(dispatcher.seen(0x06), 3);
        assert_eq!(dispatcher.config().sample_every, 0);
    }

    #[test]
    fn rc_config_flows_into_decode() {
        let dispatcher = PacketDispatcher::with_config(DispatchConfig {
            decode_rc_on_encoder_code: false,
            ..DispatchConfig::default()
        });
        let frame = Frame::new(0x0B, vec![0u8; 36]).unwrap();
        assert!(dispatcher.decode(&frame).is_err());

        let frame = Frame::new(0x0B, vec![0u8; 36]).unwrap();
        assert!(matches!(
            PacketDispatcher::new().decode(&frame),
            Ok(Record::RcReceiver(_))
        ));
    }
}
