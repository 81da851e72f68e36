//! Typed payload decoding for RRC controller frames.
//!
//! A verified [`rrcmon_frame::Frame`] is routed by its function code to a
//! decoder that checks the payload length and produces a [`Record`]. Length
//! mismatches, unknown sub-commands and unknown function codes produce no
//! record; [`PacketDispatcher`] reports them through `tracing`.

pub mod config;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod records;

pub use config::DispatchConfig;
pub use decode::{decode, decode_payload};
pub use dispatch::PacketDispatcher;
pub use error::{DecodeError, ExpectedLength, Result};
pub use records::{
    key_event_name, BatteryStatus, BusServoStatus, EncoderBatch, EncoderSample, GamepadState,
    ImuSample, KeyEvent, RcReceiverFrame, Record, Vec3, MOTOR_COUNT, RC_CHANNELS,
};
