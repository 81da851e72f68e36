//! Decoded sensor and actuator records.
//!
//! Every record is a plain value type. The store keeps exactly one current
//! value per category and replaces it whole on every successful decode.

use serde::Serialize;

/// Number of motors reported in an encoder batch.
pub const MOTOR_COUNT: usize = 4;

/// Number of proportional channels in an RC receiver frame.
pub const RC_CHANNELS: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Battery voltage reported through the system-info channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BatteryStatus {
    pub voltage_volts: f32,
}

/// One motor's encoder reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EncoderSample {
    pub motor_id: u8,
    pub pulse_counter: i32,
    pub speed_rps: f32,
    /// Always `speed_rps * 60`; not carried on the wire.
    pub speed_rpm: f32,
}

impl EncoderSample {
    pub fn new(motor_id: u8, pulse_counter: i32, speed_rps: f32) -> Self {
        Self {
            motor_id,
            pulse_counter,
            speed_rps,
            speed_rpm: speed_rps * 60.0,
        }
    }
}

/// The four motor readings of one encoder batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EncoderBatch(pub [EncoderSample; MOTOR_COUNT]);

impl Default for EncoderBatch {
    /// Zeroed samples with motor ids 0 through 3.
    fn default() -> Self {
        Self(std::array::from_fn(|i| EncoderSample::new(i as u8, 0, 0.0)))
    }
}

impl EncoderBatch {
    pub fn motors(&self) -> &[EncoderSample; MOTOR_COUNT] {
        &self.0
    }
}

/// Accelerometer and gyroscope reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImuSample {
    pub accel: Vec3,
    pub gyro: Vec3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GamepadState {
    /// Button bitmask.
    pub buttons: u16,
    pub hat: u8,
    pub left_stick: (i8, i8),
    pub right_stick: (i8, i8),
}

/// On-board key event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub key_id: u8,
    pub event_code: u8,
    pub event_name: String,
}

impl KeyEvent {
    pub fn new(key_id: u8, event_code: u8) -> Self {
        Self {
            key_id,
            event_code,
            event_name: key_event_name(event_code),
        }
    }
}

/// Display name for a key event code. Codes outside the table render as
/// `unknown(XX)`.
pub fn key_event_name(code: u8) -> String {
    let name = match code {
        0x01 => "press",
        0x02 => "long press",
        0x04 => "long press repeat",
        0x08 => "long press release",
        0x10 => "short release",
        0x20 => "single click",
        0x40 => "double click",
        0x80 => "triple click",
        other => return format!("unknown({other:02X})"),
    };
    name.to_string()
}

/// SBUS-style remote-control receiver frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RcReceiverFrame {
    pub channels: [i16; RC_CHANNELS],
    pub ch17: u8,
    pub ch18: u8,
    pub signal_loss: bool,
    pub fail_safe: bool,
}

/// Bus servo status, kept verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusServoStatus {
    pub raw: [u8; 7],
}

/// A decoded payload, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", content = "value", rename_all = "snake_case")]
pub enum Record {
    Battery(BatteryStatus),
    Encoders(EncoderBatch),
    Imu(ImuSample),
    Gamepad(GamepadState),
    Key(KeyEvent),
    RcReceiver(RcReceiverFrame),
    BusServo(BusServoStatus),
}

impl Record {
    /// Category name, as used in logs and CLI output.
    pub fn category(&self) -> &'static str {
        match self {
            Record::Battery(_) => "battery",
            Record::Encoders(_) => "encoders",
            Record::Imu(_) => "imu",
            Record::Gamepad(_) => "gamepad",
            Record::Key(_) => "key",
            Record::RcReceiver(_) => "rc_receiver",
            Record::BusServo(_) => "bus_servo",
        }
    }
}
