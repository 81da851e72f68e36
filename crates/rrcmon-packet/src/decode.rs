//! Payload decoders, one per layout. All multi-byte fields are little-endian.

use bytes::Buf;
use rrcmon_frame::{
    hex_string, Frame, BUS_SERVO, ENCODER, GAMEPAD, IMU, IMU_ALT, KEY_EVENT, OLED,
    SYSTEM_INFO,
};

use crate::config::DispatchConfig;
use crate::error::{DecodeError, ExpectedLength, Result};
use crate::records::{
    BatteryStatus, BusServoStatus, EncoderBatch, EncoderSample, GamepadState, ImuSample,
    KeyEvent, RcReceiverFrame, Record, Vec3, RC_CHANNELS,
};

/// System-info sub-command carrying the battery voltage.
pub const SUB_BATTERY: u8 = 0x04;

/// Encoder sub-command for a four-motor batch report.
pub const SUB_ENCODER_BATCH: u8 = 0x10;

pub const SYSTEM_INFO_MIN_LEN: usize = 3;
pub const KEY_EVENT_LEN: usize = 2;
pub const IMU_LEN: usize = 24;
pub const BUS_SERVO_LEN: usize = 7;
pub const GAMEPAD_LEN: usize = 7;
pub const ENCODER_BATCH_LEN: usize = 37;
pub const RC_RECEIVER_LEN: usize = 36;

const ENCODER_OR_RC: &[usize] = &[ENCODER_BATCH_LEN, RC_RECEIVER_LEN];

/// Decode a frame with the default dispatch configuration.
pub fn decode(frame: &Frame) -> Result<Record> {
    decode_payload(
        frame.function_code(),
        frame.payload(),
        &DispatchConfig::default(),
    )
}

/// Decode a payload by function code. Pure; reports nothing.
pub fn decode_payload(function_code: u8, payload: &[u8], config: &DispatchConfig) -> Result<Record> {
    match function_code {
        SYSTEM_INFO => decode_system_info(payload),
        KEY_EVENT => decode_key_event(payload).map(Record::Key),
        IMU | IMU_ALT => decode_imu(function_code, payload).map(Record::Imu),
        BUS_SERVO => decode_bus_servo(payload).map(Record::BusServo),
        GAMEPAD => decode_gamepad(payload).map(Record::Gamepad),
        ENCODER => decode_encoder_code(payload, config.decode_rc_on_encoder_code),
        OLED => Err(DecodeError::NotDecoded(function_code)),
        other => Err(DecodeError::UnknownFunctionCode(other)),
    }
}

/// System info. Only the battery sub-command produces a record.
pub fn decode_system_info(payload: &[u8]) -> Result<Record> {
    check_len(
        SYSTEM_INFO,
        ExpectedLength::AtLeast(SYSTEM_INFO_MIN_LEN),
        payload,
    )?;
    let mut buf = payload;
    match buf.get_u8() {
        SUB_BATTERY => {
            let raw = buf.get_u16_le();
            Ok(Record::Battery(BatteryStatus {
                voltage_volts: f32::from(raw) / 1000.0,
            }))
        }
        sub_command => Err(DecodeError::UnknownSubCommand {
            function_code: SYSTEM_INFO,
            sub_command,
        }),
    }
}

pub fn decode_key_event(payload: &[u8]) -> Result<KeyEvent> {
    check_len(KEY_EVENT, ExpectedLength::Exactly(KEY_EVENT_LEN), payload)?;
    Ok(KeyEvent::new(payload[0], payload[1]))
}

/// Six floats: accel x, y, z then gyro x, y, z.
pub fn decode_imu(function_code: u8, payload: &[u8]) -> Result<ImuSample> {
    check_len(function_code, ExpectedLength::Exactly(IMU_LEN), payload)?;
    let mut buf = payload;
    let accel = read_vec3(&mut buf);
    let gyro = read_vec3(&mut buf);
    Ok(ImuSample { accel, gyro })
}

pub fn decode_bus_servo(payload: &[u8]) -> Result<BusServoStatus> {
    check_len(BUS_SERVO, ExpectedLength::Exactly(BUS_SERVO_LEN), payload)?;
    let mut raw = [0u8; BUS_SERVO_LEN];
    raw.copy_from_slice(payload);
    Ok(BusServoStatus { raw })
}

pub fn decode_gamepad(payload: &[u8]) -> Result<GamepadState> {
    check_len(GAMEPAD, ExpectedLength::Exactly(GAMEPAD_LEN), payload)?;
    let mut buf = payload;
    Ok(GamepadState {
        buttons: buf.get_u16_le(),
        hat: buf.get_u8(),
        left_stick: (buf.get_i8(), buf.get_i8()),
        right_stick: (buf.get_i8(), buf.get_i8()),
    })
}

/// Sub-command byte, then four blocks of (u8 id, i32 counter, f32 rps).
pub fn decode_encoder_batch(payload: &[u8]) -> Result<EncoderBatch> {
    check_len(ENCODER, ExpectedLength::Exactly(ENCODER_BATCH_LEN), payload)?;
    let mut buf = payload;
    let sub_command = buf.get_u8();
    if sub_command != SUB_ENCODER_BATCH {
        return Err(DecodeError::UnknownSubCommand {
            function_code: ENCODER,
            sub_command,
        });
    }
    let motors = std::array::from_fn(|_| {
        let motor_id = buf.get_u8();
        let counter = buf.get_i32_le();
        let rps = buf.get_f32_le();
        EncoderSample::new(motor_id, counter, rps)
    });
    Ok(EncoderBatch(motors))
}

/// Sixteen i16 channels, then ch17, ch18, signal-loss and fail-safe bytes.
pub fn decode_rc_receiver(payload: &[u8]) -> Result<RcReceiverFrame> {
    check_len(ENCODER, ExpectedLength::Exactly(RC_RECEIVER_LEN), payload)?;
    let mut buf = payload;
    let channels: [i16; RC_CHANNELS] = std::array::from_fn(|_| buf.get_i16_le());
    Ok(RcReceiverFrame {
        channels,
        ch17: buf.get_u8(),
        ch18: buf.get_u8(),
        signal_loss: buf.get_u8() != 0,
        fail_safe: buf.get_u8() != 0,
    })
}

// The controller sends two unrelated layouts under one code; only the exact
// payload length tells them apart.
fn decode_encoder_code(payload: &[u8], rc_enabled: bool) -> Result<Record> {
    if !rc_enabled {
        return decode_encoder_batch(payload).map(Record::Encoders);
    }
    match payload.len() {
        ENCODER_BATCH_LEN => decode_encoder_batch(payload).map(Record::Encoders),
        RC_RECEIVER_LEN => decode_rc_receiver(payload).map(Record::RcReceiver),
        _ => Err(length_mismatch(
            ENCODER,
            ExpectedLength::OneOf(ENCODER_OR_RC),
            payload,
        )),
    }
}

fn read_vec3(buf: &mut &[u8]) -> Vec3 {
    Vec3::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le())
}

fn check_len(function_code: u8, expected: ExpectedLength, payload: &[u8]) -> Result<()> {
    if expected.accepts(payload.len()) {
        Ok(())
    } else {
        Err(length_mismatch(function_code, expected, payload))
    }
}

fn length_mismatch(function_code: u8, expected: ExpectedLength, payload: &[u8]) -> DecodeError {
    DecodeError::LengthMismatch {
        function_code,
        expected,
        actual: payload.len(),
        raw_hex: hex_string(payload),
    }
}
