//! Function codes sent by the controller.
//!
//! The function code selects how a frame's payload is interpreted. Codes
//! not listed here are still framed and counted but carry no known layout.

/// System information; sub-command in payload byte 0 (0x04 = battery).
pub const SYSTEM_INFO: u8 = 0x00;

/// On-board key event.
pub const KEY_EVENT: u8 = 0x06;

/// Inertial measurement sample.
pub const IMU: u8 = 0x07;

/// Bus servo status.
pub const BUS_SERVO: u8 = 0x08;

/// Inertial measurement sample (alternate code, same layout as [`IMU`]).
pub const IMU_ALT: u8 = 0x09;

/// Gamepad state.
pub const GAMEPAD: u8 = 0x0A;

/// Encoder batch, or RC receiver frame depending on payload length.
pub const ENCODER: u8 = 0x0B;

/// OLED control. Host-to-device only; never decoded.
pub const OLED: u8 = 0x0C;

/// Returns a human-readable name for a function code.
pub fn function_name(code: u8) -> &'static str {
    match code {
        SYSTEM_INFO => "system info",
        KEY_EVENT => "key event",
        IMU | IMU_ALT => "imu",
        BUS_SERVO => "bus servo",
        GAMEPAD => "gamepad",
        ENCODER => "encoder / rc receiver",
        OLED => "oled control",
        _ => "unknown",
    }
}

/// Returns true if the code has a defined meaning.
pub fn is_known(code: u8) -> bool {
    function_name(code) != "unknown"
}
