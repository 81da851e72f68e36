use std::fmt;

/// Payload length a layout accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    Exactly(usize),
    AtLeast(usize),
    /// Any of several layouts sharing one function code.
    OneOf(&'static [usize]),
}

impl ExpectedLength {
    pub fn accepts(&self, len: usize) -> bool {
        match self {
            ExpectedLength::Exactly(n) => len == *n,
            ExpectedLength::AtLeast(n) => len >= *n,
            ExpectedLength::OneOf(options) => options.contains(&len),
        }
    }
}

impl fmt::Display for ExpectedLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedLength::Exactly(n) => write!(f, "{n} bytes"),
            ExpectedLength::AtLeast(n) => write!(f, "at least {n} bytes"),
            ExpectedLength::OneOf(options) => {
                let options: Vec<String> = options.iter().map(usize::to_string).collect();
                write!(f, "{} bytes", options.join(" or "))
            }
        }
    }
}

/// Errors that can occur while decoding a verified frame's payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload does not have the length its layout requires.
    #[error("length mismatch on function 0x{function_code:02X}: expected {expected}, got {actual} [{raw_hex}]")]
    LengthMismatch {
        function_code: u8,
        expected: ExpectedLength,
        actual: usize,
        raw_hex: String,
    },

    /// The sub-command byte has no known layout.
    #[error("unknown sub-command 0x{sub_command:02X} on function 0x{function_code:02X}")]
    UnknownSubCommand { function_code: u8, sub_command: u8 },

    /// The function code has no known layout.
    #[error("unknown function code 0x{0:02X}")]
    UnknownFunctionCode(u8),

    /// The function code is known but carries nothing to decode.
    #[error("function code 0x{0:02X} is not decoded")]
    NotDecoded(u8),
}

impl DecodeError {
    /// Diagnostics that indicate a malformed payload, as opposed to traffic
    /// this monitor simply does not interpret.
    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::LengthMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
