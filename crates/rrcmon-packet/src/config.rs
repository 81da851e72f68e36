/// Controls payload dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// When true, a 36-byte payload on the encoder code is decoded as an RC
    /// receiver frame. The controller firmware reuses the code for both.
    pub decode_rc_on_encoder_code: bool,
    /// Log a traffic sample for the 1st, (n+1)th, (2n+1)th... frame of each
    /// function code. 0 disables sampling.
    pub sample_every: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            decode_rc_on_encoder_code: true,
            sample_every: 50,
        }
    }
}
