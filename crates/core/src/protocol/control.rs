//! Binary servo control frame
//!
//! ```text
//! ┌──────────┬────────────┬──────────────┬──────────────────────────┐
//! │ magic(2) │ rate(2)    │ frame(4)     │ pwm[16] (2 each)         │
//! └──────────┴────────────┴──────────────┴──────────────────────────┘
//! ```
//!
//! Every field is big-endian regardless of host byte order. `magic` is the
//! fixed value 18458 (0x481A).

use thiserror::Error;

/// Protocol identifier at offset 0 of every control frame.
pub const CONTROL_MAGIC: u16 = 18458;

/// Number of PWM channels carried by a frame.
pub const CHANNEL_COUNT: usize = 16;

/// Encoded frame size in bytes.
pub const CONTROL_FRAME_SIZE: usize = 8 + CHANNEL_COUNT * 2;

const PWM_OFFSET: usize = 8;

/// Errors from parsing a control frame on the simulator side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("control frame too short: {0} bytes")]
    TooShort(usize),

    #[error("bad control frame magic: {0:#06x}")]
    BadMagic(u16),
}

/// One servo packet as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    /// Requested simulator frame rate in Hz.
    pub frame_rate: u16,
    /// Monotonic frame counter, used by the simulator for lockstep.
    pub frame_count: u32,
    /// Pulse widths in microseconds.
    pub pwm: [u16; CHANNEL_COUNT],
}

impl ControlFrame {
    /// Build a frame from normalized actuator outputs.
    pub fn from_actuators(
        actuators: &[f64; CHANNEL_COUNT],
        frame_rate: u16,
        frame_count: u32,
    ) -> Self {
        let mut pwm = [0u16; CHANNEL_COUNT];
        for (out, &value) in pwm.iter_mut().zip(actuators.iter()) {
            *out = normalized_to_pwm(value);
        }
        Self {
            frame_rate,
            frame_count,
            pwm,
        }
    }

    /// Serialize to the 40-byte network representation.
    pub fn encode(&self) -> [u8; CONTROL_FRAME_SIZE] {
        let mut buf = [0u8; CONTROL_FRAME_SIZE];
        buf[0..2].copy_from_slice(&CONTROL_MAGIC.to_be_bytes());
        buf[2..4].copy_from_slice(&self.frame_rate.to_be_bytes());
        buf[4..8].copy_from_slice(&self.frame_count.to_be_bytes());
        for (i, pwm) in self.pwm.iter().enumerate() {
            let offset = PWM_OFFSET + i * 2;
            buf[offset..offset + 2].copy_from_slice(&pwm.to_be_bytes());
        }
        buf
    }

    /// Parse a received frame. Trailing bytes beyond the frame are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < CONTROL_FRAME_SIZE {
            return Err(FrameError::TooShort(bytes.len()));
        }

        let magic = u16::from_be_bytes([bytes[0], bytes[1]]);
        if magic != CONTROL_MAGIC {
            return Err(FrameError::BadMagic(magic));
        }

        let frame_rate = u16::from_be_bytes([bytes[2], bytes[3]]);
        let frame_count = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let mut pwm = [0u16; CHANNEL_COUNT];
        for (i, out) in pwm.iter_mut().enumerate() {
            let offset = PWM_OFFSET + i * 2;
            *out = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        }

        Ok(Self {
            frame_rate,
            frame_count,
            pwm,
        })
    }
}

/// Encode actuator outputs straight into wire bytes.
pub fn encode_control(
    actuators: &[f64; CHANNEL_COUNT],
    frame_rate: u16,
    frame_count: u32,
) -> [u8; CONTROL_FRAME_SIZE] {
    ControlFrame::from_actuators(actuators, frame_rate, frame_count).encode()
}

/// Convert a normalized value to a pulse width: `round(v * 500) + 1500`.
///
/// Not clamped. Results outside the u16 range wrap modulo 2^16, so `-4.0`
/// becomes `65036`. NaN maps to 0.
pub fn normalized_to_pwm(normalized: f64) -> u16 {
    let pulse = (normalized * 500.0).round() + 1500.0;
    // i64 first so the final cast truncates instead of saturating.
    pulse as i64 as u16
}

/// Convert a pulse width back to a normalized value, clamped to [-1.0, 1.0].
pub fn pwm_to_normalized(pwm: u16) -> f64 {
    let clamped = pwm.clamp(1000, 2000);
    (clamped as f64 - 1500.0) / 500.0
}
