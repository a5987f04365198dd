//! Simulator wire protocol
//!
//! Two message kinds cross the wire, one datagram each:
//!
//! - [`control`]: fixed 40-byte binary servo frame, flight stack → simulator
//! - [`telemetry`]: JSON state message, simulator → flight stack

pub mod control;
pub mod telemetry;

pub use control::{
    encode_control, normalized_to_pwm, pwm_to_normalized, ControlFrame, FrameError,
    CHANNEL_COUNT, CONTROL_FRAME_SIZE, CONTROL_MAGIC,
};
pub use telemetry::{decode_telemetry, DecodeError, TelemetryRecord};
