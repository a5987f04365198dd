//! simlink_core - Wire protocol and configuration for the simlink physics bridge
//!
//! This crate contains the I/O-free pieces of the bridge so they can be tested
//! on host without sockets or a running simulator.
//!
//! # Modules
//!
//! - [`protocol`]: Binary control frame codec and JSON telemetry decoder
//! - [`parameters`]: Key-value configuration store and backend parameters
//! - [`traits`]: Time source abstraction used by the exchange loop

pub mod parameters;
pub mod protocol;
pub mod traits;

pub use parameters::{BackendParams, ConfigSection, ConfigStore, DecodePolicy, ParameterError};
pub use protocol::{
    decode_telemetry, encode_control, ControlFrame, DecodeError, FrameError, TelemetryRecord,
    CHANNEL_COUNT, CONTROL_FRAME_SIZE, CONTROL_MAGIC,
};
pub use traits::{MockTime, MonotonicTime, TimeSource};
