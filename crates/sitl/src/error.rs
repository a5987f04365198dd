use std::time::Duration;

use simlink_core::DecodeError;

use crate::types::FaultReason;

/// Errors that can occur during simulator operations.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("Failed to open simulator socket: {0}")]
    SocketInit(#[source] std::io::Error),

    #[error("No simulator address configured")]
    NoRemote,

    #[error("Failed to send control frame: {0}")]
    Send(#[source] std::io::Error),

    #[error("Failed to receive telemetry: {0}")]
    Receive(#[source] std::io::Error),

    #[error("Backend faulted: {0}")]
    Faulted(FaultReason),

    #[error("Invalid telemetry: {0}")]
    Decode(#[from] DecodeError),

    #[error("No valid telemetry after {elapsed:?} ({rejected} datagrams rejected)")]
    Timeout { elapsed: Duration, rejected: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulatorError {
    /// Whether a later exchange on the same backend may succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Faulted(_) | Self::SocketInit(_))
    }
}
