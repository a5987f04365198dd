use core::fmt;

use simlink_core::CHANNEL_COUNT;

/// Actuator outputs for one exchange, normalized so that -1.0..=1.0 spans
/// the 1000..=2000 PWM range.
///
/// Values outside that range are passed through to the encoder unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorCommands {
    pub channels: [f64; CHANNEL_COUNT],
}

impl ActuatorCommands {
    /// All channels at 0.0 (1500 PWM).
    pub fn neutral() -> Self {
        Self::uniform(0.0)
    }

    /// All channels set to the same value.
    pub fn uniform(value: f64) -> Self {
        Self {
            channels: [value; CHANNEL_COUNT],
        }
    }

    /// Build from a slice, leaving channels past its end at 0.0.
    ///
    /// Extra values beyond [`CHANNEL_COUNT`] are ignored.
    pub fn from_slice(values: &[f64]) -> Self {
        let mut commands = Self::neutral();
        for (slot, value) in commands.channels.iter_mut().zip(values) {
            *slot = *value;
        }
        commands
    }
}

impl Default for ActuatorCommands {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Why a backend stopped accepting exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// The socket could not be created.
    SocketInit,
    /// The socket could not be bound to a local address.
    Bind,
    /// The transport was handed to another backend via `take`.
    MovedOut,
    /// The transport reported an error that leaves it unusable.
    TransportLost,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SocketInit => "socket initialization failed",
            Self::Bind => "socket bind failed",
            Self::MovedOut => "transport moved to another backend",
            Self::TransportLost => "transport lost",
        };
        f.write_str(text)
    }
}

/// Backend health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Good,
    /// Terminal: every later exchange fails without touching the network.
    Faulted(FaultReason),
}

impl BackendStatus {
    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => f.write_str("good"),
            Self::Faulted(reason) => write!(f, "faulted: {reason}"),
        }
    }
}
