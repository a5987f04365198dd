use simlink_core::CHANNEL_COUNT;

/// Describes which telemetry fields a backend reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorCapabilities {
    pub imu: bool,
    pub position: bool,
    pub velocity: bool,
    pub attitude: bool,
}

impl Default for SensorCapabilities {
    fn default() -> Self {
        Self {
            imu: true,
            position: true,
            velocity: true,
            attitude: true,
        }
    }
}

/// Describes the overall capabilities of a physics backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Which telemetry fields are available.
    pub sensors: SensorCapabilities,
    /// Number of actuator channels carried per frame.
    pub actuator_channels: usize,
    /// Maximum frame rate in Hz the backend will request.
    pub max_rate_hz: u16,
    /// Whether the physics steps only when a new frame count arrives.
    pub lockstep: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            sensors: SensorCapabilities::default(),
            actuator_channels: CHANNEL_COUNT,
            max_rate_hz: 1000,
            lockstep: true,
        }
    }
}
