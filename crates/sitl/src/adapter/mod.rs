pub mod capabilities;
pub mod json;

pub use capabilities::{BackendCapabilities, SensorCapabilities};
pub use json::{ExchangeStats, JsonBackend, DEFAULT_FRAME_RATE, RECV_BUFFER_SIZE};

use simlink_core::TelemetryRecord;

use crate::types::{ActuatorCommands, BackendStatus};

/// Pluggable interface for physics simulator backends.
///
/// Implementations must be `Send` so a backend can be handed to the thread
/// running the control loop, and the trait is object safe so backends can be
/// stored as `Box<dyn PhysicsBackend>`.
pub trait PhysicsBackend: Send {
    /// Unique identifier for this backend type (e.g., "json").
    fn backend_type(&self) -> &'static str;

    /// Human-readable name for this backend instance.
    fn name(&self) -> &str;

    /// Send one set of actuator outputs and wait for the resulting state.
    ///
    /// Returns `None` on timeout or any failure; the reason is logged.
    fn iterate(&mut self, actuators: &ActuatorCommands) -> Option<TelemetryRecord>;

    /// Set the frame rate in Hz reported to the simulator.
    fn set_frame_rate(&mut self, hz: u16);

    /// Frame rate in Hz reported to the simulator.
    fn frame_rate(&self) -> u16;

    /// Number of successful exchanges since construction.
    fn frame_count(&self) -> u32;

    fn status(&self) -> BackendStatus;

    fn is_good(&self) -> bool {
        self.status().is_good()
    }

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> BackendCapabilities;
}
