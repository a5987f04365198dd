//! Software-in-the-loop bridge between a flight-control loop and an external
//! physics simulator.
//!
//! [`JsonBackend`] sends actuator outputs as a binary control frame over UDP
//! and waits for the simulator's JSON telemetry reply. [`physics`] provides a
//! small built-in peer for running the loop without a simulator.

pub mod adapter;
pub mod error;
pub mod physics;
pub mod transport;
pub mod types;

pub use adapter::{BackendCapabilities, ExchangeStats, JsonBackend, PhysicsBackend};
pub use error::SimulatorError;
pub use physics::{PhysicsServer, PointMassConfig, PointMassModel, ServerOptions};
pub use transport::{DatagramTransport, MockTransport, RecvPoll, UdpTransport};
pub use types::{ActuatorCommands, BackendStatus, FaultReason};
