//! Built-in physics peer for running the bridge without an external
//! simulator.

pub mod model;
pub mod server;

pub use model::{PointMassConfig, PointMassModel};
pub use server::{PhysicsServer, ServerOptions, ServerStats, GARBAGE_DATAGRAM};
