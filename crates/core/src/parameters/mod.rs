//! Configuration types for the simulator bridge
//!
//! [`ConfigStore`] holds the raw key-value sections loaded from JSON.
//! [`BackendParams`] is the typed view consumed by the backend.

pub mod backend;
pub mod error;
pub mod store;

pub use backend::{BackendParams, DecodePolicy, DEFAULT_SECTION};
pub use error::ParameterError;
pub use store::{ConfigSection, ConfigStore};
