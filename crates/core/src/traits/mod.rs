//! Core traits for the simulator bridge.
//!
//! # Design
//!
//! - The exchange loop reads the clock and sleeps only through [`TimeSource`]
//! - [`MockTime`] is always available so deadline handling is testable on host

pub mod time;

pub use time::{MockTime, MonotonicTime, TimeSource};
