//! On-device time-schedule engine.
//!
//! Exposes the pure-logic modules for integration testing and the host
//! simulator.  ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod arbiter;
pub mod channel;
pub mod config;
pub mod error;
pub mod persist;
pub mod schedule;
pub mod sync;
pub mod time;

pub use error::{Error, Result};
