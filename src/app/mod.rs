//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the engine orchestration: the schedule service, its
//! inbound commands and outbound events.  Clock, storage and the hub
//! transport are reached only through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
