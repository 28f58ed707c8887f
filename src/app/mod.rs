//! Application core — pure domain logic, zero I/O.
//!
//! The command vocabulary, the event types on either side of the
//! dispatcher, and the dispatcher itself.  All interaction with pins and
//! the broker happens through **port traits** defined in [`ports`], so
//! this layer is testable on the host without peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
