//! Relay driver and raw GPIO output lines.

pub mod hw_init;
pub mod relay;
