//! Warden CLI library.
//!
//! Wires the event bus, component health responders and the configuration
//! audit listener into the `warden` binary's commands.

pub mod agent;
pub mod cli;
pub mod commands;
