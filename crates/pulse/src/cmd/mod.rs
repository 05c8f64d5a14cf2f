//! Command implementations for the Pulse CLI

pub mod serve;
pub mod snapshot;
