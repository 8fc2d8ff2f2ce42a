//! # Communications interface crate.
//!
//! Provides the interface between the drive software and the driving
//! simulator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulator protocol: telemetry, commands, and the event frame codec
pub mod sim;
