//! # Drive library.
//!
//! Steering and throttle control of a simulated vehicle from cross track
//! error telemetry, with online tuning of the steering gains.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// PID controller
pub mod pid;

/// Target speed model - the speed to drive at for a given cross track error
pub mod speed_model;

/// Twiddle - coordinate ascent tuning of the steering gains
pub mod twiddle;

/// Drive control module - turns telemetry into steering and throttle commands
pub mod drive_ctrl;

/// Simulation server - accepts the simulator connection and serves its events
pub mod sim_server;
