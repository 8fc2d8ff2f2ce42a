//! # Drive control module
//!
//! Turns each telemetry record from the simulator into a command. Two
//! independent PID controllers run on every record:
//!
//! - the steering controller acts on the cross track error,
//! - the throttle controller acts on the error between the target speed (see
//!   [`crate::speed_model`]) and the current speed.
//!
//! When tuning is enabled the steering gains are owned by [`Twiddle`] and the
//! throttle is the tuner's fixed throttle, otherwise the throttle
//! controller's output is used. The throttle controller keeps running in both
//! cases.
//!
//! [`Twiddle`]: crate::twiddle::Twiddle

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drive control parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load the drive control parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Could not archive the trial: {0}")]
    ArchiveError(util::archive::ArchiveError),
}
