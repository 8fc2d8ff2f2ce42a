//! # Twiddle module
//!
//! Online tuning of the steering gains by coordinate ascent ("twiddle").
//!
//! Each candidate gain vector is scored by a trial: a fixed number of
//! telemetry events over which the cost `cte^k` is accumulated. At the end of
//! a trial the active gain is either kept (the step grows) or undone and
//! tried in the opposite direction (the step shrinks after both directions
//! fail), and the next candidate is applied.

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
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of tuned gains.
pub const NUM_GAINS: usize = 3;

/// Factor applied to the active delta when a trial improves on the best cost.
pub const DELTA_GROWTH: f64 = 1.1;

/// Factor applied to the active delta when both directions failed.
pub const DELTA_SHRINK: f64 = 0.9;

/// Factor applied to the throttle after an improving trial that completed
/// the lap.
pub const THROTTLE_BOOST: f64 = 1.1;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction in which the active gain is being perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Direction {
    /// `+1` or `-1`.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
        }
    }
}
