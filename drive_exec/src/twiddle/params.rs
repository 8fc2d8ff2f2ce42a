//! Parameters structure for Twiddle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::NUM_GAINS;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the twiddle tuner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// If false the steering gains are never tuned and the throttle comes
    /// from the throttle PID.
    pub enabled: bool,

    /// Initial perturbation magnitude for each gain, `[d_p, d_i, d_d]`.
    pub deltas: [f64; NUM_GAINS],

    /// Number of telemetry events in one trial.
    pub step_budget: u64,

    /// Exponent `k` of the per-event cost `|cte|^k`.
    ///
    /// A small exponent (2) weighs the whole trial, a large one (8) is
    /// dominated by the worst excursions and prunes trials much earlier once
    /// a good best cost is known.
    pub cost_exponent: i32,

    /// Throttle applied while tuning.
    pub initial_throttle: f64,

    /// Absolute cross track error beyond which the vehicle is off track and
    /// the lap does not count as completed.
    pub off_track_cte: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            enabled: false,
            deltas: [0.00011, 1.93633e-05, 0.0016],
            step_budget: 10000,
            cost_exponent: 2,
            initial_throttle: 0.3,
            off_track_cte: 3.5,
        }
    }
}
