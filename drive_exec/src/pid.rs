//! # PID controller module
//!
//! A discrete PID controller working on one error sample per event. The
//! controller carries no notion of time, the derivative term is the
//! difference between consecutive errors and the integral term is the plain
//! sum of all errors since the last `init`.
//!
//! The integral term is never limited or decayed, it is only cleared by
//! reinitialising the controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// PID gains ordered as `[k_p, k_i, k_d]`.
pub type GainVector = [f64; 3];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Proportional error, the most recent error sample
    p_error: f64,

    /// Integral error, the sum of all samples
    i_error: f64,

    /// Derivative error, the change between the last two samples
    d_error: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        let mut pid = Self::default();
        pid.init(k_p, k_i, k_d);
        pid
    }

    /// Create a new controller from a gain vector.
    pub fn from_gains(gains: &GainVector) -> Self {
        Self::new(gains[0], gains[1], gains[2])
    }

    /// Set the gains and clear all error terms.
    pub fn init(&mut self, k_p: f64, k_i: f64, k_d: f64) {
        self.k_p = k_p;
        self.k_i = k_i;
        self.k_d = k_d;
        self.reset_errors();
    }

    /// Clear all error terms, keeping the gains.
    pub fn reset_errors(&mut self) {
        self.p_error = 0.0;
        self.i_error = 0.0;
        self.d_error = 0.0;
    }

    /// Feed a new error sample into the controller.
    pub fn update_error(&mut self, error: f64) {
        // The derivative must use the previous sample so it is computed
        // before the proportional term is overwritten
        self.d_error = error - self.p_error;
        self.p_error = error;
        self.i_error += error;
    }

    /// The controller output for the current error terms.
    ///
    /// The output has the same sign as the error, callers negate it when the
    /// actuator has to oppose the error (steering against the cross track
    /// error for example).
    pub fn total_error(&self) -> f64 {
        self.k_p * self.p_error + self.k_i * self.i_error + self.k_d * self.d_error
    }

    /// The current gains.
    pub fn gains(&self) -> GainVector {
        [self.k_p, self.k_i, self.k_d]
    }

    pub fn p_error(&self) -> f64 {
        self.p_error
    }

    pub fn i_error(&self) -> f64 {
        self.i_error
    }

    pub fn d_error(&self) -> f64 {
        self.d_error
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(1.0, 0.0, 0.0);

        pid.update_error(1.0);
        assert_eq!(pid.total_error(), 1.0);

        pid.update_error(-1.0);
        assert_eq!(pid.p_error(), -1.0);
        assert_eq!(pid.d_error(), -2.0);
        assert_eq!(pid.i_error(), 0.0);
        assert_eq!(pid.total_error(), -1.0);
    }

    #[test]
    fn test_all_terms() {
        let mut pid = PidController::new(0.5, 0.1, 2.0);

        pid.update_error(0.4);
        pid.update_error(1.0);
        pid.update_error(0.2);

        // p = 0.2, i = 1.6, d = 0.2 - 1.0
        let expected = 0.5 * 0.2 + 0.1 * 1.6 + 2.0 * -0.8;
        assert!((pid.total_error() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_reproducible() {
        let ctes = [0.3, -0.1, 2.5, 2.4, -3.0, 0.0];

        let mut a = PidController::from_gains(&[0.2, 0.004, 3.0]);
        let mut b = PidController::from_gains(&[0.2, 0.004, 3.0]);

        for cte in ctes.iter() {
            a.update_error(*cte);
            b.update_error(*cte);
            assert_eq!(a.total_error(), b.total_error());
        }
    }

    #[test]
    fn test_init_clears_errors() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);

        for _ in 0..100 {
            pid.update_error(5.0);
        }
        assert_eq!(pid.i_error(), 500.0);

        pid.init(2.0, 0.0, 1.0);

        assert_eq!(pid.gains(), [2.0, 0.0, 1.0]);
        assert_eq!(pid.total_error(), 0.0);

        // The first sample after init sees a zero previous error
        pid.update_error(0.5);
        assert_eq!(pid.d_error(), 0.5);
    }
}
