//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::DriveCtrlError;
use crate::{pid::GainVector, twiddle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Initial steering controller gains, `[k_p, k_i, k_d]`. These are the
    /// starting point of the search when tuning is enabled.
    pub steer_gains: GainVector,

    /// Throttle controller gains, `[k_p, k_i, k_d]`.
    pub throttle_gains: GainVector,

    /// Tuner parameters
    pub twiddle: twiddle::Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            steer_gains: [2.03741, 0.0, 29.2802],
            throttle_gains: [0.1, 0.0, 1.0],
            twiddle: twiddle::Params::default(),
        }
    }
}

impl Params {
    /// Load and validate the parameters from a file relative to the params
    /// directory.
    pub fn load(param_file_path: &str) -> Result<Self, DriveCtrlError> {
        let params: Self =
            util::params::load(param_file_path).map_err(DriveCtrlError::ParamLoadError)?;
        params.validate()?;
        Ok(params)
    }

    /// Check the parameters describe a runnable controller.
    pub fn validate(&self) -> Result<(), DriveCtrlError> {
        let invalid = |msg: String| Err(DriveCtrlError::InvalidParams(msg));

        if self.steer_gains.iter().any(|g| !g.is_finite()) {
            return invalid(format!("steer_gains must be finite, found {:?}", self.steer_gains));
        }
        if self.throttle_gains.iter().any(|g| !g.is_finite()) {
            return invalid(format!(
                "throttle_gains must be finite, found {:?}",
                self.throttle_gains
            ));
        }

        let tw = &self.twiddle;

        if tw.step_budget == 0 {
            return invalid("twiddle.step_budget must be at least 1".into());
        }
        if tw.cost_exponent < 1 {
            return invalid(format!(
                "twiddle.cost_exponent must be at least 1, found {}",
                tw.cost_exponent
            ));
        }
        if tw.deltas.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return invalid(format!(
                "twiddle.deltas must be finite and non-negative, found {:?}",
                tw.deltas
            ));
        }
        if !(tw.initial_throttle.is_finite() && tw.initial_throttle > 0.0) {
            return invalid(format!(
                "twiddle.initial_throttle must be positive, found {}",
                tw.initial_throttle
            ));
        }
        if !(tw.off_track_cte.is_finite() && tw.off_track_cte > 0.0) {
            return invalid(format!(
                "twiddle.off_track_cte must be positive, found {}",
                tw.off_track_cte
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let p: Params = util::params::from_toml_str(
            "steer_gains = [0.2, 0.004, 3.0]\n\
             [twiddle]\n\
             enabled = true\n\
             cost_exponent = 8\n",
        )
        .unwrap();

        assert_eq!(p.steer_gains, [0.2, 0.004, 3.0]);
        assert_eq!(p.throttle_gains, Params::default().throttle_gains);
        assert!(p.twiddle.enabled);
        assert_eq!(p.twiddle.cost_exponent, 8);
        assert_eq!(p.twiddle.step_budget, 10000);
    }

    #[test]
    fn test_invalid() {
        let mut p = Params::default();
        p.twiddle.step_budget = 0;
        assert!(matches!(p.validate(), Err(DriveCtrlError::InvalidParams(_))));

        let mut p = Params::default();
        p.twiddle.cost_exponent = 0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.twiddle.deltas[2] = -0.1;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.twiddle.initial_throttle = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.steer_gains[0] = std::f64::NAN;
        assert!(p.validate().is_err());
    }
}
