//! # Target speed model
//!
//! Maps the cross track error and the time since the previous telemetry to
//! the speed the vehicle should be driving at. The further from the path the
//! slower the target, and late telemetry (large `dt`) sharpens the falloff.

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Cross track error at which the speed curve reaches zero.
pub const CTE_LIMIT: f64 = 3.5;

/// The target never drops below this fraction of the maximum speed.
pub const MIN_SPEED_FRACTION: f64 = 0.65;

/// Maximum target speed.
///
/// Units: miles per hour
pub const MAX_SPEED: f64 = 100.0;

/// Curve power at `dt = 0`.
const CURVE_POWER_BASE: f64 = 0.5;

/// Increase in curve power per second of `dt`.
const CURVE_POWER_PER_S: f64 = 33.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The exponent applied to the normalised speed curve for the given `dt`.
///
/// Never less than 1.
pub fn speed_curve_power(dt_s: f64) -> f64 {
    (CURVE_POWER_BASE + CURVE_POWER_PER_S * dt_s).max(1.0)
}

/// The target speed for the given cross track error and time since the
/// previous telemetry.
///
/// Units: miles per hour, in `[MIN_SPEED_FRACTION * MAX_SPEED, MAX_SPEED]`
pub fn target_speed(cte: f64, dt_s: f64) -> f64 {
    let ratio = (CTE_LIMIT - cte.abs()).max(0.0) / CTE_LIMIT;

    ratio.powf(speed_curve_power(dt_s)).max(MIN_SPEED_FRACTION) * MAX_SPEED
}
