//! Generic maths functions

use num_traits::Float;

/// Convert an angle in degrees into radians.
pub fn deg2rad<T: Float>(deg: T) -> T {
    deg.to_radians()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deg2rad() {
        const PI: f64 = std::f64::consts::PI;

        assert!((deg2rad(180f64) - PI).abs() < 1e-12);
        assert!((deg2rad(-25f64) + 25f64 * PI / 180f64).abs() < 1e-12);
        assert_eq!(deg2rad(0f32), 0f32);
    }
}
