//! Azimuth helpers.

/// Map any finite angle in degrees into `[0, 360)`.
///
/// Non-finite input is returned unchanged so callers can reject it.
pub fn normalize_azimuth(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return degrees;
    }
    let a = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Clockwise angular distance from `from` to `to`, in `[0, 360)`.
pub fn clockwise_delta(from: f64, to: f64) -> f64 {
    normalize_azimuth(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_azimuth(360.0), 0.0);
        assert_eq!(normalize_azimuth(-0.5), 359.5);
        assert_eq!(normalize_azimuth(725.0), 5.0);
        assert_eq!(normalize_azimuth(-1e-20), 0.0);
        assert!(normalize_azimuth(f64::NAN).is_nan());
    }

    #[test]
    fn test_clockwise_delta_wraps() {
        assert!((clockwise_delta(359.5, 0.5) - 1.0).abs() < 1e-12);
        assert!((clockwise_delta(10.0, 5.0) - 355.0).abs() < 1e-12);
    }
}
