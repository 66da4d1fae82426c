//! Common test fixtures for radar pipeline tests.

/// Radar sites used across the test suite: `(id, lat, lon, elevation_m)`.
pub mod sites {
    /// Oklahoma City / Twin Lakes.
    pub const KTLX: (&str, f64, f64, f64) = ("KTLX", 35.3331, -97.2778, 370.0);

    /// Miami, near sea level.
    pub const KAMX: (&str, f64, f64, f64) = ("KAMX", 25.6111, -80.4128, 4.0);

    /// Anchorage; not a K-prefixed site.
    pub const PAHG: (&str, f64, f64, f64) = ("PAHG", 60.7258, -151.3514, 74.0);
}

/// Threshold halfwords for common products.
pub mod thresholds {
    /// Digital reflectivity: -32 dBZ minimum, 0.5 dBZ steps, 254 levels.
    pub fn digital_reflectivity() -> [u16; 16] {
        let mut t = [0u16; 16];
        t[0] = (-320i16) as u16;
        t[1] = 5;
        t[2] = 254;
        t
    }

    /// 16-level reflectivity: ND, then 5 dBZ steps from 5 to 75.
    pub fn sixteen_level_reflectivity() -> [u16; 16] {
        let mut t = [0u16; 16];
        t[0] = 0x8002;
        for (i, slot) in t.iter_mut().enumerate().skip(1) {
            *slot = (i as u16) * 5;
        }
        t
    }
}

/// Timestamps used for ordering tests, as (julian day, seconds).
pub mod times {
    /// 2024-05-06 22:01:00 UTC
    pub const T1: (u16, u32) = (19850, 79_260);
    /// 2024-05-06 22:06:00 UTC
    pub const T2: (u16, u32) = (19850, 79_560);
    /// 2024-05-06 22:11:00 UTC
    pub const T3: (u16, u32) = (19850, 79_860);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_times_are_ordered() {
        assert!(times::T1.1 < times::T2.1);
        assert!(times::T2.1 < times::T3.1);
    }

    #[test]
    fn test_sixteen_level_thresholds() {
        let t = thresholds::sixteen_level_reflectivity();
        assert_eq!(t[0], 0x8002);
        assert_eq!(t[15], 75);
    }
}
