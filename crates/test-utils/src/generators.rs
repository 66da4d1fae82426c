//! Synthetic sweep generators.
//!
//! These produce predictable azimuth and gate-level patterns that tests can
//! feed to the encoder or the geometry builders and then verify exactly.

/// Start azimuths of a full sweep of `count` equal-width radials.
///
/// The first radial starts at `start` degrees; values are normalized to
/// `[0, 360)` and rounded to the 0.1 degree wire resolution.
///
/// ```
/// use test_utils::full_sweep_azimuths;
///
/// let az = full_sweep_azimuths(360, 0.5);
/// assert_eq!(az.len(), 360);
/// assert_eq!(az[0], 0.5);
/// assert_eq!(az[359], 359.5);
/// ```
pub fn full_sweep_azimuths(count: usize, start: f64) -> Vec<f64> {
    let step = 360.0 / count.max(1) as f64;
    (0..count)
        .map(|i| {
            let az = (start + i as f64 * step).rem_euclid(360.0);
            (az * 10.0).round() / 10.0 % 360.0
        })
        .collect()
}

/// Gate levels where each gate's level is `(gate / ring_width) % levels`.
///
/// Produces concentric rings of constant level, handy for run-length data.
///
/// ```
/// use test_utils::ring_levels;
///
/// let levels = ring_levels(10, 3, 16);
/// assert_eq!(levels, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3]);
/// ```
pub fn ring_levels(gates: usize, ring_width: usize, levels: u8) -> Vec<u8> {
    let ring_width = ring_width.max(1);
    let levels = levels.max(1) as usize;
    (0..gates)
        .map(|g| ((g / ring_width) % levels) as u8)
        .collect()
}

/// Digital gate levels that encode the radial and gate index.
///
/// Gate `g` of radial `r` holds `2 + (r + g) % 254`, so it never collides
/// with the below-threshold (0) or range-folded (1) codes.
pub fn digital_levels(radial: usize, gates: usize) -> Vec<u8> {
    (0..gates).map(|g| (2 + (radial + g) % 254) as u8).collect()
}

/// Reflectivity-like digital levels: a storm cell peaking at `peak_gate`.
///
/// Levels fall off linearly from 200 at the peak to 0 (below threshold)
/// `width` gates away.
pub fn storm_cell_levels(gates: usize, peak_gate: usize, width: usize) -> Vec<u8> {
    let width = width.max(1) as f64;
    (0..gates)
        .map(|g| {
            let distance = (g as f64 - peak_gate as f64).abs();
            let level = 200.0 * (1.0 - distance / width);
            if level <= 2.0 {
                0
            } else {
                level as u8
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sweep_wraps() {
        let az = full_sweep_azimuths(720, 359.75);
        assert!(az.iter().all(|a| (0.0..360.0).contains(a)));
        assert_eq!(az.len(), 720);
    }

    #[test]
    fn test_digital_levels_avoid_sentinels() {
        let levels = digital_levels(7, 500);
        assert!(levels.iter().all(|&l| l >= 2));
    }

    #[test]
    fn test_storm_cell_peak() {
        let levels = storm_cell_levels(100, 50, 10);
        assert_eq!(levels[50], 200);
        assert_eq!(levels[0], 0);
        assert!(levels[45] > levels[40]);
    }
}
