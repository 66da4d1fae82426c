//! Boundary rays between the radials of a sweep.
//!
//! Each radial covers the wedge between two boundary rays. Where one
//! radial's far edge and the next radial's near edge are within a tolerance
//! both wedges use the same ray, placed at the midpoint, so the rendered
//! quads share their edge vertices exactly. The last radial of the sweep
//! connects to the first across north.

use level3_parser::Radial;
use radar_common::{clockwise_delta, normalize_azimuth};
use tracing::debug;

/// Largest edge mismatch, in degrees, that is closed with a shared ray.
pub const DEFAULT_BOUNDARY_TOLERANCE_DEG: f64 = 0.5;

/// Width used when a radial carries no usable azimuth delta and there is no
/// neighbor to infer one from.
const FALLBACK_WIDTH_DEG: f64 = 1.0;

/// The wedge drawn for one radial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadialSpan {
    /// Index into the product's radials.
    pub radial: usize,
    /// Ray at the counter-clockwise edge.
    pub start_ray: usize,
    /// Ray at the clockwise edge.
    pub end_ray: usize,
}

/// Boundary rays and wedges for one sweep, sorted clockwise from north.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepGeometry {
    rays: Vec<f64>,
    spans: Vec<RadialSpan>,
    /// Nominal start azimuth per span, ascending.
    nominal_starts: Vec<f64>,
}

struct Candidate {
    radial: usize,
    start: f64,
    width: f64,
}

impl SweepGeometry {
    /// Compute the boundary rays for a sweep.
    ///
    /// Radials without gates and radials with a non-finite azimuth are left
    /// out. Radials with a non-positive width take the gap to the next
    /// radial as their width.
    pub fn build(radials: &[Radial], tolerance_deg: f64) -> Self {
        let mut candidates: Vec<Candidate> = radials
            .iter()
            .enumerate()
            .filter(|(_, r)| r.gate_count() > 0 && r.azimuth.is_finite())
            .map(|(radial, r)| Candidate {
                radial,
                start: normalize_azimuth(r.azimuth),
                width: r.azimuth_delta,
            })
            .collect();
        candidates.sort_by(|a, b| a.start.total_cmp(&b.start));

        let n = candidates.len();
        for i in 0..n {
            let w = candidates[i].width;
            if !(w.is_finite() && w > 0.0 && w <= 360.0) {
                let gap = if n > 1 {
                    clockwise_delta(candidates[i].start, candidates[(i + 1) % n].start)
                } else {
                    0.0
                };
                candidates[i].width = if gap > 0.0 { gap } else { FALLBACK_WIDTH_DEG };
            }
        }

        let excluded = radials.len() - n;
        if excluded > 0 {
            debug!(excluded, "Radials without gates left out of sweep geometry");
        }

        let mut rays = Vec::with_capacity(n + 1);
        let mut start_ray = vec![0usize; n];
        let mut end_ray = vec![0usize; n];
        let mut push = |azimuth: f64| {
            rays.push(normalize_azimuth(azimuth));
            rays.len() - 1
        };

        if n == 1 {
            start_ray[0] = push(candidates[0].start);
            end_ray[0] = push(candidates[0].start + candidates[0].width);
        }
        if n > 1 {
            let tolerance = tolerance_deg.max(0.0);
            let mut shared = 0usize;
            for i in 0..n {
                let j = (i + 1) % n;
                let (cur, next) = (&candidates[i], &candidates[j]);
                let end = cur.start + cur.width;
                let gap = clockwise_delta(cur.start, next.start) - cur.width;
                let limit = tolerance.min(cur.width * 0.5).min(next.width * 0.5);
                if gap.abs() <= limit {
                    let ray = push(end + gap * 0.5);
                    end_ray[i] = ray;
                    start_ray[j] = ray;
                    shared += 1;
                } else {
                    end_ray[i] = push(end);
                    start_ray[j] = push(next.start);
                }
            }
            debug!(radials = n, shared, "Computed sweep boundaries");
        }

        let spans = candidates
            .iter()
            .enumerate()
            .map(|(k, c)| RadialSpan {
                radial: c.radial,
                start_ray: start_ray[k],
                end_ray: end_ray[k],
            })
            .collect();

        Self {
            rays,
            spans,
            nominal_starts: candidates.iter().map(|c| c.start).collect(),
        }
    }

    /// Boundary ray azimuths in degrees.
    pub fn rays(&self) -> &[f64] {
        &self.rays
    }

    /// Wedges in clockwise order.
    pub fn spans(&self) -> &[RadialSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Start azimuth and clockwise width of a wedge.
    pub fn bounds(&self, span: &RadialSpan) -> (f64, f64) {
        let start = self.rays[span.start_ray];
        let width = clockwise_delta(start, self.rays[span.end_ray]);
        (start, width)
    }

    fn contains(&self, k: usize, azimuth: f64) -> bool {
        let (start, width) = self.bounds(&self.spans[k]);
        clockwise_delta(start, azimuth) < width
    }

    /// Wedge covering an azimuth, or `None` inside a gap.
    pub fn locate(&self, azimuth: f64) -> Option<&RadialSpan> {
        let n = self.spans.len();
        if n == 0 || !azimuth.is_finite() {
            return None;
        }
        let azimuth = normalize_azimuth(azimuth);
        let count = self.nominal_starts.partition_point(|&s| s <= azimuth);
        let k = (count + n - 1) % n;
        // Shared rays move a wedge's edge by at most half the tolerance, so
        // the covering wedge is the nominal one or a direct neighbor.
        [k, (k + 1) % n, (k + n - 1) % n]
            .into_iter()
            .find(|&i| self.contains(i, azimuth))
            .map(|i| &self.spans[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use level3_parser::{GateEncoding, GateLevels};

    fn radial(azimuth: f64, delta: f64, gates: usize) -> Radial {
        Radial {
            azimuth,
            azimuth_delta: delta,
            encoding: GateEncoding::Literal8,
            gates: GateLevels::U8(vec![2; gates]),
        }
    }

    fn half_degree_sweep() -> Vec<Radial> {
        (0..360).map(|i| radial(i as f64 + 0.5, 1.0, 10)).collect()
    }

    #[test]
    fn test_full_sweep_shares_every_ray() {
        let sweep = SweepGeometry::build(&half_degree_sweep(), DEFAULT_BOUNDARY_TOLERANCE_DEG);
        assert_eq!(sweep.len(), 360);
        assert_eq!(sweep.rays().len(), 360);
        for pair in sweep.spans().windows(2) {
            assert_eq!(pair[0].end_ray, pair[1].start_ray);
        }
    }

    #[test]
    fn test_no_gap_across_north() {
        let sweep = SweepGeometry::build(&half_degree_sweep(), DEFAULT_BOUNDARY_TOLERANCE_DEG);
        let first = sweep.spans()[0];
        let last = sweep.spans()[359];
        assert_eq!(first.radial, 0);
        assert_eq!(last.radial, 359);
        // The 359.5 radial ends on the very ray the 0.5 radial starts on.
        assert_eq!(last.end_ray, first.start_ray);
        assert!((sweep.rays()[first.start_ray] - 0.5).abs() < 1e-12);

        assert_eq!(sweep.locate(0.0).unwrap().radial, 359);
        assert_eq!(sweep.locate(359.99).unwrap().radial, 359);
        assert_eq!(sweep.locate(0.5).unwrap().radial, 0);
    }

    #[test]
    fn test_unsorted_input() {
        let radials = vec![
            radial(2.0, 1.0, 5),
            radial(0.0, 1.0, 5),
            radial(1.0, 1.0, 5),
        ];
        let sweep = SweepGeometry::build(&radials, 0.5);
        let order: Vec<usize> = sweep.spans().iter().map(|s| s.radial).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(sweep.spans()[0].end_ray, sweep.spans()[1].start_ray);
        // 3.0 to 0.0 is far outside the tolerance: two separate rays.
        assert_ne!(sweep.spans()[2].end_ray, sweep.spans()[0].start_ray);
        assert_eq!(sweep.rays().len(), 4);
    }

    #[test]
    fn test_jitter_closed_at_midpoint() {
        let radials = vec![radial(10.0, 0.95, 5), radial(11.05, 1.0, 5)];
        let sweep = SweepGeometry::build(&radials, 0.5);
        let ray = sweep.spans()[0].end_ray;
        assert_eq!(ray, sweep.spans()[1].start_ray);
        assert!((sweep.rays()[ray] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_left_open() {
        let mut radials = half_degree_sweep();
        radials.retain(|r| !(90.0..100.0).contains(&r.azimuth));
        let sweep = SweepGeometry::build(&radials, 0.5);
        assert_eq!(sweep.len(), 350);
        assert_eq!(sweep.rays().len(), 351);
        assert!(sweep.locate(95.0).is_none());
        assert!(sweep.locate(89.9).is_some());
    }

    #[test]
    fn test_zero_gate_radials_excluded() {
        let mut radials = half_degree_sweep();
        radials[42] = radial(42.5, 1.0, 0);
        let sweep = SweepGeometry::build(&radials, 0.5);
        assert_eq!(sweep.len(), 359);
        assert!(sweep.spans().iter().all(|s| s.radial != 42));
        assert!(sweep.locate(43.0).is_none());
    }

    #[test]
    fn test_missing_width_inferred() {
        let radials = vec![radial(0.0, 0.0, 5), radial(0.5, 0.5, 5), radial(1.0, 0.5, 5)];
        let sweep = SweepGeometry::build(&radials, 0.25);
        let (start, width) = sweep.bounds(&sweep.spans()[0]);
        assert_eq!(start, 0.0);
        assert!((width - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_sweep() {
        let sweep = SweepGeometry::build(&[], 0.5);
        assert!(sweep.is_empty());
        assert!(sweep.locate(10.0).is_none());
    }
}
