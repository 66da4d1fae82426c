//! Pre-computed raster lookup tables.
//!
//! Resampling a sweep onto a raster grid needs the inverse projection of
//! every pixel center. The [`PolarLut`] stores the result as a
//! `(radial, gate)` pair per pixel plus a validity bitmap, so colors can be
//! filled with plain indexing.

use tracing::debug;

use crate::georef::{GateGeometry, Georeferencer};
use crate::grid::RasterGrid;
use crate::sweep::SweepGeometry;

/// Per-pixel radial and gate indices for one grid and one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarLut {
    pub width: usize,
    pub height: usize,
    /// `(radial, gate)` for each pixel in row-major order
    indices: Vec<(u32, u32)>,
    /// Bitmap of pixels that fall on a gate
    valid_bitmap: Vec<u64>,
}

impl PolarLut {
    /// A LUT with every pixel invalid.
    pub fn new(width: usize, height: usize) -> Self {
        let pixels = width * height;
        Self {
            width,
            height,
            indices: vec![(0, 0); pixels],
            valid_bitmap: vec![0u64; (pixels + 63) / 64],
        }
    }

    /// Compute the LUT for a grid.
    ///
    /// A pixel is valid when the beam passes over its center within
    /// `gate_count` gates and inside one of the sweep's wedges.
    pub fn build(
        grid: &RasterGrid,
        georef: &Georeferencer,
        sweep: &SweepGeometry,
        geometry: &GateGeometry,
        gate_count: usize,
    ) -> Self {
        let mut lut = Self::new(grid.width, grid.height);
        let max_slant = geometry.max_range(gate_count);

        for row in 0..grid.height {
            for col in 0..grid.width {
                let center = grid.pixel_center(col, row);
                let Some(polar) = georef.inverse(center, geometry.elevation_deg) else {
                    continue;
                };
                if polar.slant_range >= max_slant {
                    continue;
                }
                let Some(gate) = geometry.gate_at(polar.slant_range, gate_count) else {
                    continue;
                };
                if let Some(span) = sweep.locate(polar.azimuth) {
                    lut.set(row * grid.width + col, span.radial, gate);
                }
            }
        }

        debug!(
            width = grid.width,
            height = grid.height,
            valid = lut.valid_count(),
            "Built polar lookup table"
        );
        lut
    }

    /// Check if a pixel maps to a gate.
    #[inline]
    pub fn is_valid(&self, pixel: usize) -> bool {
        let word = pixel / 64;
        let bit = pixel % 64;
        self.valid_bitmap
            .get(word)
            .is_some_and(|w| (w >> bit) & 1 == 1)
    }

    /// Record the gate under a pixel.
    #[inline]
    pub fn set(&mut self, pixel: usize, radial: usize, gate: usize) {
        if pixel >= self.indices.len() {
            return;
        }
        self.indices[pixel] = (radial as u32, gate as u32);
        self.valid_bitmap[pixel / 64] |= 1u64 << (pixel % 64);
    }

    /// `(radial, gate)` under a pixel, if valid.
    #[inline]
    pub fn get(&self, pixel: usize) -> Option<(usize, usize)> {
        if self.is_valid(pixel) {
            let (radial, gate) = self.indices[pixel];
            Some((radial as usize, gate as usize))
        } else {
            None
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of pixels that map to a gate.
    pub fn valid_count(&self) -> usize {
        self.valid_bitmap
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    /// Valid pixels with their `(radial, gate)`.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (0..self.indices.len()).filter_map(move |pixel| {
            self.get(pixel).map(|(radial, gate)| (pixel, radial, gate))
        })
    }

    /// Approximate heap size in bytes.
    pub fn memory_usage(&self) -> usize {
        self.indices.len() * std::mem::size_of::<(u32, u32)>() + self.valid_bitmap.len() * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesic::GeoPoint;
    use level3_parser::{GateEncoding, GateLevels, Radial};
    use radar_common::SiteInfo;

    #[test]
    fn test_set_and_get() {
        let mut lut = PolarLut::new(10, 10);
        assert_eq!(lut.valid_count(), 0);
        assert_eq!(lut.get(5), None);

        lut.set(5, 3, 7);
        lut.set(99, 1, 2);
        lut.set(100, 1, 2); // out of range, ignored
        assert_eq!(lut.get(5), Some((3, 7)));
        assert_eq!(lut.get(99), Some((1, 2)));
        assert!(!lut.is_valid(100));
        assert_eq!(lut.valid_count(), 2);
        assert_eq!(lut.iter_valid().count(), 2);
    }

    #[test]
    fn test_build_over_sweep() {
        let site = SiteInfo::new("KTLX", 35.3331, -97.2778, 370.0);
        let georef = Georeferencer::new(&site).unwrap();
        let geometry = GateGeometry::new(0.5, 0.0, 1000.0);
        let gates = 50;
        let radials: Vec<Radial> = (0..360)
            .map(|i| Radial {
                azimuth: i as f64,
                azimuth_delta: 1.0,
                encoding: GateEncoding::Literal8,
                gates: GateLevels::U8(vec![2; gates]),
            })
            .collect();
        let sweep = SweepGeometry::build(&radials, 0.5);

        let coverage = georef.coverage(geometry.max_range(gates));
        let grid = RasterGrid::with_max_dimension(coverage, 64).unwrap();
        let lut = PolarLut::build(&grid, &georef, &sweep, &geometry, gates);

        // The circle fills about pi/4 of its bounding square.
        let fraction = lut.valid_count() as f64 / lut.pixel_count() as f64;
        assert!(fraction > 0.7 && fraction < 0.85, "fraction {}", fraction);

        // A pixel 11 km north of the site falls on a northern radial near gate 11.
        let (col, row) = grid
            .pixel_of(GeoPoint::new(35.3331 + 0.1, -97.2778 + 0.001))
            .unwrap();
        let (radial, gate) = lut.get(row * grid.width + col).unwrap();
        assert!(radial <= 8 || radial >= 352, "radial {}", radial);
        assert!(gate < 15, "gate {}", gate);

        // Corners are outside the coverage circle.
        assert!(!lut.is_valid(0));
        assert!(!lut.is_valid(lut.pixel_count() - 1));
    }
}
