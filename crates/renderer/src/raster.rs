//! Georeferenced raster textures of radial sweeps.

use level3_parser::Radial;
use projection::{GateGeometry, Georeferencer, PolarLut, RasterGrid, SweepGeometry};
use radar_common::BoundingBox;
use rayon::prelude::*;
use tracing::debug;

use crate::error::RenderResult;
use crate::palette::{LevelColors, NO_DATA_COLOR};
use crate::png;

/// RGBA texture over a regular lat/lon grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub grid: RasterGrid,
    /// Row-major RGBA, row 0 at the northern edge
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    pub fn bbox(&self) -> BoundingBox {
        self.grid.bbox
    }

    /// GDAL-style affine transform from pixel to geographic coordinates.
    pub fn geo_transform(&self) -> [f64; 6] {
        self.grid.geo_transform()
    }

    pub fn pixel(&self, col: usize, row: usize) -> Option<[u8; 4]> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        let i = (row * self.grid.width + col) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Number of pixels that are not fully transparent.
    pub fn opaque_count(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        png::encode_auto(&self.pixels, self.grid.width, self.grid.height)
    }
}

/// Resample a sweep onto a grid covering the sweep's full range.
///
/// `max_dimension` is the longer side of the grid in pixels.
pub fn build_raster(
    radials: &[Radial],
    sweep: &SweepGeometry,
    georef: &Georeferencer,
    geometry: &GateGeometry,
    colors: &LevelColors,
    max_dimension: usize,
) -> RenderResult<RasterImage> {
    geometry.validate()?;
    let gate_count = radials.iter().map(Radial::gate_count).max().unwrap_or(0);
    let far_edge = georef
        .beam()
        .forward(geometry.max_range(gate_count), geometry.elevation_deg);
    let grid = RasterGrid::with_max_dimension(georef.coverage(far_edge.ground_range), max_dimension)?;

    let lut = PolarLut::build(&grid, georef, sweep, geometry, gate_count);
    let width = grid.width;
    let empty = NO_DATA_COLOR.to_array();

    let mut pixels = vec![0u8; grid.pixel_count() * 4];
    pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(row, line)| {
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let color = lut
                    .get(row * width + col)
                    .and_then(|(radial, gate)| radials[radial].gates.get(gate))
                    .map_or(empty, |level| colors.color(level).to_array());
                px.copy_from_slice(&color);
            }
        });

    let image = RasterImage { grid, pixels };
    debug!(
        width = image.width(),
        height = image.height(),
        covered = lut.valid_count(),
        opaque = image.opaque_count(),
        "Built sweep raster"
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{ColorOptions, Palette, PaletteStep};
    use level3_parser::{DataLevelScheme, DataLevels, GateEncoding, GateLevels};
    use projection::GeoPoint;
    use radar_common::{Rgba, SiteInfo};

    fn colors() -> LevelColors {
        let mut thresholds = [0u16; 16];
        thresholds[0] = (-320i16) as u16;
        thresholds[1] = 5;
        thresholds[2] = 254;
        let levels = DataLevels::from_thresholds(DataLevelScheme::Linear, &thresholds);
        let palette = Palette::new(
            "test",
            vec![
                PaletteStep {
                    lower_bound: 0.0,
                    color: Rgba::opaque(0, 200, 0),
                    label: None,
                },
                PaletteStep {
                    lower_bound: 40.0,
                    color: Rgba::opaque(200, 0, 0),
                    label: None,
                },
            ],
        )
        .unwrap();
        LevelColors::new(&levels, &palette, &ColorOptions::default())
    }

    #[test]
    fn test_east_half_colored() {
        let georef =
            Georeferencer::new(&SiteInfo::new("KTLX", 35.3331, -97.2778, 370.0)).unwrap();
        // 17 dBZ east of north-south, below threshold to the west
        let radials: Vec<Radial> = (0..360)
            .map(|i| Radial {
                azimuth: i as f64,
                azimuth_delta: 1.0,
                encoding: GateEncoding::Literal8,
                gates: GateLevels::U8(vec![if i < 180 { 100 } else { 0 }; 40]),
            })
            .collect();
        let sweep = SweepGeometry::build(&radials, 0.5);
        let geometry = GateGeometry::new(0.5, 0.0, 1000.0);
        let image = build_raster(&radials, &sweep, &georef, &geometry, &colors(), 64).unwrap();

        assert_eq!(image.width().max(image.height()), 64);
        assert_eq!(image.pixels.len(), image.width() * image.height() * 4);

        let green = [0, 200, 0, 255];
        let east = GeoPoint::new(35.3331, -97.2778 + 0.2);
        let west = GeoPoint::new(35.3331, -97.2778 - 0.2);
        let (col, row) = image.grid.pixel_of(east).unwrap();
        assert_eq!(image.pixel(col, row), Some(green));
        let (col, row) = image.grid.pixel_of(west).unwrap();
        assert_eq!(image.pixel(col, row), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(image.width(), 0), None);

        // Half the coverage circle is drawn.
        let fraction = image.opaque_count() as f64 / (image.width() * image.height()) as f64;
        assert!(fraction > 0.33 && fraction < 0.43, "fraction {}", fraction);

        let png = image.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
