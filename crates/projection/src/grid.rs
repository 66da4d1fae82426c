//! Regular latitude/longitude raster grids.

use nalgebra::{Matrix3, Vector3};
use radar_common::BoundingBox;

use crate::error::{ProjectionError, ProjectionResult};
use crate::geodesic::GeoPoint;

/// An equirectangular pixel grid over a bounding box.
///
/// Row 0 is the northern edge. The affine transform maps homogeneous pixel
/// coordinates `(col, row, 1)` to `(lon, lat, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub bbox: BoundingBox,
    transform: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl RasterGrid {
    /// Grid of `width` x `height` pixels exactly covering `bbox`.
    pub fn covering(bbox: BoundingBox, width: usize, height: usize) -> ProjectionResult<Self> {
        if width == 0 || height == 0 {
            return Err(ProjectionError::InvalidGrid(format!(
                "{}x{} pixels",
                width, height
            )));
        }
        if bbox.is_empty() || !(bbox.width() > 0.0 && bbox.height() > 0.0) {
            return Err(ProjectionError::InvalidGrid(format!(
                "degenerate bounding box {:?}",
                bbox
            )));
        }

        let dx = bbox.width() / width as f64;
        let dy = bbox.height() / height as f64;
        #[rustfmt::skip]
        let transform = Matrix3::new(
            dx,  0.0, bbox.min_x,
            0.0, -dy, bbox.max_y,
            0.0, 0.0, 1.0,
        );
        let inverse = transform
            .try_inverse()
            .ok_or_else(|| ProjectionError::InvalidGrid("singular transform".to_string()))?;

        Ok(Self {
            width,
            height,
            bbox,
            transform,
            inverse,
        })
    }

    /// Grid whose longer side has `max_dimension` pixels, with square
    /// pixels in ground distance at the box center.
    pub fn with_max_dimension(bbox: BoundingBox, max_dimension: usize) -> ProjectionResult<Self> {
        let (_, center_lat) = bbox.center();
        let ground_width = bbox.width() * center_lat.to_radians().cos();
        let ground_height = bbox.height();
        let max = max_dimension as f64;

        let (width, height) = if ground_width >= ground_height {
            (max, max * ground_height / ground_width)
        } else {
            (max * ground_width / ground_height, max)
        };
        Self::covering(
            bbox,
            (width.round() as usize).max(1),
            (height.round() as usize).max(1),
        )
    }

    pub fn transform(&self) -> &Matrix3<f64> {
        &self.transform
    }

    /// GDAL-style geotransform `[origin_x, dx, 0, origin_y, 0, -dy]`.
    pub fn geo_transform(&self) -> [f64; 6] {
        let t = &self.transform;
        [t[(0, 2)], t[(0, 0)], t[(0, 1)], t[(1, 2)], t[(1, 0)], t[(1, 1)]]
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Geographic position of a pixel center.
    pub fn pixel_center(&self, col: usize, row: usize) -> GeoPoint {
        let p = self.transform * Vector3::new(col as f64 + 0.5, row as f64 + 0.5, 1.0);
        GeoPoint::new(p.y, p.x)
    }

    /// Pixel containing a geographic point.
    pub fn pixel_of(&self, point: GeoPoint) -> Option<(usize, usize)> {
        let p = self.inverse * Vector3::new(point.lon, point.lat, 1.0);
        if !(p.x >= 0.0 && p.y >= 0.0) {
            return None;
        }
        let (col, row) = (p.x.floor() as usize, p.y.floor() as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_centers() {
        let grid = RasterGrid::covering(BoundingBox::new(-100.0, 30.0, -90.0, 40.0), 10, 10)
            .unwrap();
        let p = grid.pixel_center(0, 0);
        assert!((p.lon + 99.5).abs() < 1e-12);
        assert!((p.lat - 39.5).abs() < 1e-12);
        let p = grid.pixel_center(9, 9);
        assert!((p.lon + 90.5).abs() < 1e-12);
        assert!((p.lat - 30.5).abs() < 1e-12);
    }

    #[test]
    fn test_pixel_of_inverts_center() {
        let grid = RasterGrid::covering(BoundingBox::new(-100.0, 30.0, -90.0, 40.0), 64, 32)
            .unwrap();
        for &(col, row) in &[(0, 0), (13, 7), (63, 31)] {
            assert_eq!(grid.pixel_of(grid.pixel_center(col, row)), Some((col, row)));
        }
        assert_eq!(grid.pixel_of(GeoPoint::new(41.0, -95.0)), None);
        assert_eq!(grid.pixel_of(GeoPoint::new(35.0, -101.0)), None);
    }

    #[test]
    fn test_geo_transform() {
        let grid = RasterGrid::covering(BoundingBox::new(-100.0, 30.0, -90.0, 40.0), 100, 50)
            .unwrap();
        assert_eq!(grid.geo_transform(), [-100.0, 0.1, 0.0, 40.0, 0.0, -0.2]);
    }

    #[test]
    fn test_max_dimension_keeps_aspect() {
        // Four degrees of longitude at 60N span about two degrees of latitude.
        let grid =
            RasterGrid::with_max_dimension(BoundingBox::new(-153.0, 59.0, -149.0, 61.0), 512)
                .unwrap();
        assert_eq!(grid.height, 512);
        assert!((grid.width as i64 - 512).abs() <= 2, "width {}", grid.width);
    }

    #[test]
    fn test_degenerate_grid_rejected() {
        assert!(RasterGrid::covering(BoundingBox::new(0.0, 0.0, 0.0, 1.0), 10, 10).is_err());
        assert!(RasterGrid::covering(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0, 10).is_err());
    }
}
