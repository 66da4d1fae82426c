//! Gate positions on the ellipsoid.

use level3_parser::{ProductHeader, Radial};
use radar_common::{normalize_azimuth, BoundingBox, SiteInfo};

use crate::beam::{BeamModel, BeamPoint};
use crate::ellipsoid::Ellipsoid;
use crate::error::{ProjectionError, ProjectionResult};
use crate::geodesic::GeoPoint;

/// Range layout of the gates along a radial.
///
/// Gate `i` spans slant ranges
/// `[first_gate_range + i * gate_spacing, first_gate_range + (i + 1) * gate_spacing)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateGeometry {
    /// Antenna elevation angle in degrees
    pub elevation_deg: f64,
    /// Slant range to the near edge of gate 0 in meters
    pub first_gate_range: f64,
    /// Gate length in meters
    pub gate_spacing: f64,
}

impl GateGeometry {
    pub fn new(elevation_deg: f64, first_gate_range: f64, gate_spacing: f64) -> Self {
        Self {
            elevation_deg,
            first_gate_range,
            gate_spacing,
        }
    }

    pub fn from_header(header: &ProductHeader) -> Self {
        Self::new(
            header.elevation_angle_deg,
            header.range_to_first_gate_m,
            header.gate_spacing_m,
        )
    }

    pub fn validate(&self) -> ProjectionResult<()> {
        if !self.gate_spacing.is_finite() || self.gate_spacing <= 0.0 {
            return Err(ProjectionError::invalid_geometry(format!(
                "gate spacing {} m",
                self.gate_spacing
            )));
        }
        if !self.first_gate_range.is_finite() || self.first_gate_range < 0.0 {
            return Err(ProjectionError::invalid_geometry(format!(
                "first gate range {} m",
                self.first_gate_range
            )));
        }
        if !self.elevation_deg.is_finite() || !(-2.0..90.0).contains(&self.elevation_deg) {
            return Err(ProjectionError::invalid_geometry(format!(
                "elevation angle {} deg",
                self.elevation_deg
            )));
        }
        Ok(())
    }

    /// Slant range of the near edge of gate `index`.
    pub fn edge_range(&self, index: usize) -> f64 {
        self.first_gate_range + index as f64 * self.gate_spacing
    }

    /// Slant range just past the last of `gate_count` gates.
    pub fn max_range(&self, gate_count: usize) -> f64 {
        self.edge_range(gate_count)
    }

    /// Gate containing a slant range, if any of the `gate_count` gates do.
    pub fn gate_at(&self, slant_range: f64, gate_count: usize) -> Option<usize> {
        let offset = (slant_range - self.first_gate_range) / self.gate_spacing;
        if !(offset >= 0.0) {
            return None;
        }
        let gate = offset.floor() as usize;
        (gate < gate_count).then_some(gate)
    }
}

/// Geographic position of a sample along the beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatePosition {
    pub lat: f64,
    pub lon: f64,
    /// Distance along the surface from the site, meters.
    pub ground_range: f64,
    /// Beam height above mean sea level, meters.
    pub height_msl: f64,
}

/// A geographic point expressed in radar coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarPoint {
    /// Degrees clockwise from north in `[0, 360)`.
    pub azimuth: f64,
    pub ground_range: f64,
    pub slant_range: f64,
}

/// Polar to geographic transform for one radar site.
#[derive(Debug, Clone)]
pub struct Georeferencer {
    site: SiteInfo,
    origin: GeoPoint,
    ellipsoid: Ellipsoid,
    beam: BeamModel,
}

impl Georeferencer {
    /// Georeferencer on WGS84 with standard refraction.
    ///
    /// Fails with [`ProjectionError::InvalidSite`] for non-finite or out of
    /// range site coordinates.
    pub fn new(site: &SiteInfo) -> ProjectionResult<Self> {
        Self::with_ellipsoid(site, Ellipsoid::WGS84)
    }

    pub fn with_ellipsoid(site: &SiteInfo, ellipsoid: Ellipsoid) -> ProjectionResult<Self> {
        site.validate()?;
        Ok(Self {
            site: site.clone(),
            origin: GeoPoint::new(site.latitude, site.longitude),
            beam: BeamModel::for_latitude(&ellipsoid, site.latitude),
            ellipsoid,
        })
    }

    pub fn site(&self) -> &SiteInfo {
        &self.site
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn beam(&self) -> &BeamModel {
        &self.beam
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Position of the beam at a slant range along an azimuth.
    pub fn locate(&self, azimuth: f64, slant_range: f64, elevation_deg: f64) -> GatePosition {
        let sample = self.beam.forward(slant_range, elevation_deg);
        self.place(azimuth, sample)
    }

    fn place(&self, azimuth: f64, sample: BeamPoint) -> GatePosition {
        let p = self
            .ellipsoid
            .direct(self.origin, normalize_azimuth(azimuth), sample.ground_range);
        GatePosition {
            lat: p.lat,
            lon: p.lon,
            ground_range: sample.ground_range,
            height_msl: sample.height + self.site.elevation_m,
        }
    }

    /// Beam samples at the `gate_count + 1` gate edges of a radial.
    ///
    /// The samples depend only on range and elevation, so one set serves
    /// every ray of a sweep.
    pub fn gate_edges(
        &self,
        geometry: &GateGeometry,
        gate_count: usize,
    ) -> ProjectionResult<Vec<BeamPoint>> {
        geometry.validate()?;
        Ok((0..=gate_count)
            .map(|i| self.beam.forward(geometry.edge_range(i), geometry.elevation_deg))
            .collect())
    }

    /// Geographic positions of beam samples along one azimuth.
    pub fn ray(&self, azimuth: f64, samples: &[BeamPoint]) -> Vec<GeoPoint> {
        let azimuth = normalize_azimuth(azimuth);
        samples
            .iter()
            .map(|s| self.ellipsoid.direct(self.origin, azimuth, s.ground_range))
            .collect()
    }

    /// One position per gate of a radial, at each gate's near edge.
    pub fn project_radial(
        &self,
        radial: &Radial,
        geometry: &GateGeometry,
    ) -> ProjectionResult<Vec<GatePosition>> {
        geometry.validate()?;
        Ok((0..radial.gate_count())
            .map(|i| self.locate(radial.azimuth, geometry.edge_range(i), geometry.elevation_deg))
            .collect())
    }

    /// Radar coordinates of a geographic point, or `None` if the beam never
    /// passes over it.
    pub fn inverse(&self, point: GeoPoint, elevation_deg: f64) -> Option<PolarPoint> {
        let solution = self.ellipsoid.inverse(self.origin, point)?;
        let slant_range = self
            .beam
            .slant_range_at(solution.distance, elevation_deg)?;
        Some(PolarPoint {
            azimuth: solution.initial_azimuth,
            ground_range: solution.distance,
            slant_range,
        })
    }

    /// Bounding box of everything within a ground range of the site.
    pub fn coverage(&self, ground_range: f64) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        bbox.expand(self.origin.lon, self.origin.lat);
        for step in 0..360 {
            let p = self
                .ellipsoid
                .direct(self.origin, f64::from(step), ground_range);
            bbox.expand(p.lon, p.lat);
        }
        // The one-degree sampling can miss the true extremes by a hair.
        let pad_x = bbox.width() * 1e-3;
        let pad_y = bbox.height() * 1e-3;
        BoundingBox::new(
            bbox.min_x - pad_x,
            bbox.min_y - pad_y,
            bbox.max_x + pad_x,
            bbox.max_y + pad_y,
        )
    }
}

/// Project every gate of a radial for a site.
///
/// Slant range of gate `i` is `first_gate_range + i * gate_spacing`.
pub fn project(
    site: &SiteInfo,
    radial: &Radial,
    geometry: &GateGeometry,
) -> ProjectionResult<Vec<GatePosition>> {
    Georeferencer::new(site)?.project_radial(radial, geometry)
}
