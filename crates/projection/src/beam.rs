//! Radar beam propagation.
//!
//! Uses the effective earth radius model: standard atmospheric refraction
//! bends the beam downward, which is modelled by propagating a straight ray
//! over a sphere of radius `k * R` with `k = 4/3`. `R` is the Gaussian mean
//! radius of the ellipsoid at the site latitude.

use crate::ellipsoid::Ellipsoid;

/// Effective earth radius multiplier for a standard atmosphere.
pub const STANDARD_REFRACTION: f64 = 4.0 / 3.0;

/// Position of a beam sample relative to the antenna.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamPoint {
    /// Distance along the earth's surface from the site, meters.
    pub ground_range: f64,
    /// Height of the beam center above the antenna, meters.
    pub height: f64,
}

/// Beam geometry for one site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamModel {
    /// Effective earth radius in meters
    pub effective_radius: f64,
}

impl BeamModel {
    /// Standard-refraction model for a site latitude.
    pub fn for_latitude(ellipsoid: &Ellipsoid, lat_deg: f64) -> Self {
        Self::with_refraction(ellipsoid, lat_deg, STANDARD_REFRACTION)
    }

    pub fn with_refraction(ellipsoid: &Ellipsoid, lat_deg: f64, k: f64) -> Self {
        Self {
            effective_radius: k * ellipsoid.gaussian_radius(lat_deg),
        }
    }

    /// Ground range and height of the beam at a slant range.
    pub fn forward(&self, slant_range: f64, elevation_deg: f64) -> BeamPoint {
        let ae = self.effective_radius;
        let (sin_e, cos_e) = elevation_deg.to_radians().sin_cos();
        let height =
            (slant_range * slant_range + ae * ae + 2.0 * slant_range * ae * sin_e).sqrt() - ae;
        let ground_range = ae * (slant_range * cos_e / (ae + height)).asin();
        BeamPoint {
            ground_range,
            height,
        }
    }

    /// Slant range at which the beam passes over a ground range.
    ///
    /// Returns `None` when the ray never reaches that ground range, i.e.
    /// when the point lies beyond the beam's tangent horizon for steep
    /// elevations.
    pub fn slant_range_at(&self, ground_range: f64, elevation_deg: f64) -> Option<f64> {
        let ae = self.effective_radius;
        let phi = ground_range / ae;
        let denom = (elevation_deg.to_radians() + phi).cos();
        if denom <= 0.0 {
            return None;
        }
        Some(ae * phi.sin() / denom)
    }
}
