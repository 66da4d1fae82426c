//! Reference ellipsoid parameters.

/// An oblate ellipsoid of revolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    /// The WGS84 ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// Semi-minor axis in meters.
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// Meridional radius of curvature at a latitude (degrees).
    pub fn meridional_radius(&self, lat_deg: f64) -> f64 {
        let s = lat_deg.to_radians().sin();
        let w = 1.0 - self.e2() * s * s;
        self.a * (1.0 - self.e2()) / (w * w.sqrt())
    }

    /// Prime vertical radius of curvature at a latitude (degrees).
    pub fn prime_vertical_radius(&self, lat_deg: f64) -> f64 {
        let s = lat_deg.to_radians().sin();
        self.a / (1.0 - self.e2() * s * s).sqrt()
    }

    /// Gaussian mean radius `sqrt(M * N)`, the radius of the sphere that
    /// best fits the ellipsoid around a latitude.
    pub fn gaussian_radius(&self, lat_deg: f64) -> f64 {
        (self.meridional_radius(lat_deg) * self.prime_vertical_radius(lat_deg)).sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}
