//! Vincenty's direct and inverse geodesic solutions.
//!
//! Both iterate to 1e-12 radians, which is sub-millimeter at radar ranges.
//! The inverse solution fails to converge only for nearly antipodal points,
//! which never occur within a radar's coverage.

use crate::ellipsoid::Ellipsoid;

const TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 200;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Result of the inverse problem between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseSolution {
    /// Ellipsoidal distance in meters.
    pub distance: f64,
    /// Forward azimuth at the first point, degrees clockwise from north in
    /// `[0, 360)`.
    pub initial_azimuth: f64,
    /// Forward azimuth at the second point, degrees in `[0, 360)`.
    pub final_azimuth: f64,
}

/// Wrap a longitude into `[-180, 180)`.
fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn series_a(u2: f64) -> f64 {
    1.0 + u2 / 16384.0 * (4096.0 + u2 * (-768.0 + u2 * (320.0 - 175.0 * u2)))
}

fn series_b(u2: f64) -> f64 {
    u2 / 1024.0 * (256.0 + u2 * (-128.0 + u2 * (74.0 - 47.0 * u2)))
}

fn delta_sigma(b: f64, sin_sigma: f64, cos_sigma: f64, cos_2sm: f64) -> f64 {
    let cos2 = cos_2sm * cos_2sm;
    b * sin_sigma
        * (cos_2sm
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos2)
                    - b / 6.0 * cos_2sm * (-3.0 + 4.0 * sin_sigma * sin_sigma) * (-3.0 + 4.0 * cos2)))
}

impl Ellipsoid {
    /// Destination reached by travelling `distance` meters from `origin`
    /// along the geodesic with initial azimuth `azimuth_deg`.
    pub fn direct(&self, origin: GeoPoint, azimuth_deg: f64, distance: f64) -> GeoPoint {
        if distance == 0.0 {
            return origin;
        }

        let (a, f, b) = (self.a, self.f, self.b());
        let alpha1 = azimuth_deg.to_radians();
        let (sin_alpha1, cos_alpha1) = alpha1.sin_cos();

        let tan_u1 = (1.0 - f) * origin.lat.to_radians().tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;

        let sigma1 = tan_u1.atan2(cos_alpha1);
        let sin_alpha = cos_u1 * sin_alpha1;
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        let u2 = cos2_alpha * (a * a - b * b) / (b * b);
        let big_a = series_a(u2);
        let big_b = series_b(u2);

        let sigma0 = distance / (b * big_a);
        let mut sigma = sigma0;
        let mut cos_2sm;
        let mut sin_sigma;
        let mut cos_sigma;
        let mut iterations = 0;
        loop {
            cos_2sm = (2.0 * sigma1 + sigma).cos();
            sin_sigma = sigma.sin();
            cos_sigma = sigma.cos();
            let next = sigma0 + delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sm);
            iterations += 1;
            if (next - sigma).abs() < TOLERANCE || iterations >= MAX_ITERATIONS {
                sigma = next;
                break;
            }
            sigma = next;
        }
        cos_2sm = (2.0 * sigma1 + sigma).cos();
        sin_sigma = sigma.sin();
        cos_sigma = sigma.cos();

        let x = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
        let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
            .atan2((1.0 - f) * (sin_alpha * sin_alpha + x * x).sqrt());
        let lambda =
            (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
        let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));
        let l = lambda
            - (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sm + c * cos_sigma * (-1.0 + 2.0 * cos_2sm * cos_2sm)));

        GeoPoint {
            lat: lat2.to_degrees(),
            lon: wrap_longitude(origin.lon + l.to_degrees()),
        }
    }

    /// Distance and azimuths between two points, or `None` when the
    /// iteration does not converge.
    pub fn inverse(&self, from: GeoPoint, to: GeoPoint) -> Option<InverseSolution> {
        let (a, f, b) = (self.a, self.f, self.b());
        let l = wrap_longitude(to.lon - from.lon).to_radians();

        let tan_u1 = (1.0 - f) * from.lat.to_radians().tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;
        let tan_u2 = (1.0 - f) * to.lat.to_radians().tan();
        let cos_u2 = 1.0 / (1.0 + tan_u2 * tan_u2).sqrt();
        let sin_u2 = tan_u2 * cos_u2;

        let mut lambda = l;
        let mut converged = false;
        let (mut sin_lambda, mut cos_lambda) = (0.0, 0.0);
        let (mut sin_sigma, mut cos_sigma, mut sigma) = (0.0, 0.0, 0.0);
        let (mut cos2_alpha, mut cos_2sm) = (0.0, 0.0);

        for _ in 0..MAX_ITERATIONS {
            (sin_lambda, cos_lambda) = lambda.sin_cos();
            let t1 = cos_u2 * sin_lambda;
            let t2 = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
            sin_sigma = (t1 * t1 + t2 * t2).sqrt();
            if sin_sigma == 0.0 {
                return Some(InverseSolution {
                    distance: 0.0,
                    initial_azimuth: 0.0,
                    final_azimuth: 0.0,
                });
            }
            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos2_alpha = 1.0 - sin_alpha * sin_alpha;
            // Equatorial lines have cos2_alpha == 0.
            cos_2sm = if cos2_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
            } else {
                0.0
            };
            let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));
            let next = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sm + c * cos_sigma * (-1.0 + 2.0 * cos_2sm * cos_2sm)));
            let done = (next - lambda).abs() < TOLERANCE;
            lambda = next;
            if done {
                converged = true;
                break;
            }
        }
        if !converged {
            return None;
        }

        let u2 = cos2_alpha * (a * a - b * b) / (b * b);
        let big_a = series_a(u2);
        let big_b = series_b(u2);
        let distance =
            b * big_a * (sigma - delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sm));

        let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
        let alpha2 = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

        Some(InverseSolution {
            distance,
            initial_azimuth: radar_common::normalize_azimuth(alpha1.to_degrees()),
            final_azimuth: radar_common::normalize_azimuth(alpha2.to_degrees()),
        })
    }
}
