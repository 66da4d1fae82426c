//! Polar radar coordinates to geographic coordinates.
//!
//! A gate is addressed by the azimuth of its radial and its slant range
//! along the beam. [`Georeferencer`] combines an effective-earth-radius
//! beam model with Vincenty geodesics on the WGS84 ellipsoid to place gates
//! on the map, and inverts the mapping for raster resampling.
//! [`SweepGeometry`] turns a sweep's radials into shared boundary rays and
//! [`PolarLut`] caches the per-pixel inverse mapping for a raster grid.

pub mod beam;
pub mod ellipsoid;
pub mod error;
pub mod geodesic;
pub mod georef;
pub mod grid;
pub mod lut;
pub mod sweep;

pub use beam::{BeamModel, BeamPoint};
pub use ellipsoid::Ellipsoid;
pub use error::{ProjectionError, ProjectionResult};
pub use geodesic::{GeoPoint, InverseSolution};
pub use georef::{project, GateGeometry, GatePosition, Georeferencer, PolarPoint};
pub use grid::RasterGrid;
pub use lut::PolarLut;
pub use sweep::{RadialSpan, SweepGeometry, DEFAULT_BOUNDARY_TOLERANCE_DEG};
