//! Triangle meshes of radial sweeps.
//!
//! Every visible gate becomes one quad: four vertices on the two boundary
//! rays of its radial at the gate's near and far range, and two triangles.
//! Vertex positions are `f32` degree offsets from an `f64` origin at the
//! radar site, which keeps them precise after upload to a GPU.

use level3_parser::Radial;
use projection::{GateGeometry, GeoPoint, Georeferencer, SweepGeometry};
use radar_common::{BoundingBox, Rgba};
use tracing::debug;

use crate::error::RenderResult;
use crate::palette::LevelColors;

pub const VERTICES_PER_GATE: usize = 4;
pub const INDICES_PER_GATE: usize = 6;

/// A mesh vertex in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoVertex {
    pub lat: f64,
    pub lon: f64,
    pub value: f32,
    pub color: Rgba,
}

/// Indexed triangle mesh, one flat-colored quad per visible gate.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    /// Radar site; positions are relative to it.
    pub origin: GeoPoint,
    /// `(lon, lat)` offsets from the origin in degrees
    pub positions: Vec<[f32; 2]>,
    pub values: Vec<f32>,
    pub colors: Vec<[u8; 4]>,
    /// Triangle list
    pub indices: Vec<u32>,
    pub bbox: BoundingBox,
}

/// Difference of two longitudes, wrapped into `[-180, 180)`.
fn lon_offset(lon: f64, origin: f64) -> f64 {
    (lon - origin + 180.0).rem_euclid(360.0) - 180.0
}

impl MeshGeometry {
    pub fn empty(origin: GeoPoint) -> Self {
        Self {
            origin,
            positions: Vec::new(),
            values: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
            bbox: BoundingBox::new(origin.lon, origin.lat, origin.lon, origin.lat),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex `i` in absolute coordinates.
    pub fn vertex(&self, i: usize) -> Option<GeoVertex> {
        let [dlon, dlat] = *self.positions.get(i)?;
        let [r, g, b, a] = self.colors[i];
        let lon = self.origin.lon + f64::from(dlon);
        Some(GeoVertex {
            lat: self.origin.lat + f64::from(dlat),
            lon: (lon + 180.0).rem_euclid(360.0) - 180.0,
            value: self.values[i],
            color: Rgba::new(r, g, b, a),
        })
    }

    /// Size of the vertex and index buffers in bytes.
    pub fn byte_size(&self) -> usize {
        self.positions.len() * (8 + 4 + 4) + self.indices.len() * 4
    }

    fn push_quad(&mut self, corners: [GeoPoint; 4], value: f32, color: Rgba) {
        let base = self.positions.len() as u32;
        for corner in corners {
            let dlon = lon_offset(corner.lon, self.origin.lon);
            let dlat = corner.lat - self.origin.lat;
            self.bbox.expand(self.origin.lon + dlon, corner.lat);
            self.positions.push([dlon as f32, dlat as f32]);
            self.values.push(value);
            self.colors.push(color.to_array());
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Number of vertices a mesh of these radials would have.
pub fn estimate_vertices(radials: &[Radial], colors: &LevelColors) -> usize {
    radials
        .iter()
        .map(|r| r.gates.iter().filter(|&level| colors.is_visible(level)).count())
        .sum::<usize>()
        * VERTICES_PER_GATE
}

/// Build the mesh of a sweep.
///
/// Quads of neighboring radials that share a boundary ray reuse the exact
/// same ray positions, so there are no slivers between them.
pub fn build_mesh(
    radials: &[Radial],
    sweep: &SweepGeometry,
    georef: &Georeferencer,
    geometry: &GateGeometry,
    colors: &LevelColors,
) -> RenderResult<MeshGeometry> {
    let max_gates = radials.iter().map(Radial::gate_count).max().unwrap_or(0);
    let edges = georef.gate_edges(geometry, max_gates)?;

    // Only project rays that bound at least one visible gate.
    let mut needed = vec![false; sweep.rays().len()];
    for span in sweep.spans() {
        let radial = &radials[span.radial];
        if radial.gates.iter().any(|level| colors.is_visible(level)) {
            needed[span.start_ray] = true;
            needed[span.end_ray] = true;
        }
    }
    let rays: Vec<Vec<GeoPoint>> = sweep
        .rays()
        .iter()
        .zip(&needed)
        .map(|(&azimuth, &needed)| {
            if needed {
                georef.ray(azimuth, &edges)
            } else {
                Vec::new()
            }
        })
        .collect();

    let mut mesh = MeshGeometry::empty(georef.origin());
    let estimate = estimate_vertices(radials, colors);
    mesh.positions.reserve(estimate);
    mesh.values.reserve(estimate);
    mesh.colors.reserve(estimate);
    mesh.indices
        .reserve(estimate / VERTICES_PER_GATE * INDICES_PER_GATE);

    for span in sweep.spans() {
        let radial = &radials[span.radial];
        let (near_side, far_side) = (&rays[span.start_ray], &rays[span.end_ray]);
        for (gate, level) in radial.gates.iter().enumerate() {
            let color = colors.color(level);
            if color.is_transparent() {
                continue;
            }
            mesh.push_quad(
                [
                    near_side[gate],
                    far_side[gate],
                    far_side[gate + 1],
                    near_side[gate + 1],
                ],
                colors.value(level),
                color,
            );
        }
    }

    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        rays = needed.iter().filter(|&&n| n).count(),
        "Built sweep mesh"
    );
    Ok(mesh)
}
