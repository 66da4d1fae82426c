//! Level-of-detail choice between mesh and raster geometry.

use serde::{Deserialize, Serialize};

/// Which geometry a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Mesh,
    Raster,
}

/// Meshes look sharp up close but cost four vertices per visible gate;
/// rasters have a fixed cost and suit zoomed-out views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodPolicy {
    /// Lowest map zoom level drawn as a mesh.
    pub mesh_min_zoom: f64,
    /// Largest mesh, in vertices, before falling back to a raster.
    pub max_mesh_vertices: usize,
    /// Longer side of raster frames in pixels.
    pub raster_size: usize,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            mesh_min_zoom: 7.0,
            max_mesh_vertices: 2_000_000,
            raster_size: 1024,
        }
    }
}

impl LodPolicy {
    pub fn choose(&self, zoom: f64, estimated_vertices: usize) -> GeometryKind {
        if zoom >= self.mesh_min_zoom && estimated_vertices <= self.max_mesh_vertices {
            GeometryKind::Mesh
        } else {
            GeometryKind::Raster
        }
    }
}
