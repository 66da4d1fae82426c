//! Immutable render frames.

use chrono::{DateTime, Utc};
use level3_parser::ProductHeader;
use radar_common::{BoundingBox, Rgba};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::lod::GeometryKind;
use crate::mesh::MeshGeometry;
use crate::palette::{Palette, PaletteStep};
use crate::raster::RasterImage;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique frame identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(pub u64);

impl FrameId {
    pub fn next() -> Self {
        FrameId(NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameGeometry {
    Mesh(MeshGeometry),
    Raster(RasterImage),
}

impl FrameGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            FrameGeometry::Mesh(_) => GeometryKind::Mesh,
            FrameGeometry::Raster(_) => GeometryKind::Raster,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshGeometry> {
        match self {
            FrameGeometry::Mesh(mesh) => Some(mesh),
            FrameGeometry::Raster(_) => None,
        }
    }

    pub fn as_raster(&self) -> Option<&RasterImage> {
        match self {
            FrameGeometry::Raster(image) => Some(image),
            FrameGeometry::Mesh(_) => None,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            FrameGeometry::Mesh(mesh) => mesh.bbox,
            FrameGeometry::Raster(image) => image.bbox(),
        }
    }

    /// Approximate size of the geometry buffers in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            FrameGeometry::Mesh(mesh) => mesh.byte_size(),
            FrameGeometry::Raster(image) => image.pixels.len(),
        }
    }
}

/// Palette metadata a renderer needs to draw a legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteInfo {
    pub name: String,
    pub units: Option<String>,
    pub legend: Vec<PaletteStep>,
    /// Color of range-folded gates, `None` when they are hidden.
    pub range_folded: Option<Rgba>,
}

impl PaletteInfo {
    pub fn from_palette(palette: &Palette, show_range_folded: bool) -> Self {
        Self {
            name: palette.name.clone(),
            units: palette.units.clone(),
            legend: palette.steps().collect(),
            range_folded: show_range_folded.then(|| palette.range_folded_color()),
        }
    }
}

/// A fully built frame, ready for display. Never mutated after building.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub id: FrameId,
    /// Header of the product the frame was built from.
    pub header: ProductHeader,
    /// Volume scan time of the source product
    pub valid_time: DateTime<Utc>,
    pub geometry: FrameGeometry,
    pub palette: PaletteInfo,
    pub built_at: DateTime<Utc>,
    /// Radials discarded while decoding
    pub dropped_radials: usize,
}

impl RenderFrame {
    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    pub fn bbox(&self) -> BoundingBox {
        self.geometry.bbox()
    }

    pub fn is_newer_than(&self, other: &RenderFrame) -> bool {
        self.valid_time > other.valid_time
    }

    /// Frame summary without geometry buffers.
    pub fn summary(&self) -> FrameSummary {
        FrameSummary {
            id: self.id,
            site_id: self.header.site_id.clone(),
            product_code: self.header.product_code.value(),
            valid_time: self.valid_time,
            elevation_deg: self.header.elevation_angle_deg,
            kind: self.kind(),
            bbox: self.bbox(),
            bytes: self.geometry.byte_size(),
            palette: self.palette.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub id: FrameId,
    pub site_id: String,
    pub product_code: i16,
    pub valid_time: DateTime<Utc>,
    pub elevation_deg: f64,
    pub kind: GeometryKind,
    pub bbox: BoundingBox,
    pub bytes: usize,
    pub palette: String,
}
