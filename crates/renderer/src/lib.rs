//! Frame building for decoded radar products.
//!
//! A decoded [`level3_parser::Product`] goes in and an immutable
//! [`RenderFrame`] comes out. Gate levels are colored through product-keyed
//! palettes, and the sweep is drawn either as a triangle mesh with one quad
//! per visible gate or as a georeferenced raster texture. A level-of-detail
//! policy picks between the two.

pub mod builder;
pub mod error;
pub mod frame;
pub mod lod;
pub mod mesh;
pub mod palette;
pub mod png;
pub mod raster;
pub mod style;

pub use builder::{build_frame, BuildOptions};
pub use error::{RenderError, RenderResult};
pub use frame::{FrameGeometry, FrameId, FrameSummary, PaletteInfo, RenderFrame};
pub use lod::{GeometryKind, LodPolicy};
pub use mesh::{build_mesh, estimate_vertices, GeoVertex, MeshGeometry};
pub use palette::{
    colorize, colorize_with, ColorOptions, LevelColors, Palette, PaletteStep, NO_DATA_COLOR,
    RANGE_FOLDED_COLOR,
};
pub use raster::{build_raster, RasterImage};
pub use style::{install_palettes, palettes, PaletteConfig, PaletteRegistry};
