//! Product to frame building.

use chrono::Utc;
use level3_parser::{Moment, Product};
use projection::{GateGeometry, Georeferencer, SweepGeometry, DEFAULT_BOUNDARY_TOLERANCE_DEG};
use tracing::{debug, instrument};

use crate::error::{RenderError, RenderResult};
use crate::frame::{FrameGeometry, FrameId, PaletteInfo, RenderFrame};
use crate::lod::{GeometryKind, LodPolicy};
use crate::mesh::{build_mesh, estimate_vertices};
use crate::palette::{ColorOptions, LevelColors};
use crate::raster::build_raster;
use crate::style::PaletteRegistry;

/// Options for one frame build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Map zoom level of the view the frame is built for.
    pub zoom: f64,
    /// Build this geometry regardless of the LOD policy.
    pub force: Option<GeometryKind>,
    pub lod: LodPolicy,
    /// Largest gap or overlap in degrees closed by a shared boundary ray.
    pub boundary_tolerance_deg: f64,
    pub colors: ColorOptions,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            zoom: 8.0,
            force: None,
            lod: LodPolicy::default(),
            boundary_tolerance_deg: DEFAULT_BOUNDARY_TOLERANCE_DEG,
            colors: ColorOptions::default(),
        }
    }
}

/// Build a frame from a decoded product.
///
/// The product is consumed; only its header survives in the frame.
#[instrument(
    skip_all,
    fields(
        site = %georef.site().id,
        product = %product.header.product_code,
        radials = product.radials.len(),
    )
)]
pub fn build_frame(
    product: Product,
    georef: &Georeferencer,
    palettes: &PaletteRegistry,
    options: &BuildOptions,
) -> RenderResult<RenderFrame> {
    if let Moment::Unparsed(reason) = product.moment {
        return Err(RenderError::NotRenderable(format!("{:?}", reason)));
    }
    if !product.is_renderable() {
        return Err(RenderError::NotRenderable("no radials".to_string()));
    }
    let valid_time = product
        .header
        .timestamp()
        .ok_or(RenderError::MissingTimestamp)?;
    let code = product.header.product_code;
    let palette = palettes
        .for_product(code)
        .ok_or(RenderError::NoPalette(code))?;
    let levels = product
        .data_levels()
        .ok_or_else(|| RenderError::NotRenderable(format!("unknown product {}", code)))?;

    let colors = LevelColors::new(&levels, &palette, &options.colors);
    let geometry = GateGeometry::from_header(&product.header);
    let sweep = SweepGeometry::build(&product.radials, options.boundary_tolerance_deg);
    if sweep.is_empty() {
        return Err(RenderError::NotRenderable(
            "no radials with gates".to_string(),
        ));
    }

    let estimated = estimate_vertices(&product.radials, &colors);
    let kind = options
        .force
        .unwrap_or_else(|| options.lod.choose(options.zoom, estimated));
    debug!(?kind, estimated_vertices = estimated, zoom = options.zoom, "Chose frame geometry");

    let frame_geometry = match kind {
        GeometryKind::Mesh => FrameGeometry::Mesh(build_mesh(
            &product.radials,
            &sweep,
            georef,
            &geometry,
            &colors,
        )?),
        GeometryKind::Raster => FrameGeometry::Raster(build_raster(
            &product.radials,
            &sweep,
            georef,
            &geometry,
            &colors,
            options.lod.raster_size,
        )?),
    };

    let Product {
        header,
        dropped_radials,
        ..
    } = product;

    Ok(RenderFrame {
        id: FrameId::next(),
        header,
        valid_time,
        geometry: frame_geometry,
        palette: PaletteInfo::from_palette(&palette, options.colors.show_range_folded),
        built_at: Utc::now(),
        dropped_radials: dropped_radials.len(),
    })
}
