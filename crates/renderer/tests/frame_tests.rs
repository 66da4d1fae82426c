//! Frame building from decoded synthetic products.

use level3_parser::{decode, Product};
use projection::Georeferencer;
use radar_common::{ProductCode, SiteInfo};
use renderer::{
    build_frame, BuildOptions, GeometryKind, LodPolicy, PaletteRegistry, RenderError,
    NO_DATA_COLOR, RANGE_FOLDED_COLOR,
};
use test_utils::level3::Level3Builder;
use test_utils::sites;

fn georef() -> Georeferencer {
    let (id, lat, lon, elev) = sites::KTLX;
    Georeferencer::new(&SiteInfo::new(id, lat, lon, elev)).unwrap()
}

fn decoded(builder: Level3Builder) -> Product {
    decode(&builder.build()).unwrap()
}

fn registry() -> PaletteRegistry {
    PaletteRegistry::builtin().unwrap()
}

#[test]
fn test_mesh_frame() {
    // 17 dBZ everywhere except a below-threshold gap and one range-folded gate
    let mut levels = vec![100u8; 50];
    levels[10] = 0;
    levels[20] = 1;
    let product = decoded(Level3Builder::new_digital().with_uniform_levels(&levels));
    let header = product.header.clone();

    let frame = build_frame(product, &georef(), &registry(), &BuildOptions::default()).unwrap();
    assert_eq!(frame.kind(), GeometryKind::Mesh);
    assert_eq!(frame.header, header);
    assert_eq!(Some(frame.valid_time), header.volume_time);
    assert_eq!(frame.dropped_radials, 0);

    let mesh = frame.geometry.as_mesh().unwrap();
    assert_eq!(mesh.vertex_count(), 360 * 49 * 4);
    assert_eq!(mesh.triangle_count(), 360 * 49 * 2);
    assert!(mesh
        .colors
        .iter()
        .any(|&c| c == RANGE_FOLDED_COLOR.to_array()));
    assert!(mesh.colors.iter().all(|&c| c != NO_DATA_COLOR.to_array()));

    // 50 one-kilometer gates reach about 0.45 degrees of latitude.
    let bbox = frame.bbox();
    assert!((bbox.max_y - 35.3331 - 0.45).abs() < 0.02, "{:?}", bbox);
    assert!((35.3331 - bbox.min_y - 0.45).abs() < 0.02, "{:?}", bbox);

    assert_eq!(frame.palette.name, "Reflectivity");
    assert_eq!(frame.palette.units.as_deref(), Some("dBZ"));
    assert!(!frame.palette.legend.is_empty());
    assert_eq!(frame.palette.range_folded, Some(RANGE_FOLDED_COLOR));
}

#[test]
fn test_hidden_range_folding() {
    let mut levels = vec![0u8; 30];
    levels[5] = 1;
    let product = decoded(Level3Builder::new_digital().with_uniform_levels(&levels));
    let mut options = BuildOptions::default();
    options.colors.show_range_folded = false;

    let frame = build_frame(product, &georef(), &registry(), &options).unwrap();
    let mesh = frame.geometry.as_mesh().unwrap();
    assert!(mesh.is_empty());
    assert_eq!(frame.palette.range_folded, None);
}

#[test]
fn test_low_zoom_builds_raster() {
    let product = decoded(Level3Builder::new_digital().with_uniform_levels(&[100; 40]));
    let options = BuildOptions {
        zoom: 4.0,
        lod: LodPolicy {
            raster_size: 128,
            ..LodPolicy::default()
        },
        ..BuildOptions::default()
    };

    let frame = build_frame(product, &georef(), &registry(), &options).unwrap();
    assert_eq!(frame.kind(), GeometryKind::Raster);
    let image = frame.geometry.as_raster().unwrap();
    assert_eq!(image.width().max(image.height()), 128);
    assert!(image.opaque_count() > 0);

    let summary = frame.summary();
    assert_eq!(summary.kind, GeometryKind::Raster);
    assert_eq!(summary.bytes, image.pixels.len());
}

#[test]
fn test_vertex_budget_forces_raster() {
    let product = decoded(Level3Builder::new_digital());
    let options = BuildOptions {
        lod: LodPolicy {
            max_mesh_vertices: 1_000,
            raster_size: 64,
            ..LodPolicy::default()
        },
        ..BuildOptions::default()
    };
    let frame = build_frame(product, &georef(), &registry(), &options).unwrap();
    assert_eq!(frame.kind(), GeometryKind::Raster);

    let forced = BuildOptions {
        force: Some(GeometryKind::Mesh),
        ..options
    };
    let product = decoded(Level3Builder::new_digital());
    let frame = build_frame(product, &georef(), &registry(), &forced).unwrap();
    assert_eq!(frame.kind(), GeometryKind::Mesh);
}

#[test]
fn test_frame_ids_unique() {
    let a = build_frame(
        decoded(Level3Builder::new_digital()),
        &georef(),
        &registry(),
        &BuildOptions::default(),
    )
    .unwrap();
    let b = build_frame(
        decoded(Level3Builder::new_digital()),
        &georef(),
        &registry(),
        &BuildOptions::default(),
    )
    .unwrap();
    assert_ne!(a.id, b.id);
    assert!(!a.is_newer_than(&b));
}

#[test]
fn test_unparsed_product_not_renderable() {
    let product = decoded(Level3Builder::new_digital().with_packet_code(28));
    let err = build_frame(product, &georef(), &registry(), &BuildOptions::default()).unwrap_err();
    assert!(matches!(err, RenderError::NotRenderable(_)));
    assert_eq!(err.kind(), "not_renderable");
}

#[test]
fn test_missing_palette() {
    let product = decoded(Level3Builder::new_digital());
    let err = build_frame(
        product,
        &georef(),
        &PaletteRegistry::default(),
        &BuildOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err, RenderError::NoPalette(ProductCode(94)));
}
