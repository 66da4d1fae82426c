//! Benchmarks for the renderer crate - mesh and raster building.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use level3_parser::{DataLevelScheme, DataLevels, GateEncoding, GateLevels, Radial};
use projection::{GateGeometry, Georeferencer, SweepGeometry};
use radar_common::{ProductCode, SiteInfo};
use renderer::{build_mesh, build_raster, png, ColorOptions, LevelColors, PaletteRegistry};
use test_utils::{storm_cell_levels, thresholds};

fn ktlx() -> Georeferencer {
    Georeferencer::new(&SiteInfo::new("KTLX", 35.3331, -97.2778, 370.0)).unwrap()
}

/// A sweep with a storm cell on every radial, peaking at a different gate.
fn storm_sweep(radials: usize, gates: usize) -> Vec<Radial> {
    let width = 360.0 / radials as f64;
    (0..radials)
        .map(|i| Radial {
            azimuth: i as f64 * width,
            azimuth_delta: width,
            encoding: GateEncoding::Literal8,
            gates: GateLevels::U8(storm_cell_levels(gates, gates / 4 + i % 50, gates / 3)),
        })
        .collect()
}

fn level_colors() -> LevelColors {
    let registry = PaletteRegistry::builtin().unwrap();
    let palette = registry.for_product(ProductCode(94)).unwrap();
    let levels =
        DataLevels::from_thresholds(DataLevelScheme::Linear, &thresholds::digital_reflectivity());
    LevelColors::new(&levels, &palette, &ColorOptions::default())
}

fn bench_mesh(c: &mut Criterion) {
    let georef = ktlx();
    let colors = level_colors();
    let geometry = GateGeometry::new(0.5, 0.0, 1000.0);
    let mut group = c.benchmark_group("mesh");
    group.sample_size(20);

    for &(radials, gates) in &[(360usize, 230usize), (720, 460)] {
        let sweep_radials = storm_sweep(radials, gates);
        let sweep = SweepGeometry::build(&sweep_radials, 0.5);
        group.throughput(Throughput::Elements((radials * gates) as u64));
        group.bench_with_input(
            BenchmarkId::new("build_mesh", format!("{}x{}", radials, gates)),
            &sweep_radials,
            |b, r| b.iter(|| build_mesh(black_box(r), &sweep, &georef, &geometry, &colors)),
        );
    }

    group.finish();
}

fn bench_raster(c: &mut Criterion) {
    let georef = ktlx();
    let colors = level_colors();
    let geometry = GateGeometry::new(0.5, 0.0, 1000.0);
    let radials = storm_sweep(360, 230);
    let sweep = SweepGeometry::build(&radials, 0.5);
    let mut group = c.benchmark_group("raster");
    group.sample_size(10);

    for &size in &[256usize, 512] {
        group.bench_with_input(BenchmarkId::new("build_raster", size), &size, |b, &size| {
            b.iter(|| build_raster(&radials, &sweep, &georef, &geometry, &colors, black_box(size)))
        });
    }

    let image = build_raster(&radials, &sweep, &georef, &geometry, &colors, 512).unwrap();
    group.bench_function("png_512", |b| {
        b.iter(|| png::encode_auto(black_box(&image.pixels), image.width(), image.height()))
    });

    group.finish();
}

criterion_group!(benches, bench_mesh, bench_raster);
criterion_main!(benches);
