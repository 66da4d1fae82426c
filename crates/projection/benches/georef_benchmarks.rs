//! Benchmarks for georeferencing and lookup table construction.
//!
//! Run with: cargo bench --package projection --bench georef_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use level3_parser::{GateEncoding, GateLevels, Radial};
use projection::{GateGeometry, GeoPoint, Georeferencer, PolarLut, RasterGrid, SweepGeometry};
use radar_common::SiteInfo;

fn ktlx() -> Georeferencer {
    Georeferencer::new(&SiteInfo::new("KTLX", 35.3331, -97.2778, 370.0)).unwrap()
}

fn sweep(radials: usize, gates: usize) -> Vec<Radial> {
    let width = 360.0 / radials as f64;
    (0..radials)
        .map(|i| Radial {
            azimuth: i as f64 * width,
            azimuth_delta: width,
            encoding: GateEncoding::Literal8,
            gates: GateLevels::U8(vec![2; gates]),
        })
        .collect()
}

fn bench_gate_edges(c: &mut Criterion) {
    let georef = ktlx();
    let mut group = c.benchmark_group("ray_projection");

    for &(gates, spacing) in &[(230usize, 1000.0), (1840, 250.0)] {
        let geometry = GateGeometry::new(0.5, 0.0, spacing);
        let edges = georef.gate_edges(&geometry, gates).unwrap();
        group.throughput(Throughput::Elements(gates as u64 + 1));
        group.bench_with_input(BenchmarkId::new("ray", gates), &edges, |b, edges| {
            b.iter(|| georef.ray(black_box(123.5), black_box(edges)))
        });
    }

    group.finish();
}

fn bench_inverse(c: &mut Criterion) {
    let georef = ktlx();
    c.bench_function("inverse_point", |b| {
        b.iter(|| georef.inverse(black_box(GeoPoint::new(36.1, -96.4)), black_box(0.5)))
    });
}

fn bench_sweep_geometry(c: &mut Criterion) {
    let radials = sweep(720, 10);
    c.bench_function("sweep_geometry_720", |b| {
        b.iter(|| SweepGeometry::build(black_box(&radials), 0.5))
    });
}

fn bench_lut(c: &mut Criterion) {
    let georef = ktlx();
    let geometry = GateGeometry::new(0.5, 0.0, 1000.0);
    let radials = sweep(360, 230);
    let sweep = SweepGeometry::build(&radials, 0.5);
    let coverage = georef.coverage(geometry.max_range(230));

    let mut group = c.benchmark_group("polar_lut");
    group.sample_size(10);
    for &size in &[128usize, 256] {
        let grid = RasterGrid::with_max_dimension(coverage, size).unwrap();
        group.throughput(Throughput::Elements(grid.pixel_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| PolarLut::build(grid, &georef, &sweep, &geometry, 230))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_gate_edges,
    bench_inverse,
    bench_sweep_geometry,
    bench_lut
);
criterion_main!(benches);
