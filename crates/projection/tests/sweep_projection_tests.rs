//! Sweep-level georeferencing against the site fixtures.

use level3_parser::{GateEncoding, GateLevels, Radial};
use projection::{GateGeometry, GeoPoint, Georeferencer, SweepGeometry};
use radar_common::SiteInfo;
use test_utils::{assert_approx_eq, full_sweep_azimuths, sites};

fn site((id, lat, lon, elev): (&str, f64, f64, f64)) -> SiteInfo {
    SiteInfo::new(id, lat, lon, elev)
}

fn radials(azimuths: &[f64], gates: usize) -> Vec<Radial> {
    azimuths
        .iter()
        .map(|&azimuth| Radial {
            azimuth,
            azimuth_delta: 1.0,
            encoding: GateEncoding::Literal8,
            gates: GateLevels::U8(vec![2; gates]),
        })
        .collect()
}

#[test]
fn test_shared_ray_vertices_identical_across_north() {
    let georef = Georeferencer::new(&site(sites::PAHG)).unwrap();
    let geometry = GateGeometry::new(0.5, 0.0, 1000.0);
    let sweep = SweepGeometry::build(&radials(&full_sweep_azimuths(360, 0.5), 230), 0.5);

    let last = sweep.spans()[sweep.len() - 1];
    let first = sweep.spans()[0];
    assert_eq!(last.end_ray, first.start_ray);

    let edges = georef.gate_edges(&geometry, 230).unwrap();
    let closing = georef.ray(sweep.rays()[last.end_ray], &edges);
    let opening = georef.ray(sweep.rays()[first.start_ray], &edges);
    assert_eq!(closing, opening);
}

#[test]
fn test_far_gate_distance_matches_ground_range() {
    for fixture in [sites::KTLX, sites::KAMX, sites::PAHG] {
        let georef = Georeferencer::new(&site(fixture)).unwrap();
        let pos = georef.locate(77.0, 200_000.0, 0.5);
        let inverse = georef
            .ellipsoid()
            .inverse(georef.origin(), GeoPoint::new(pos.lat, pos.lon))
            .unwrap();
        assert_approx_eq!(inverse.distance, pos.ground_range, 1e-3);
        assert_approx_eq!(inverse.initial_azimuth, 77.0, 1e-8);
        // 0.5 degree beam is around 4 km up at 200 km.
        assert!(pos.height_msl > fixture.3 + 3_000.0);
        assert!(pos.height_msl < fixture.3 + 5_000.0);
    }
}

#[test]
fn test_high_latitude_wedges_are_narrow_in_longitude() {
    let ktlx = Georeferencer::new(&site(sites::KTLX)).unwrap();
    let pahg = Georeferencer::new(&site(sites::PAHG)).unwrap();
    let span = |g: &Georeferencer| {
        let a = g.locate(89.5, 100_000.0, 0.5);
        let b = g.locate(90.5, 100_000.0, 0.5);
        (b.lat - a.lat).abs()
    };
    // Same angular wedge, same ground width: latitude spread is about equal.
    assert_approx_eq!(span(&ktlx), span(&pahg), 1e-3);

    let reach = |g: &Georeferencer| g.locate(90.0, 100_000.0, 0.5).lon - g.origin().lon;
    assert!(reach(&pahg) > reach(&ktlx) * 1.5);
}
