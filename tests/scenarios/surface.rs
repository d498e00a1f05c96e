use crate::{init_logger, mercury_run, point_source, run_once, sodium};
use exo::io::{ForcesInputs, LossInputs, SpatialInputs, SpeedInputs, SurfaceInputs};
use rstest::rstest;

const MERCURY_RADIUS_KM: f64 = 2439.7;

/// A packet at rest two radii from the centre of Mercury only ionises when it sees the Sun.
#[rstest]
#[case::night(180.0, true)]
#[case::day(0.0, false)]
fn shadow_gating(#[case] longitude: f64, #[case] shadowed: bool) {
    init_logger();
    let mut inputs = mercury_run(3600.0);
    inputs.forces = ForcesInputs {
        gravity: false,
        radpres: false,
    };
    inputs.spatial = point_source(2.0, longitude, 0.0);
    inputs.speed = SpeedInputs::Flat { vmin: 0.0, vmax: 0.0 };
    inputs.loss = LossInputs::default();

    let atomic = sodium().with_photo_rate(1e-5);
    let record = run_once(inputs, &atomic);
    let (start, end) = (record.initial_state.get(0), record.final_state.get(0));
    assert!((start.x.x.abs() - 2.0).abs() < 1e-12);
    assert_eq!(start.x.x < 0.0, shadowed);
    assert_eq!(end.time, 0.0);
    if shadowed {
        assert_eq!(end.frac, 1.0);
        assert_eq!(end.ionized, 0.0);
    } else {
        assert!(end.frac < 0.9, "frac = {}", end.frac);
        assert!(end.ionized > 0.1);
    }
}

#[test]
fn surface_sticking() {
    init_logger();
    let mut inputs = mercury_run(3600.0);
    inputs.spatial = SpatialInputs::uniform(1.0);
    inputs.options.n_packets = 20;

    let record = run_once(inputs, &sodium());
    assert_eq!(record.len(), 20);
    let end = &record.final_state;
    assert_eq!(end.hit_bodies, vec!["Mercury".to_string()]);
    for i in 0..end.len() {
        let packet = end.get(i);
        assert_eq!(packet.hit, vec![1.0]);
        assert_eq!(packet.frac, 0.0);
        assert_eq!(packet.escaped, 0.0);
        let miss_km = (packet.x.norm() - 1.0).abs() * MERCURY_RADIUS_KM;
        assert!(miss_km < 1e-3, "packet {i} ended {miss_km} km off the surface");
        // Every packet fell back well before the end of the run
        assert!(packet.time < -600.0);
    }
    assert_eq!(end.totals().hit, vec![("Mercury".to_string(), 20.0)]);
}

#[test]
fn partial_sticking() {
    init_logger();
    let mut inputs = mercury_run(3600.0);
    inputs.spatial = SpatialInputs::uniform(1.0);
    inputs.surface = SurfaceInputs::Constant {
        stickcoef: 0.5,
        accomfactor: Some(0.0),
    };
    inputs.options.n_packets = 10;

    let record = run_once(inputs, &sodium());
    let end = &record.final_state;
    for i in 0..end.len() {
        let packet = end.get(i);
        // Half of the weight stays at the first impact, the rest bounces
        assert!(packet.hit[0] >= 0.5 - 1e-12, "{packet:?}");
        assert!(packet.frac <= 0.5 + 1e-12);
        assert_eq!(packet.ionized, 0.0);
    }
}
