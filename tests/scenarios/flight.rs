use crate::{init_logger, mercury_run, run_once, sodium};
use approx::assert_relative_eq;
use exo::io::{AngularInputs, ForcesInputs, LossInputs, SpeedInputs};
use exo::linalg::Vector3;
use exo::Simulation;
use rstest::rstest;
use std::f64::consts::PI;

const MERCURY_RADIUS_KM: f64 = 2439.7;
const MERCURY_GM: f64 = 22031.86855;

/// Straight flight away from the surface with a constant lifetime, in both integration modes.
#[rstest]
#[case::adaptive(0.0)]
#[case::fixed_step(10.0)]
fn free_flight_constant_rate(#[case] step_size: f64) {
    init_logger();
    let mut inputs = mercury_run(100.0);
    inputs.forces = ForcesInputs {
        gravity: false,
        radpres: false,
    };
    inputs.loss = LossInputs::constant(1000.0);
    inputs.options.step_size = step_size;

    let record = run_once(inputs, &sodium());
    let end = record.final_state.get(0);
    assert_relative_eq!(end.time, 0.0, epsilon = 1e-9);
    assert_relative_eq!(
        end.x,
        Vector3::new(1.0 + 200.0 / MERCURY_RADIUS_KM, 0.0, 0.0),
        epsilon = 1e-9
    );
    assert_relative_eq!(end.frac, (-0.1_f64).exp(), max_relative = 1e-7);
    assert_relative_eq!(end.ionized, 1.0 - (-0.1_f64).exp(), max_relative = 1e-6);
    assert_eq!(end.hit, vec![0.0]);

    if step_size > 0.0 {
        let trajectory = record.trajectory.unwrap();
        assert!(trajectory.len() >= 10, "{} snapshots", trajectory.len());
        // Snapshots only ever lose weight
        let mut fracs: Vec<(f64, f64)> = (0..trajectory.len())
            .map(|i| (trajectory.time[i], trajectory.frac[i]))
            .collect();
        fracs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for pair in fracs.windows(2) {
            assert!(pair[1].1 <= pair[0].1 + 1e-15);
        }
    } else {
        assert!(record.trajectory.is_none());
    }
}

/// One full orbit grazing the surface at periapsis.
#[test]
fn keplerian_orbit() {
    init_logger();
    let speed = 3.2;
    let r = MERCURY_RADIUS_KM;
    let sma = 1.0 / (2.0 / r - speed * speed / MERCURY_GM);
    let period = 2.0 * PI * (sma.powi(3) / MERCURY_GM).sqrt();

    let mut inputs = mercury_run(period);
    inputs.speed = SpeedInputs::Flat {
        vmin: speed,
        vmax: speed,
    };
    inputs.angular = AngularInputs::Isotropic {
        azimuth: "90,90".to_string(),
        altitude: "0,0".to_string(),
    };
    inputs.options.resolution = 1e-11;

    let atomic = sodium();
    let sim = Simulation::new(inputs.clone(), &atomic).unwrap();
    let gm = sim.ephemeris.central_track().gm;
    let energy = |x: &Vector3<f64>, v: &Vector3<f64>| 0.5 * v.norm_squared() - gm / x.norm();

    let record = run_once(inputs, &atomic);
    let (start, end) = (record.initial_state.get(0), record.final_state.get(0));
    assert_relative_eq!(start.v.norm() * r, speed, max_relative = 1e-12);
    assert!(start.x.dot(&start.v).abs() < 1e-12);

    let e0 = energy(&start.x, &start.v);
    let e1 = energy(&end.x, &end.v);
    assert!(((e1 - e0) / e0).abs() < 1e-5, "energy drift {:e}", (e1 - e0) / e0);
    assert!((end.x - start.x).norm() < 1e-3, "missed the start by {} km", (end.x - start.x).norm() * r);
}

#[test]
fn escape() {
    init_logger();
    let mut inputs = mercury_run(3600.0);
    inputs.speed = SpeedInputs::Flat {
        vmin: 10.0,
        vmax: 10.0,
    };
    inputs.options.outer_edge = 5.0;

    let record = run_once(inputs, &sodium());
    let end = record.final_state.get(0);
    assert_eq!(end.escaped, 1.0);
    assert_eq!(end.frac, 0.0);
    assert_eq!(end.hit, vec![0.0]);
    assert!(end.x.norm() >= 5.0, "escaped at {} R", end.x.norm());
    // Stopped when crossing the edge, well before the end of the run
    assert!(end.time < -1000.0);
}
