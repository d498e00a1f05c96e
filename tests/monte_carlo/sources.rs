use crate::{erf, init_logger, ks_statistic, mercury_run, sodium};
use exo::io::{AngularInputs, SpatialInputs, SpeedInputs};
use exo::mc::{AngularDistribution, Pcg64Mcg, SpatialDistribution, SpeedDistribution, SurfaceRegion};
use exo::cosmic::SourceFrame;
use exo::units::{binding_speed_km_s, thermal_speed_km_s};
use exo::Simulation;
use rstest::rstest;
use std::f64::consts::{FRAC_PI_2, TAU};

const N_SAMPLES: usize = 200_000;
const KS_LIMIT: f64 = 5e-3;
const SODIUM_AMU: f64 = 22.98977;

/// Speed law under test and its analytic cumulative distribution.
fn speed_law(name: &str) -> (SpeedDistribution, Box<dyn Fn(f64) -> f64>) {
    match name {
        "flat" => (
            SpeedDistribution::flat(1.0, 3.0),
            Box::new(|v: f64| ((v - 1.0) / 2.0).clamp(0.0, 1.0)),
        ),
        "maxwellian" => {
            let vth = thermal_speed_km_s(1500.0, SODIUM_AMU);
            let g = |x: f64| 1.0 - (1.0 + x * x) * (-x * x).exp();
            (
                SpeedDistribution::maxwellian(1500.0, SODIUM_AMU).unwrap(),
                Box::new(move |v: f64| g(v / vth) / g(3.0)),
            )
        }
        "sputtering" => {
            let vb = binding_speed_km_s(0.27, SODIUM_AMU);
            let h = |x: f64| (x * x / (1.0 + x * x)).powi(2);
            (
                SpeedDistribution::sputtering(3.0, 1.0, 0.27, SODIUM_AMU).unwrap(),
                Box::new(move |v: f64| h(v / vb) / h(4.0)),
            )
        }
        "gaussian" => {
            let (mu, sigma) = (2.0, 1.0);
            let phi = move |v: f64| 0.5 * (1.0 + erf((v - mu) / (sigma * 2.0_f64.sqrt())));
            (
                SpeedDistribution::gaussian(mu, sigma),
                Box::new(move |v: f64| (phi(v) - phi(0.0)) / (1.0 - phi(0.0))),
            )
        }
        _ => unreachable!("unknown speed law {name}"),
    }
}

#[rstest]
#[case("flat")]
#[case("maxwellian")]
#[case("sputtering")]
#[case("gaussian")]
fn speed_statistics(#[case] name: &str) {
    init_logger();
    let (dist, cdf) = speed_law(name);
    let mut rng = Pcg64Mcg::new(1234);
    let speeds = dist.choose_points(N_SAMPLES, &mut rng);

    let (lo, hi) = dist.support();
    assert!(speeds.iter().all(|v| (lo..=hi).contains(v)), "{name} left its support");
    let d = ks_statistic(&speeds, cdf);
    println!("{name}: D = {d:e}");
    assert!(d < KS_LIMIT, "{name}: D = {d:e}");
}

#[test]
fn isotropic_statistics() {
    init_logger();
    let mut rng = Pcg64Mcg::new(99);
    let (altitudes, azimuths): (Vec<f64>, Vec<f64>) = AngularDistribution::hemisphere()
        .choose_points(N_SAMPLES, &mut rng)
        .into_iter()
        .unzip();

    let d_alt = ks_statistic(&altitudes, |alt| alt.sin());
    let d_az = ks_statistic(&azimuths, |az| az / TAU);
    assert!(d_alt < KS_LIMIT, "altitude: D = {d_alt:e}");
    assert!(d_az < KS_LIMIT, "azimuth: D = {d_az:e}");
}

#[test]
fn uniform_surface_statistics() {
    init_logger();
    let mut rng = Pcg64Mcg::new(7);
    let region = SurfaceRegion::sphere(1.0, SourceFrame::SolarFixed);
    let (longitudes, latitudes): (Vec<f64>, Vec<f64>) = SpatialDistribution::Uniform(region)
        .choose_points(N_SAMPLES, &mut rng)
        .into_iter()
        .unzip();

    let d_lat = ks_statistic(&latitudes, |lat| (lat.sin() + 1.0) / 2.0);
    let d_lon = ks_statistic(&longitudes, |lon| lon / TAU);
    assert!(d_lat < KS_LIMIT, "latitude: D = {d_lat:e}");
    assert!(d_lon < KS_LIMIT, "longitude: D = {d_lon:e}");
}

/// The starting points of a run stay within the regions of its inputs, wrapped longitudes included.
#[test]
fn supports_are_respected() {
    init_logger();
    let mut inputs = mercury_run(600.0);
    inputs.spatial = SpatialInputs::Uniform {
        exobase: 1.2,
        longitude: "300,60".to_string(),
        latitude: "-30,45".to_string(),
        frame: SourceFrame::SolarFixed,
    };
    inputs.speed = SpeedInputs::Sputtering {
        alpha: 3.0,
        beta: 1.0,
        u: 0.27,
    };
    inputs.angular = AngularInputs::Isotropic {
        azimuth: "10,200".to_string(),
        altitude: "20,70".to_string(),
    };
    let sim = Simulation::new(inputs, &sodium()).unwrap();

    let mut rng = sim.rng(0);
    let (points, batch) = sim
        .generator
        .generate(5_000, &mut rng, 0, 0, &sim.ephemeris, sim.hit_bodies())
        .unwrap();
    assert_eq!(points.len(), 5_000);
    assert_eq!(batch.len(), 5_000);

    let region = sim.generator.spatial.region();
    let (vmin, vmax) = sim.generator.speed.support();
    let eps = 1e-12;
    for i in 0..points.len() {
        assert!(region.contains(points.longitude[i], points.latitude[i], eps));
        assert!((vmin..=vmax).contains(&points.speed_km_s[i]));
        assert!(points.altitude[i] >= 20_f64.to_radians() - eps && points.altitude[i] <= 70_f64.to_radians() + eps);
        assert!(points.azimuth[i] >= 10_f64.to_radians() - eps && points.azimuth[i] <= 200_f64.to_radians() + eps);
        assert!((batch.x[i].norm() - 1.2).abs() < 1e-12);
        assert!((0.0..=24.0).contains(&points.local_time[i]));
    }
    // Both sides of the wrapped longitudes are populated
    assert!(points.longitude.iter().any(|lon| *lon > 300_f64.to_radians()));
    assert!(points.longitude.iter().any(|lon| *lon < 60_f64.to_radians()));
}

#[test]
fn radial_emission() {
    init_logger();
    let mut inputs = mercury_run(600.0);
    inputs.spatial = SpatialInputs::uniform(1.5);
    inputs.speed = SpeedInputs::Maxwellian { temperature: 1200.0 };
    let sim = Simulation::new(inputs, &sodium()).unwrap();

    let mut rng = sim.rng(3);
    let (points, batch) = sim
        .generator
        .generate(1_000, &mut rng, 3, 500, &sim.ephemeris, sim.hit_bodies())
        .unwrap();
    assert_eq!(points.packet_number.first(), Some(&500));
    assert_eq!(points.packet_number.last(), Some(&1499));
    for i in 0..batch.len() {
        let (x, v) = (batch.x[i], batch.v[i]);
        let cosine = x.dot(&v) / (x.norm() * v.norm());
        assert!((cosine - 1.0).abs() < 1e-12, "packet {i}: cos = {cosine}");
        assert_eq!(points.altitude[i], FRAC_PI_2);
        assert_eq!(batch.frac[i], 1.0);
        assert_eq!(batch.iteration[i], 3);
    }
}
