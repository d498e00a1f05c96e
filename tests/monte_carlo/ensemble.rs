use crate::{init_logger, mercury_run, scratch_dir, sodium};
use exo::io::{AngularInputs, LossInputs, MemoryStore, ParquetStore, RunInputs, SpatialInputs, SpeedInputs, Store};
use exo::mc::RunSummary;
use exo::Simulation;
use std::fs;

/// A small seeded ensemble: Maxwellian sodium leaving the whole surface isotropically.
fn ensemble(n_iterations: u32) -> RunInputs {
    let mut inputs = mercury_run(1800.0);
    inputs.spatial = SpatialInputs::uniform(1.0);
    inputs.speed = SpeedInputs::Maxwellian { temperature: 1500.0 };
    inputs.angular = AngularInputs::Isotropic {
        azimuth: "0,360".to_string(),
        altitude: "0,90".to_string(),
    };
    inputs.loss = LossInputs::constant(3600.0);
    inputs.options.start_together = false;
    inputs.options.random_seed = Some(42);
    inputs.options.resolution = 1e-8;
    inputs.options.n_packets = 40;
    inputs.options.max_batch = Some(15);
    inputs.options.n_iterations = n_iterations;
    inputs
}

fn simulation(inputs: RunInputs) -> Simulation {
    let mut sim = Simulation::new(inputs, &sodium()).unwrap();
    sim.progress = false;
    sim
}

#[test]
fn seeded_runs_are_reproducible() {
    init_logger();
    let dirs = [scratch_dir("repro-a"), scratch_dir("repro-b")];
    let mut stores: Vec<ParquetStore> = dirs.iter().map(|dir| ParquetStore::open(dir).unwrap()).collect();

    for store in stores.iter_mut() {
        let summary = simulation(ensemble(2)).run(store).unwrap();
        assert_eq!(summary.run, 0);
        assert_eq!(summary.packets(), 80);
    }

    let (a, b) = (&stores[0], &stores[1]);
    let points = a.starting_points(0).unwrap();
    assert_eq!(points.len(), 80);
    assert_eq!(points, b.starting_points(0).unwrap());

    let finals = a.final_states(0).unwrap();
    assert_eq!(finals.len(), 80);
    assert_eq!(finals, b.final_states(0).unwrap());
    assert_eq!(finals.check_conservation(1e-9), None);
    assert_eq!(finals.packet_number, (0..80).collect::<Vec<u64>>());

    // Another seed gives another ensemble
    let mut inputs = ensemble(1);
    inputs.options.random_seed = Some(43);
    let mut other = MemoryStore::new();
    simulation(inputs).run(&mut other).unwrap();
    assert_ne!(other.starting_points(0).unwrap().longitude, points.longitude[..40].to_vec());

    for dir in dirs {
        fs::remove_dir_all(dir).unwrap();
    }
}

/// Stopping after one iteration then asking for three gives the same ensemble as asking for three at once.
#[test]
fn resumed_runs_match_uninterrupted_ones() {
    init_logger();
    let dir = scratch_dir("resume");
    {
        let mut store = ParquetStore::open(&dir).unwrap();
        let summary = simulation(ensemble(1)).run(&mut store).unwrap();
        assert_eq!(summary.iterations.len(), 1);
    }

    let mut store = ParquetStore::open(&dir).unwrap();
    let summary = simulation(ensemble(3)).run(&mut store).unwrap();
    assert_eq!(summary.run, 0);
    let resumed: Vec<u32> = summary.iterations.iter().map(|it| it.iteration).collect();
    assert_eq!(resumed, vec![1, 2]);
    assert_eq!(store.state(0).unwrap().iterations, vec![0, 1, 2]);
    assert_eq!(store.state(0).unwrap().packets, 120);

    // Nothing left to do
    let summary = simulation(ensemble(3)).run(&mut store).unwrap();
    assert!(summary.iterations.is_empty());

    let mut memory = MemoryStore::new();
    simulation(ensemble(3)).run(&mut memory).unwrap();
    assert_eq!(memory.final_states(0).unwrap(), store.final_states(0).unwrap());

    // The whole run can be summarised back from the files
    let from_disk = RunSummary::from_store(&store, 0).unwrap();
    assert_eq!(from_disk.packets(), 120);
    let fractions = from_disk.fractions();
    let total = fractions.frac + fractions.escaped + fractions.ionized + fractions.hit.iter().map(|(_, h)| h).sum::<f64>();
    assert!((total - 1.0).abs() < 1e-9);

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn different_inputs_start_new_runs() {
    init_logger();
    let mut store = MemoryStore::new();
    simulation(ensemble(1)).run(&mut store).unwrap();

    let mut longer = ensemble(1);
    longer.options.runtime = 3600.0;
    let summary = simulation(longer.clone()).run(&mut store).unwrap();
    assert_eq!(summary.run, 1);

    // Run sizes are not part of the identity of a run
    let mut bigger = longer;
    bigger.options.n_iterations = 2;
    bigger.options.max_batch = None;
    let summary = simulation(bigger).run(&mut store).unwrap();
    assert_eq!(summary.run, 1);
    assert_eq!(summary.iterations.len(), 1);
    assert_eq!(summary.iterations[0].iteration, 1);
    assert_eq!(store.index().runs().len(), 2);
}
