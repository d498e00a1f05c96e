/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

extern crate indicatif;

use super::results::RunSummary;
use super::{Pcg64Mcg, SourceGenerator};
use crate::atomic::AtomicData;
use crate::cosmic::{Ephemeris, EphemerisProvider, FixedGeometryProvider, KeplerianProvider};
use crate::dynamics::{AccelModel, Dynamics, LossModel, PacketDynamics, PhysicalLoss, PointMasses, SolarPressure};
use crate::errors::{AtomicDataSnafu, DynamicsSnafu, EphemerisSnafu, PropagationSnafu, StoreSnafu};
use crate::io::{ConfigSnafu, IterationRecord, RunInputs, Store};
use crate::propagators::{IntegrationDetails, PropOpts, Propagator, ResolutionScaled};
use crate::state::PacketBatch;
use crate::time::Epoch;
use crate::ExosphereError;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use snafu::{ensure, ResultExt};
use std::fmt;
use std::sync::Arc;
use std::time::Instant as StdInstant;

/// Largest departure from one of the total weight of a packet before it is reported.
const CONSERVATION_TOLERANCE: f64 = 1e-9;

/// Epoch of the analytic ephemerides: time-free geometries are built around it, dated runs propagate the catalogue
/// elements from it.
fn reference_epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2000, 1, 1)
}

/// A Monte Carlo simulation of an exosphere: every iteration draws packets from the source, propagates them until
/// the end of the run and commits them to a store.
pub struct Simulation {
    pub inputs: RunInputs,
    pub ephemeris: Arc<Ephemeris>,
    pub generator: SourceGenerator,
    pub dynamics: PacketDynamics,
    pub opts: PropOpts<ResolutionScaled>,
    /// Show a progress bar over the iterations
    pub progress: bool,
}

impl Simulation {
    /// Sets up a run on the analytic ephemerides: the stationary geometry of the inputs when they are time-free,
    /// the Keplerian ephemeris of the body catalogue otherwise.
    pub fn new(inputs: RunInputs, atomic: &AtomicData) -> Result<Self, ExosphereError> {
        inputs.validate()?;
        let geometry = &inputs.geometry;
        match (geometry.epoch()?, geometry.taa_rad()) {
            (Some(epoch), _) => {
                let provider = KeplerianProvider::new(reference_epoch());
                Self::build(inputs, atomic, &provider, epoch)
            }
            (None, Some(taa)) => {
                let provider = FixedGeometryProvider::new(
                    geometry.central()?,
                    taa,
                    &geometry.phases_rad(),
                    geometry.subsolar_point_rad()?,
                    reference_epoch(),
                )
                .context(EphemerisSnafu {
                    action: "building the time-free geometry",
                })?;
                Self::build(inputs, atomic, &provider, reference_epoch())
            }
            (None, None) => Err(ConfigSnafu {
                key: "modeltime",
                reason: "either modeltime or taa is required",
            }
            .build()
            .into()),
        }
    }

    /// Sets up a dated run on the ephemerides of `provider`, typically SPICE kernels loaded in an almanac.
    pub fn with_provider(
        inputs: RunInputs,
        atomic: &AtomicData,
        provider: &dyn EphemerisProvider,
    ) -> Result<Self, ExosphereError> {
        inputs.validate()?;
        let epoch = inputs.geometry.epoch()?.ok_or_else(|| {
            ExosphereError::from(
                ConfigSnafu {
                    key: "modeltime",
                    reason: format!("{provider} needs a dated geometry"),
                }
                .build(),
            )
        })?;
        Self::build(inputs, atomic, provider, epoch)
    }

    fn build(
        inputs: RunInputs,
        atomic: &AtomicData,
        provider: &dyn EphemerisProvider,
        end_epoch: Epoch,
    ) -> Result<Self, ExosphereError> {
        let options = &inputs.options;
        ensure!(
            atomic.species.eq_ignore_ascii_case(options.species.trim()),
            ConfigSnafu {
                key: "species",
                reason: format!("the atomic data is for {}, not {}", atomic.species, options.species)
            }
        );
        let geometry = &inputs.geometry;
        let central = geometry.central()?;
        let startpoint = geometry.startpoint_body()?;

        let ephemeris = Arc::new(
            Ephemeris::build(
                provider,
                central,
                &geometry.included_bodies()?,
                end_epoch,
                options.runtime,
                options.ephemeris_samples,
            )
            .context(EphemerisSnafu {
                action: "sampling the tracks of the run",
            })?,
        );

        let mut accel_models: Vec<Arc<dyn AccelModel>> = Vec::new();
        if inputs.forces.gravity {
            accel_models.push(PointMasses::new(ephemeris.clone()));
        }
        if inputs.forces.radpres {
            let gvalues = atomic.require_gvalues().context(AtomicDataSnafu {
                action: "setting up radiation pressure",
            })?;
            accel_models.push(
                SolarPressure::new(ephemeris.clone(), gvalues, startpoint.name).context(DynamicsSnafu {
                    action: "setting up radiation pressure",
                })?,
            );
        }

        let loss_inputs = &inputs.loss;
        let loss = match loss_inputs.constant_lifetime {
            Some(lifetime) => LossModel::constant_lifetime(lifetime).context(DynamicsSnafu {
                action: "setting up the loss",
            })?,
            None if loss_inputs.is_lossless() => LossModel::None,
            None => LossModel::Physical(Box::new(
                PhysicalLoss::new(
                    ephemeris.clone(),
                    atomic,
                    inputs.plasma.clone(),
                    loss_inputs.photo_lifetime,
                    loss_inputs.photo_factor,
                    loss_inputs.eimp_factor,
                    loss_inputs.chx_factor,
                )
                .context(DynamicsSnafu {
                    action: "setting up the loss",
                })?,
            )),
        };

        let dynamics = PacketDynamics::new(
            ephemeris.clone(),
            accel_models,
            loss,
            inputs.surface.interaction()?,
            options.outer_edge,
            options.edge_origin.as_deref().unwrap_or(central.name),
        )
        .context(DynamicsSnafu {
            action: "setting up the packet dynamics",
        })?;

        let generator = SourceGenerator {
            startpoint,
            spatial: inputs.spatial.distribution()?,
            speed: inputs.speed.distribution(&options.species)?,
            angular: inputs.angular.distribution()?,
            runtime_s: options.runtime,
            start_together: options.start_together,
        };
        let opts = PropOpts::from_run(options.step_size, options.resolution);

        info!("{dynamics}");
        info!("source: {:?}, speeds {}, {:?}", generator.spatial, generator.speed, generator.angular);
        info!("integration: {}", opts.info());

        Ok(Self {
            inputs,
            ephemeris,
            generator,
            dynamics,
            opts,
            progress: true,
        })
    }

    /// Random number generator of an iteration: seeded with `random_seed + iteration` when a seed is given.
    pub fn rng(&self, iteration: u32) -> Pcg64Mcg {
        match self.inputs.options.random_seed {
            Some(seed) => Pcg64Mcg::new(seed.wrapping_add(u64::from(iteration)).into()),
            None => Pcg64Mcg::from_entropy(),
        }
    }

    pub fn hit_bodies(&self) -> Vec<String> {
        self.dynamics.hit_bodies()
    }

    /// Draws and propagates the packets of one iteration, numbering them from `first_packet`.
    ///
    /// The packets are propagated in sequential batches of at most `max_batch` packets.
    pub fn run_iteration(
        &self,
        iteration: u32,
        first_packet: u64,
    ) -> Result<(IterationRecord, IntegrationDetails), ExosphereError> {
        let options = &self.inputs.options;
        let n_packets = options.n_packets;
        let batch_size = options.max_batch.unwrap_or(n_packets).clamp(1, n_packets.max(1));
        let hit_bodies = self.hit_bodies();
        let mut rng = self.rng(iteration);

        let prop = Propagator::dp45(self.dynamics.clone(), self.opts);
        let mut record = IterationRecord {
            iteration,
            initial_state: PacketBatch::new(hit_bodies.clone()),
            final_state: PacketBatch::new(hit_bodies.clone()),
            trajectory: self.opts.fixed_step().then(|| PacketBatch::new(hit_bodies.clone())),
            ..Default::default()
        };
        let mut details = IntegrationDetails {
            min_step: f64::INFINITY,
            ..Default::default()
        };

        let mut start = 0;
        while start < n_packets {
            let count = batch_size.min(n_packets - start);
            let (points, initial) = self
                .generator
                .generate(
                    count,
                    &mut rng,
                    iteration,
                    first_packet + start as u64,
                    &self.ephemeris,
                    hit_bodies.clone(),
                )
                .context(EphemerisSnafu {
                    action: "placing the packets",
                })?;

            let mut instance = prop.with(initial.clone());
            let batch_details = instance.until_end().context(PropagationSnafu { iteration })?;
            details.merge(&batch_details);

            if let Some((i, err)) = instance.batch.check_conservation(CONSERVATION_TOLERANCE) {
                warn!(
                    "weight of packet #{} is off by {err:e} at the end of iteration {iteration}",
                    instance.batch.packet_number[i]
                );
            }

            record.starting_points.extend(&points);
            record.initial_state.extend(&initial);
            record.final_state.extend(&instance.batch);
            if let Some(trajectory) = record.trajectory.as_mut() {
                trajectory.extend(&instance.trajectory);
            }
            start += count;
        }
        Ok((record, details))
    }

    fn progress_bar(&self, iterations: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(iterations as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>4}/{len:4} {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_message(format!("{self}"));
        pb
    }

    /// Runs the iterations this run is missing in `store`, resuming after the last committed one.
    ///
    /// Returns the summary of the iterations run by this call.
    pub fn run<S: Store + ?Sized>(&self, store: &mut S) -> Result<RunSummary, ExosphereError> {
        let state = store.resume(&self.inputs).context(StoreSnafu {
            action: "looking up the run",
        })?;
        let target = self.inputs.options.n_iterations as usize;
        let remaining = target.saturating_sub(state.completed());
        let mut summary = RunSummary::new(state.run);
        if remaining == 0 {
            info!(
                "run #{} already has {} of {target} iterations",
                state.run,
                state.completed()
            );
            return Ok(summary);
        }

        let pb = self.progress_bar(remaining);
        let start = StdInstant::now();
        let mut packets = state.packets;
        for k in 0..remaining {
            let iteration = state.next_iteration() + k as u32;
            let (record, details) = self.run_iteration(iteration, packets)?;
            store.append(&self.inputs, state.run, &record).context(StoreSnafu {
                action: "committing an iteration",
            })?;
            packets += record.len() as u64;

            let totals = record.final_state.totals();
            info!("run #{} iteration {iteration}: {totals}", state.run);
            debug!("{details}");
            summary.push(iteration, totals, Some(details));
            pb.inc(1);
        }
        pb.finish_and_clear();
        info!(
            "run #{}: {remaining} iterations of {} packets in {:.3} s",
            state.run,
            self.inputs.options.n_packets,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

impl fmt::Display for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} around {}",
            self.inputs.options.species, self.generator.startpoint, self.ephemeris.central
        )?;
        if let Some(seed) = self.inputs.options.random_seed {
            write!(f, " (seed {seed})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_montecarlo {
    use super::*;
    use crate::io::{ConfigRepr, MemoryStore};

    fn inputs() -> RunInputs {
        RunInputs::loads(
            r#"
geometry: {central_body: Mercury, taa: 0.0}
forces: {gravity: true, radpres: false}
spatial: {type: uniform}
speed: {type: flat, vmin: 1.0, vmax: 2.0}
angular: {type: isotropic}
loss: {constant_lifetime: 3600.0}
options:
  runtime: 600.0
  species: Na
  n_packets: 5
  n_iterations: 2
  max_batch: 2
  random_seed: 7
  resolution: 1.0e-6
"#,
        )
        .unwrap()
    }

    #[test]
    fn iterations_and_resume() {
        let atomic = AtomicData::new("Na").unwrap();
        let mut sim = Simulation::new(inputs(), &atomic).unwrap();
        sim.progress = false;
        assert_eq!(sim.hit_bodies(), vec!["Mercury".to_string()]);

        let mut store = MemoryStore::new();
        let summary = sim.run(&mut store).unwrap();
        assert_eq!(summary.iterations.len(), 2);
        assert_eq!(summary.packets(), 10);

        let finals = store.final_states(0).unwrap();
        assert_eq!(finals.len(), 10);
        assert_eq!(finals.packet_number, (0..10).collect::<Vec<u64>>());
        assert!(finals.check_conservation(1e-9).is_none());
        assert!((0..finals.len()).all(|i| finals.time[i] == 0.0 || finals.frac[i] == 0.0));

        // Nothing left to do, then two more iterations
        assert!(sim.run(&mut store).unwrap().iterations.is_empty());
        sim.inputs.options.n_iterations = 4;
        let summary = sim.run(&mut store).unwrap();
        assert_eq!(
            summary.iterations.iter().map(|it| it.iteration).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(store.state(0).unwrap().packets, 20);
    }

    #[test]
    fn seeded_iterations_are_reproducible() {
        let atomic = AtomicData::new("Na").unwrap();
        let sim = Simulation::new(inputs(), &atomic).unwrap();
        let (first, _) = sim.run_iteration(3, 0).unwrap();
        let (again, _) = sim.run_iteration(3, 0).unwrap();
        assert_eq!(first, again);
        let (other, _) = sim.run_iteration(4, 0).unwrap();
        assert_ne!(first.starting_points, other.starting_points);
    }

    #[test]
    fn radiation_pressure_needs_gvalues() {
        let atomic = AtomicData::new("Na").unwrap();
        let mut inputs = inputs();
        inputs.forces.radpres = true;
        assert!(matches!(
            Simulation::new(inputs, &atomic),
            Err(ExosphereError::AtomicData { .. })
        ));

        let mut inputs = self::inputs();
        inputs.options.species = "K".to_string();
        assert!(matches!(Simulation::new(inputs, &atomic), Err(ExosphereError::Input { .. })));
    }
}
