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

use super::error_ctrl::ErrorCtrl;
use super::{
    DynamicsSnafu, IntegrationDetails, NonFiniteSnafu, PropagationError, Propagator, StepUnderflowSnafu,
};
use crate::dynamics::{Dynamics, DynamicsError};
use crate::state::PacketBatch;
use crate::PacketVector;
use snafu::{ensure, ResultExt};

/// A Propagator allows propagating a batch of packets until the end of the run.
///
/// Each packet carries its own time and step size: the live packets of the batch are all stepped together, but
/// accepted and rejected independently.
#[derive(Debug)]
pub struct PropInstance<'a, D: Dynamics, E: ErrorCtrl> {
    /// The packets being propagated
    pub batch: PacketBatch,
    /// The propagator setup (kind, stages, etc.)
    pub prop: &'a Propagator<'a, D, E>,
    /// Stores the statistics of the propagation
    pub details: IntegrationDetails,
    /// Next step size of each packet, in seconds
    pub step_sizes: Vec<f64>,
    /// Snapshots of the stepped packets after each fixed step
    pub trajectory: PacketBatch,
    pub(crate) k: Vec<Vec<PacketVector>>,
}

impl<'a, D: Dynamics, E: ErrorCtrl> PropInstance<'a, D, E> {
    /// Maps a dynamics error on the `live` packets to a propagation error naming the packet.
    fn dynamics_error(&self, live: &[usize], err: DynamicsError) -> PropagationError {
        match err {
            DynamicsError::NonFinite { index, quantity } => PropagationError::NonFinite {
                packet: self.batch.packet_number[live[index]],
                quantity,
            },
            source => PropagationError::Dynamics { source },
        }
    }

    /// Computes one Runge Kutta step of length `steps[j]` for every packet `live[j]`.
    ///
    /// Returns the candidate states and, unless `fixed_step`, the embedded error estimates.
    fn derive(
        &mut self,
        live: &[usize],
        steps: &[f64],
        fixed_step: bool,
    ) -> Result<(Vec<PacketVector>, Vec<PacketVector>), PropagationError> {
        let stages = self.prop.stages();
        let t0: Vec<f64> = live.iter().map(|&i| self.batch.time[i]).collect();
        let y0: Vec<PacketVector> = live.iter().map(|&i| self.batch.as_vector(i)).collect();

        self.k[0] = match self.prop.dynamics.eom(&t0, &y0) {
            Ok(k0) => k0,
            Err(e) => return Err(self.dynamics_error(live, e)),
        };

        let mut a_idx: usize = 0;
        for i in 0..(stages - 1) {
            // c_i = \sum_{j=1}^{i-1} a_ij and wi = a_{i1} k_1 + ... + a_{i,i-1} k_{i-1}
            let mut ci: f64 = 0.0;
            let mut wi = vec![PacketVector::zeros(); live.len()];
            for kj in &self.k[0..i + 1] {
                let a_ij = self.prop.a_coeffs()[a_idx];
                ci += a_ij;
                for (w, k) in wi.iter_mut().zip(kj) {
                    *w += a_ij * k;
                }
                a_idx += 1;
            }

            let ti: Vec<f64> = t0.iter().zip(steps).map(|(t, h)| t + ci * h).collect();
            let yi: Vec<PacketVector> = y0
                .iter()
                .zip(&wi)
                .zip(steps)
                .map(|((y, w), h)| y + *h * w)
                .collect();
            self.k[i + 1] = match self.prop.dynamics.eom(&ti, &yi) {
                Ok(ki) => ki,
                Err(e) => return Err(self.dynamics_error(live, e)),
            };
        }

        let mut next_states = y0;
        let mut error_est = vec![PacketVector::zeros(); live.len()];
        for (i, ki) in self.k.iter().enumerate() {
            let b_i = self.prop.b_coeffs()[i];
            let b_i_star = self.prop.b_coeffs()[i + stages];
            for (j, k) in ki.iter().enumerate() {
                next_states[j] += steps[j] * b_i * k;
                if !fixed_step {
                    error_est[j] += steps[j] * (b_i - b_i_star) * k;
                }
            }
        }
        Ok((next_states, error_est))
    }

    /// Stores the accepted candidate `next` of packet `i`, which advanced by `step`, then lets the dynamics handle
    /// surfaces and escape.
    fn accept(&mut self, i: usize, next: &PacketVector, step: f64) -> Result<(), PropagationError> {
        let tol = self.prop.opts.time_tolerance;
        let frac_old = self.batch.frac[i];
        let frac_new = next[6].exp().min(frac_old);

        let time = self.batch.time[i] + step;
        self.batch.time[i] = if time >= -tol { 0.0 } else { time };
        self.batch.x[i] = next.fixed_rows::<3>(0).into_owned();
        self.batch.v[i] = next.fixed_rows::<3>(3).into_owned();
        self.batch.ionized[i] += frac_old - frac_new;
        self.batch.frac[i] = frac_new;

        self.prop
            .dynamics
            .finally(&mut self.batch, i, step)
            .context(DynamicsSnafu)?;

        self.details.accepted += 1;
        self.details.min_step = self.details.min_step.min(step);
        Ok(())
    }

    /// Propagates every packet until the end of the run, or until it has no weight left.
    pub fn until_end(&mut self) -> Result<IntegrationDetails, PropagationError> {
        if self.prop.opts.fixed_step() {
            self.until_end_fixed()?;
        } else {
            self.until_end_adaptive()?;
        }
        debug!("{} packets propagated: {}", self.batch.len(), self.details);
        Ok(self.details)
    }

    fn until_end_fixed(&mut self) -> Result<(), PropagationError> {
        let opts = self.prop.opts;
        loop {
            let live = self.batch.live_indices(opts.time_tolerance);
            if live.is_empty() {
                return Ok(());
            }
            let steps: Vec<f64> = live
                .iter()
                .map(|&i| opts.step_size.min(-self.batch.time[i]))
                .collect();
            let (next_states, _) = self.derive(&live, &steps, true)?;
            for ((&i, next), &step) in live.iter().zip(&next_states).zip(&steps) {
                ensure!(
                    next.iter().all(|y| !y.is_nan()),
                    NonFiniteSnafu {
                        packet: self.batch.packet_number[i],
                        quantity: "state"
                    }
                );
                self.accept(i, next, step)?;
            }
            let snapshot = self.batch.select(&live);
            self.trajectory.extend(&snapshot);
        }
    }

    fn until_end_adaptive(&mut self) -> Result<(), PropagationError> {
        let opts = self.prop.opts;
        loop {
            let live = self.batch.live_indices(opts.time_tolerance);
            if live.is_empty() {
                return Ok(());
            }
            // Never step beyond the end of the run
            let steps: Vec<f64> = live
                .iter()
                .map(|&i| self.step_sizes[i].min(-self.batch.time[i]))
                .collect();
            let (next_states, error_est) = self.derive(&live, &steps, false)?;

            for (j, &i) in live.iter().enumerate() {
                let step = steps[j];
                let next = &next_states[j];
                let error = E::estimate(&error_est[j], next, opts.resolution);
                ensure!(
                    error.is_finite(),
                    NonFiniteSnafu {
                        packet: self.batch.packet_number[i],
                        quantity: "error norm"
                    }
                );
                let frac_increased = E::frac_increased(next[6].exp(), self.batch.frac[i], opts.resolution);

                if error < 1.0 && !frac_increased {
                    self.accept(i, next, step)?;
                    self.details.max_error = self.details.max_error.max(error);
                    self.step_sizes[i] = if error < opts.exact_error {
                        step * opts.exact_growth
                    } else {
                        opts.safety * step * error.powf(opts.grow)
                    };
                } else {
                    self.details.rejected += 1;
                    let shrunk = if error >= 1.0 {
                        opts.safety * step * error.powf(opts.shrink)
                    } else {
                        0.5 * step
                    };
                    ensure!(
                        shrunk >= opts.min_step,
                        StepUnderflowSnafu {
                            packet: self.batch.packet_number[i],
                            step: shrunk
                        }
                    );
                    self.step_sizes[i] = shrunk;
                }
            }
        }
    }
}

#[cfg(test)]
mod ut_instance {
    use super::*;
    use crate::cosmic::{Body, Ephemeris, FixedGeometryProvider};
    use crate::dynamics::{AccelModel, LossModel, PacketDynamics, PointMasses, SurfaceInteraction};
    use crate::linalg::Vector3;
    use crate::propagators::{PropOpts, ResolutionScaled};
    use crate::state::Packet;
    use crate::time::Epoch;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn mercury_dynamics(gravity: bool, loss: LossModel) -> PacketDynamics {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let mercury = Body::from_name("Mercury").unwrap();
        let provider = FixedGeometryProvider::new(mercury, 0.0, &[], (0.0, 0.0), epoch).unwrap();
        let ephem = Arc::new(Ephemeris::build(&provider, mercury, &[], epoch, 1e6, Some(2)).unwrap());
        let accel: Vec<Arc<dyn AccelModel>> = if gravity {
            vec![PointMasses::new(ephem.clone())]
        } else {
            Vec::new()
        };
        PacketDynamics::new(ephem, accel, loss, SurfaceInteraction::default(), 100.0, "Mercury").unwrap()
    }

    #[test]
    fn free_flight_with_constant_lifetime() {
        let dynamics = mercury_dynamics(false, LossModel::constant_lifetime(1000.0).unwrap());
        let speed = dynamics.ephemeris.units.from_km_s(2.0);
        let mut batch = PacketBatch::new(dynamics.hit_bodies());
        batch.push(Packet::new(-100.0, Vector3::x(), Vector3::x() * speed, 1, 0, 0));

        for opts in [PropOpts::default(), PropOpts::with_fixed_step(7.0)] {
            let prop = Propagator::dp45(dynamics.clone(), opts);
            let mut instance = prop.with(batch.clone());
            instance.until_end().unwrap();
            let out = &instance.batch;
            assert_eq!(out.time[0], 0.0);
            assert_relative_eq!(out.x[0].x, 1.0 + 100.0 * speed, epsilon = 1e-12);
            assert_relative_eq!(out.frac[0], (-0.1f64).exp(), epsilon = 1e-9);
            assert_relative_eq!(out.ionized[0], 1.0 - (-0.1f64).exp(), epsilon = 1e-9);
            assert!(out.check_conservation(1e-12).is_none());
        }
    }

    #[test]
    fn fixed_step_snapshots() {
        let dynamics = mercury_dynamics(false, LossModel::None);
        let mut batch = PacketBatch::new(dynamics.hit_bodies());
        batch.push(Packet::new(-100.0, Vector3::x() * 2.0, Vector3::zeros(), 1, 0, 0));
        batch.push(Packet::new(-25.0, Vector3::x() * 2.0, Vector3::zeros(), 1, 0, 1));
        let prop = Propagator::dp45(dynamics, PropOpts::with_fixed_step(10.0));
        let mut instance = prop.with(batch);
        instance.until_end().unwrap();
        // 10 steps for the first packet and 3 for the second one
        assert_eq!(instance.trajectory.len(), 13);
        assert_eq!(instance.details.accepted, 13);
        assert!(instance.batch.time.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn adaptive_orbit_conserves_energy() {
        let dynamics = mercury_dynamics(true, LossModel::None);
        let gm = dynamics.ephemeris.central_track().gm;
        // Circular orbit at two radii
        let r = 2.0;
        let v = (gm / r).sqrt();
        let period = std::f64::consts::TAU * r / v;
        let mut batch = PacketBatch::new(dynamics.hit_bodies());
        batch.push(Packet::new(-period, Vector3::x() * r, Vector3::y() * v, 1, 0, 0));

        let prop = Propagator::dp45(dynamics, PropOpts::with_adaptive_step(1e-11, ResolutionScaled));
        let mut instance = prop.with(batch);
        let details = instance.until_end().unwrap();
        assert!(details.max_error < 1.0);

        let out = &instance.batch;
        let energy0 = 0.5 * v * v - gm / r;
        let energy = 0.5 * out.v[0].norm_squared() - gm / out.x[0].norm();
        assert_relative_eq!(energy, energy0, max_relative = 1e-6);
        assert_relative_eq!(out.x[0], Vector3::x() * r, epsilon = 1e-4);
        assert_eq!(out.frac[0], 1.0);
    }

    /// Circular orbit at `r` radii, starting one period before the end of the run.
    fn circular_orbit(dynamics: &PacketDynamics, r: f64, packet_number: u64) -> (PacketBatch, f64) {
        let gm = dynamics.ephemeris.central_track().gm;
        let v = (gm / r).sqrt();
        let period = std::f64::consts::TAU * r / v;
        let mut batch = PacketBatch::new(dynamics.hit_bodies());
        batch.push(Packet::new(-period, Vector3::x() * r, Vector3::y() * v, 1, 0, packet_number));
        (batch, 0.5 * v * v - gm / r)
    }

    #[test]
    fn rejected_steps_still_close_the_orbit() {
        let dynamics = mercury_dynamics(true, LossModel::None);
        let gm = dynamics.ephemeris.central_track().gm;
        // A period of about 6700 s: the initial step of 1000 s is too coarse
        let (batch, energy0) = circular_orbit(&dynamics, 1.2, 0);
        let prop = Propagator::dp45(dynamics, PropOpts::with_adaptive_step(1e-10, ResolutionScaled));
        let mut instance = prop.with(batch);
        let details = instance.until_end().unwrap();
        assert!(details.rejected > 0);
        assert!(details.min_step < 1000.0);
        assert!(details.max_error < 1.0);

        let out = &instance.batch;
        assert_eq!(out.time[0], 0.0);
        let energy = 0.5 * out.v[0].norm_squared() - gm / out.x[0].norm();
        assert_relative_eq!(energy, energy0, max_relative = 1e-6);
        assert_relative_eq!(out.x[0], Vector3::x() * 1.2, epsilon = 1e-4);
    }

    #[test]
    fn step_underflow_aborts() {
        let dynamics = mercury_dynamics(true, LossModel::None);
        let (batch, _) = circular_orbit(&dynamics, 1.2, 7);
        let opts = PropOpts::builder()
            .resolution(1e-14)
            .min_step(500.0)
            .error_ctrl(ResolutionScaled)
            .build();
        let prop = Propagator::dp45(dynamics, opts);
        let mut instance = prop.with(batch);
        assert!(matches!(
            instance.until_end(),
            Err(PropagationError::StepUnderflow { packet: 7, step }) if step < 500.0
        ));
        assert_eq!(instance.details.accepted, 0);
    }

    /// Straight line motion with a surviving fraction that grows back.
    #[derive(Clone, Debug)]
    struct Regrowth;

    impl Dynamics for Regrowth {
        fn eom(&self, _t: &[f64], y: &[PacketVector]) -> Result<Vec<PacketVector>, DynamicsError> {
            Ok(y.iter()
                .map(|yi| {
                    let mut dy = PacketVector::zeros();
                    dy.fixed_rows_mut::<3>(0).copy_from(&yi.fixed_rows::<3>(3));
                    dy[6] = 1e-3;
                    dy
                })
                .collect())
        }

        fn finally(&self, _batch: &mut PacketBatch, _i: usize, _step: f64) -> Result<(), DynamicsError> {
            Ok(())
        }

        fn hit_bodies(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn surviving_fraction_never_grows() {
        let mut packet = Packet::new(-100.0, Vector3::x(), Vector3::y() * 1e-3, 0, 0, 0);
        packet.frac = 0.5;
        packet.escaped = 0.5;
        let mut batch = PacketBatch::new(Regrowth.hit_bodies());
        batch.push(packet);

        for opts in [PropOpts::default(), PropOpts::with_fixed_step(10.0)] {
            let prop = Propagator::dp45(Regrowth, opts);
            let mut instance = prop.with(batch.clone());
            let details = instance.until_end().unwrap();
            assert!(details.accepted > 0);
            let out = &instance.batch;
            assert_eq!(out.time[0], 0.0);
            assert_relative_eq!(out.x[0], Vector3::new(1.0, 0.1, 0.0), epsilon = 1e-12);
            assert_eq!(out.frac[0], 0.5);
            assert_eq!(out.ionized[0], 0.0);
            assert!(out.check_conservation(1e-15).is_none());
        }
    }
}
