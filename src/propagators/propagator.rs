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

use super::error_ctrl::{ErrorCtrl, ResolutionScaled};
use super::{Dormand45, IntegrationDetails, PropInstance, PropOpts, RK};
use crate::dynamics::Dynamics;
use crate::state::PacketBatch;
use crate::PacketVector;

/// A Propagator advances a batch of packets until the end of the run. It includes the options and the set of
/// coefficients used for the monomorphic instance.
#[derive(Clone, Debug)]
pub struct Propagator<'a, D: Dynamics, E: ErrorCtrl> {
    pub dynamics: D, // Stores the dynamics used. *Must* use this to get the latest values
    pub opts: PropOpts<E>, // Stores the integration options (resolution, init step, fixed step, etc.)
    order: u8,             // Order of the integrator
    stages: usize,         // Number of stages, i.e. how many times the derivatives will be called
    a_coeffs: &'a [f64],
    b_coeffs: &'a [f64],
}

impl<'a, D: Dynamics, E: ErrorCtrl> Propagator<'a, D, E> {
    /// Each propagator must be initialized with `new` which stores propagator information.
    pub fn new<T: RK>(dynamics: D, opts: PropOpts<E>) -> Self {
        Self {
            dynamics,
            opts,
            stages: T::STAGES,
            order: T::ORDER,
            a_coeffs: T::A_COEFFS,
            b_coeffs: T::B_COEFFS,
        }
    }

    /// A Dormand Prince 4-5 propagator with custom propagator options.
    pub fn dp45(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<Dormand45>(dynamics, opts)
    }

    /// Set the resolution of the adaptive step size controller
    pub fn set_resolution(&mut self, resolution: f64) {
        self.opts.resolution = resolution;
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    pub(crate) fn a_coeffs(&self) -> &[f64] {
        self.a_coeffs
    }

    pub(crate) fn b_coeffs(&self) -> &[f64] {
        self.b_coeffs
    }

    /// Prepares the propagation of `batch`, every packet starting with the initial step of the options.
    pub fn with(&'a self, batch: PacketBatch) -> PropInstance<'a, D, E> {
        let step_sizes = vec![self.opts.init_step; batch.len()];
        // Pre-allocate the k used in the propagator
        let k = vec![Vec::<PacketVector>::new(); self.stages];
        let trajectory = PacketBatch::new(batch.hit_bodies.clone());
        PropInstance {
            batch,
            prop: self,
            details: IntegrationDetails {
                min_step: f64::INFINITY,
                ..Default::default()
            },
            step_sizes,
            trajectory,
            k,
        }
    }
}

impl<'a, D: Dynamics> Propagator<'a, D, ResolutionScaled> {
    /// Default propagator is a Dormand Prince 4-5 with the default PropOpts.
    pub fn default(dynamics: D) -> Self {
        Self::new::<Dormand45>(dynamics, PropOpts::default())
    }
}
