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

use snafu::prelude::*;
use std::fmt;

/// Provides different methods for controlling the error computation of the integrator.
pub mod error_ctrl;
pub use self::error_ctrl::*;

// Re-Export
mod instance;
pub use instance::*;
mod propagator;
pub use propagator::*;
mod rk_methods;
pub use rk_methods::*;
mod options;
pub use options::*;

use crate::dynamics::DynamicsError;

/// Stores the statistics of the propagation of a batch of packets.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct IntegrationDetails {
    /// number of accepted steps, summed over the packets
    pub accepted: u64,
    /// number of rejected steps, summed over the packets
    pub rejected: u64,
    /// largest normalised error of an accepted step
    pub max_error: f64,
    /// smallest step size accepted, in seconds
    pub min_step: f64,
}

impl IntegrationDetails {
    /// Accumulates the statistics of another propagation.
    pub fn merge(&mut self, other: &Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.max_error = self.max_error.max(other.max_error);
        self.min_step = self.min_step.min(other.min_step);
    }
}

impl fmt::Display for IntegrationDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IntegrationDetails {{accepted: {}, rejected: {}, max error: {:.3e}, min step: {:.3e} s}}",
            self.accepted, self.rejected, self.max_error, self.min_step
        )
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display("encountered a dynamics error {source}"))]
    Dynamics { source: DynamicsError },
    #[snafu(display("{quantity} of packet #{packet} is not finite"))]
    NonFinite { packet: u64, quantity: &'static str },
    #[snafu(display("step of packet #{packet} shrank to {step:e} s without meeting the tolerance"))]
    StepUnderflow { packet: u64, step: f64 },
}
