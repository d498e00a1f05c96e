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

use crate::atomic::AtomicDataError;
use crate::cosmic::EphemerisError;
use crate::dynamics::DynamicsError;
use crate::io::{InputError, InputOutputError};
use crate::propagators::PropagationError;

/// Top-level error of a simulation: every failure of a module surfaces through one of these variants.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExosphereError {
    #[snafu(display("invalid inputs: {source}"))]
    Input { source: InputError },
    #[snafu(display("atomic data issue when {action}: {source}"))]
    AtomicData {
        action: &'static str,
        source: AtomicDataError,
    },
    #[snafu(display("ephemeris issue when {action}: {source}"))]
    Ephemeris {
        action: &'static str,
        source: EphemerisError,
    },
    #[snafu(display("dynamics could not be set up when {action}: {source}"))]
    Dynamics {
        action: &'static str,
        source: DynamicsError,
    },
    #[snafu(display("propagation of iteration {iteration} failed: {source}"))]
    Propagation {
        iteration: u32,
        source: PropagationError,
    },
    #[snafu(display("packet store issue when {action}: {source}"))]
    Store {
        action: &'static str,
        source: InputOutputError,
    },
}

impl From<InputError> for ExosphereError {
    fn from(source: InputError) -> Self {
        Self::Input { source }
    }
}
