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

use super::{AlmanacSnafu, Body, CartesianState, EphemerisError, EphemerisProvider, Frame, OrientationSnafu};
use crate::linalg::Matrix3;
use crate::time::Epoch;
use anise::constants::frames::SUN_J2000;
use anise::constants::orientations::J2000;
use anise::prelude::{Almanac, Frame as AniseFrame};
use snafu::ResultExt;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Ephemeris provider backed by the SPICE kernels of an ANISE almanac.
///
/// The almanac must hold the planetary ephemeris (SPK) of every body in scope and, for sources defined in body-fixed
/// frames, the planetary constants (PCA) with their IAU orientation.
#[derive(Clone)]
pub struct AlmanacProvider {
    pub almanac: Arc<Almanac>,
}

impl AlmanacProvider {
    pub fn new(almanac: Arc<Almanac>) -> Self {
        Self { almanac }
    }

    /// Loads every kernel in order into a fresh almanac.
    pub fn from_kernels<P: AsRef<Path>>(kernels: &[P]) -> Result<Self, EphemerisError> {
        let mut almanac = Almanac::default();
        for kernel in kernels {
            let path = kernel.as_ref().to_string_lossy();
            debug!("loading kernel {path}");
            almanac = almanac.load(&path).context(AlmanacSnafu {
                action: "load kernel",
            })?;
        }
        Ok(Self::new(Arc::new(almanac)))
    }

    fn anise_frame(frame: Frame) -> AniseFrame {
        match frame {
            Frame::J2000 => SUN_J2000,
            Frame::Iau(id) => AniseFrame::new(id, id),
        }
    }
}

impl EphemerisProvider for AlmanacProvider {
    fn state(&self, body: &Body, epoch: Epoch, frame: Frame) -> Result<CartesianState, EphemerisError> {
        if body.is_star() {
            return Ok(CartesianState::zero());
        }
        let observer = match frame {
            Frame::J2000 => SUN_J2000,
            Frame::Iau(id) => AniseFrame::new(Body::sun().naif_id, id),
        };
        let state = self
            .almanac
            .transform(AniseFrame::new(body.naif_id, J2000), observer, epoch, None)
            .context(AlmanacSnafu {
                action: "compute heliocentric state",
            })?;
        Ok(CartesianState::new(state.radius_km, state.velocity_km_s))
    }

    fn frame_rotation(&self, from: Frame, to: Frame, epoch: Epoch) -> Result<Matrix3<f64>, EphemerisError> {
        if from == to {
            return Ok(Matrix3::identity());
        }
        let dcm = self
            .almanac
            .rotate(Self::anise_frame(from), Self::anise_frame(to), epoch)
            .context(OrientationSnafu {
                action: "compute frame rotation",
            })?;
        Ok(dcm.rot_mat)
    }
}

impl fmt::Display for AlmanacProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ANISE almanac ephemeris")
    }
}
