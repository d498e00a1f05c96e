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

use super::{AccelModel, DynamicsAtomicDataSnafu, DynamicsEphemerisSnafu, DynamicsError};
use crate::atomic::{GValueTable, Interp1D, REFERENCE_DISTANCE_AU};
use crate::cosmic::out_of_shadow_at;
use crate::cosmic::Ephemeris;
use crate::linalg::Vector3;
use snafu::ResultExt;
use std::fmt;
use std::sync::Arc;

/// Indices of the tracks able to cast a shadow, i.e. every body but the Sun.
pub(crate) fn shadowing_bodies(ephemeris: &Ephemeris) -> Vec<usize> {
    ephemeris
        .tracks()
        .iter()
        .enumerate()
        .filter(|(_, track)| !track.body.is_star())
        .map(|(idx, _)| idx)
        .collect()
}

/// Whether `x` is lit by the Sun at offset `t`, i.e. out of the shadow of every body of `shadowing`.
pub(crate) fn is_lit(ephemeris: &Ephemeris, shadowing: &[usize], t: f64, x: &Vector3<f64>) -> bool {
    shadowing
        .iter()
        .all(|&idx| out_of_shadow_at(&ephemeris.tracks()[idx], t, x))
}

/// Radiation pressure from resonant scattering of sunlight.
///
/// The acceleration at the reference distance is tabulated against the heliocentric radial velocity of the
/// packet (Doppler shift across the solar lines), then scaled with the inverse square of the heliocentric
/// distance. It points away from the Sun and vanishes in the shadow of any body.
#[derive(Clone, Debug)]
pub struct SolarPressure {
    ephemeris: Arc<Ephemeris>,
    /// Acceleration at 0.352 AU in natural units, against radial velocity in natural units
    accel: Interp1D,
    /// Track giving the Sun direction and the heliocentric radial velocity of the frame origin
    reference: usize,
    shadowing: Vec<usize>,
}

impl SolarPressure {
    /// Radiation pressure on the species of `gvalues`, referenced to `startpoint` when the run is centred on the
    /// Sun and to the central body otherwise.
    pub fn new(
        ephemeris: Arc<Ephemeris>,
        gvalues: &GValueTable,
        startpoint: &str,
    ) -> Result<Arc<Self>, DynamicsError> {
        let accel = gvalues
            .radiation_acceleration(&ephemeris.units)
            .context(DynamicsAtomicDataSnafu)?;
        let reference_name = ephemeris
            .radiation_reference(startpoint)
            .context(DynamicsEphemerisSnafu)?
            .body
            .name;
        let reference = ephemeris
            .tracks()
            .iter()
            .position(|track| track.body.name == reference_name)
            .unwrap_or(0);
        let shadowing = shadowing_bodies(&ephemeris);
        debug!(
            "radiation pressure of {} referenced to {reference_name}",
            gvalues.species
        );
        Ok(Arc::new(Self {
            ephemeris,
            accel,
            reference,
            shadowing,
        }))
    }

    /// Heliocentric radial velocity of a packet (positive away from the Sun) and its unit vector away from the Sun.
    fn radial(&self, t: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> (f64, Vector3<f64>) {
        if self.ephemeris.heliocentric() {
            let away = x.normalize();
            (v.dot(&away), away)
        } else {
            let track = &self.ephemeris.tracks()[self.reference];
            let sun_dir = track.sun_dir_at(t);
            (track.drdt_sun_at(t) - v.dot(&sun_dir), -sun_dir)
        }
    }

    /// Magnitude of the radiation acceleration on a lit packet, in natural units.
    pub fn magnitude(&self, t: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
        let (v_r, _) = self.radial(t, x, v);
        let r_au = self.ephemeris.sun_distance_au_at(t, x);
        self.accel.eval(v_r) * (REFERENCE_DISTANCE_AU / r_au).powi(2)
    }
}

impl fmt::Display for SolarPressure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "radiation pressure referenced to {}",
            self.ephemeris.tracks()[self.reference].body.name
        )
    }
}

impl AccelModel for SolarPressure {
    fn eom(&self, t: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
        if !is_lit(&self.ephemeris, &self.shadowing, t, x) {
            return Vector3::zeros();
        }
        let (v_r, away) = self.radial(t, x, v);
        let r_au = self.ephemeris.sun_distance_au_at(t, x);
        away * (self.accel.eval(v_r) * (REFERENCE_DISTANCE_AU / r_au).powi(2))
    }
}
