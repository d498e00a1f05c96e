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

use crate::linalg::Vector3;
use serde_derive::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

/// One ion species of a plasma, as a fraction of the electron density.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IonPopulation {
    pub ion: String,
    /// Ion density divided by the electron density
    pub fraction: f64,
    pub temperature_ev: f64,
}

/// Electron and ion environment seen by the neutrals, evaluated at positions of the model frame.
///
/// Positions and flow velocities are in natural units, densities in cm^-3 and temperatures in eV.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlasmaModel {
    /// No plasma: electron impact and charge exchange vanish.
    #[default]
    None,
    /// Constant density and temperature everywhere, optionally in rigid co-rotation with the central body.
    Uniform {
        n_e_cm3: f64,
        te_ev: f64,
        #[serde(default)]
        ions: Vec<IonPopulation>,
        #[serde(default)]
        corotation_period_s: Option<f64>,
    },
    /// Torus centred on the equatorial plane of the central body, with a power law in cylindrical radius and a
    /// Gaussian profile in height, in rigid co-rotation.
    Torus {
        /// Reference cylindrical radius, in central body radii
        r0: f64,
        /// Electron density at the reference radius in the equatorial plane
        n0_cm3: f64,
        /// Power law index of the radial decrease
        power: f64,
        /// Scale height, in central body radii
        scale_height: f64,
        te_ev: f64,
        #[serde(default)]
        ions: Vec<IonPopulation>,
        corotation_period_s: f64,
    },
}

/// Smallest cylindrical radius used by the torus profile, avoiding the singularity on the axis.
const MIN_CYLINDRICAL_RADIUS: f64 = 1e-6;

impl PlasmaModel {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn ions(&self) -> &[IonPopulation] {
        match self {
            Self::None => &[],
            Self::Uniform { ions, .. } | Self::Torus { ions, .. } => ions,
        }
    }

    /// Electron density and temperature at `x`.
    pub fn electrons(&self, x: &Vector3<f64>) -> (f64, f64) {
        match self {
            Self::None => (0.0, 0.0),
            Self::Uniform { n_e_cm3, te_ev, .. } => (*n_e_cm3, *te_ev),
            Self::Torus {
                r0,
                n0_cm3,
                power,
                scale_height,
                te_ev,
                ..
            } => {
                let rho = x.x.hypot(x.y).max(MIN_CYLINDRICAL_RADIUS);
                let density = n0_cm3 * (rho / r0).powf(-power) * (-(x.z / scale_height).powi(2)).exp();
                (density, *te_ev)
            }
        }
    }

    /// Density and temperature of `ion` at `x`, zero when the plasma does not carry it.
    pub fn ion(&self, ion: &str, x: &Vector3<f64>) -> (f64, f64) {
        match self.ions().iter().find(|pop| pop.ion == ion) {
            Some(pop) => (pop.fraction * self.electrons(x).0, pop.temperature_ev),
            None => (0.0, 0.0),
        }
    }

    /// Bulk flow velocity of the plasma at `x`, `Ω × x` for a co-rotating plasma.
    pub fn flow(&self, x: &Vector3<f64>) -> Vector3<f64> {
        let period = match self {
            Self::None => return Vector3::zeros(),
            Self::Uniform {
                corotation_period_s, ..
            } => match corotation_period_s {
                Some(period) => *period,
                None => return Vector3::zeros(),
            },
            Self::Torus {
                corotation_period_s, ..
            } => *corotation_period_s,
        };
        let omega = Vector3::new(0.0, 0.0, TAU / period);
        omega.cross(x)
    }
}

impl fmt::Display for PlasmaModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "no plasma"),
            Self::Uniform { n_e_cm3, te_ev, .. } => {
                write!(f, "uniform plasma (n_e = {n_e_cm3} cm^-3, T_e = {te_ev} eV)")
            }
            Self::Torus { r0, n0_cm3, .. } => {
                write!(f, "plasma torus (n0 = {n0_cm3} cm^-3 at {r0} R)")
            }
        }
    }
}
