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
use crate::utils::wrap_2pi;
use std::f64::consts::TAU;
use std::fmt;

/// Eccentricity below which an orbit is treated as circular when computing the true anomaly.
const ECC_EPSILON: f64 = 1e-11;

/// A position and velocity, in km and km/s, in whichever frame the provider was asked for.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CartesianState {
    pub position_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
}

impl CartesianState {
    pub fn new(position_km: Vector3<f64>, velocity_km_s: Vector3<f64>) -> Self {
        Self {
            position_km,
            velocity_km_s,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn rmag_km(&self) -> f64 {
        self.position_km.norm()
    }

    /// Rate of change of the distance to the origin, in km/s
    pub fn rdot_km_s(&self) -> f64 {
        let rmag = self.rmag_km();
        if rmag > 0.0 {
            self.position_km.dot(&self.velocity_km_s) / rmag
        } else {
            0.0
        }
    }

    /// Orbital angular momentum per unit mass, in km^2/s
    pub fn hvec(&self) -> Vector3<f64> {
        self.position_km.cross(&self.velocity_km_s)
    }

    /// Computes the osculating elements of this state about a body of gravitational parameter `gm_km3_s2`.
    pub fn orbit_elements(&self, gm_km3_s2: f64) -> OrbitElements {
        OrbitElements::from_state(self, gm_km3_s2)
    }
}

impl std::ops::Sub for CartesianState {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            position_km: self.position_km - other.position_km,
            velocity_km_s: self.velocity_km_s - other.velocity_km_s,
        }
    }
}

impl std::ops::Add for CartesianState {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            position_km: self.position_km + other.position_km,
            velocity_km_s: self.velocity_km_s + other.velocity_km_s,
        }
    }
}

/// The subset of the osculating elements the exosphere model needs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrbitElements {
    pub sma_km: f64,
    pub ecc: f64,
    /// True anomaly in radians, in [0, 2π)
    pub taa: f64,
}

impl OrbitElements {
    pub fn from_state(state: &CartesianState, gm_km3_s2: f64) -> Self {
        let r = state.position_km;
        let v = state.velocity_km_s;
        let rmag = r.norm();
        let vmag2 = v.norm_squared();
        let hvec = r.cross(&v);

        let evec = v.cross(&hvec) / gm_km3_s2 - r / rmag;
        let ecc = evec.norm();
        let sma_km = 1.0 / (2.0 / rmag - vmag2 / gm_km3_s2);

        let taa = if ecc < ECC_EPSILON {
            // No periapsis: measure from the x axis projected on the orbital plane
            let node = Vector3::z().cross(&hvec);
            let reference = if node.norm() > 0.0 {
                node.normalize()
            } else {
                Vector3::x()
            };
            let cos_u = (reference.dot(&r) / rmag).clamp(-1.0, 1.0);
            let u = cos_u.acos();
            if hvec.dot(&reference.cross(&r)) < 0.0 {
                TAU - u
            } else {
                u
            }
        } else {
            let cos_nu = (evec.dot(&r) / (ecc * rmag)).clamp(-1.0, 1.0);
            let nu = cos_nu.acos();
            if r.dot(&v) < 0.0 {
                TAU - nu
            } else {
                nu
            }
        };

        Self {
            sma_km,
            ecc,
            taa: wrap_2pi(taa),
        }
    }

    /// Semi-latus rectum, in km
    pub fn semi_parameter_km(&self) -> f64 {
        self.sma_km * (1.0 - self.ecc.powi(2))
    }

    /// Orbital radius at the current true anomaly, in km
    pub fn radius_km(&self) -> f64 {
        self.semi_parameter_km() / (1.0 + self.ecc * self.taa.cos())
    }

    /// Radial velocity at the current true anomaly, in km/s
    pub fn radial_velocity_km_s(&self, gm_km3_s2: f64) -> f64 {
        (gm_km3_s2 / self.semi_parameter_km()).sqrt() * self.ecc * self.taa.sin()
    }

    /// Transverse velocity at the current true anomaly, in km/s
    pub fn transverse_velocity_km_s(&self, gm_km3_s2: f64) -> f64 {
        (gm_km3_s2 / self.semi_parameter_km()).sqrt() * (1.0 + self.ecc * self.taa.cos())
    }
}

impl fmt::Display for OrbitElements {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "sma = {:.3} km\tecc = {:.6}\ttaa = {:.3} deg",
            self.sma_km,
            self.ecc,
            self.taa.to_degrees()
        )
    }
}
