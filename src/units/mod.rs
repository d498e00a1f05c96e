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

use crate::cosmic::Body;
use crate::linalg::Vector3;

/// One astronomical unit in kilometers.
pub const AU_KM: f64 = 149_597_870.7;
/// Boltzmann constant in J/K.
pub const BOLTZMANN_J_K: f64 = 1.380_649e-23;
/// Atomic mass unit in kg.
pub const AMU_KG: f64 = 1.660_539_066_60e-27;
/// Planck constant in J s.
pub const PLANCK_J_S: f64 = 6.626_070_15e-34;
/// Electron volt in J.
pub const EV_J: f64 = 1.602_176_634e-19;
/// Newtonian constant of gravitation in km^3 / (kg s^2).
pub const G_KM3_KG_S2: f64 = 6.674_30e-20;

/// The natural unit system of a run.
///
/// The length unit is the radius of the central body and the time unit is the second. Every external quantity
/// is converted once, when the run is set up, so that the integrator only ever sees dimensionless arrays.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelUnits {
    /// Length unit, in km.
    pub length_km: f64,
}

impl ModelUnits {
    pub fn new(length_km: f64) -> Self {
        Self { length_km }
    }

    /// Unit system of a run centred on the provided body.
    pub fn for_body(body: &Body) -> Self {
        Self::new(body.radius_km)
    }

    pub fn from_km(&self, km: f64) -> f64 {
        km / self.length_km
    }

    pub fn to_km(&self, length: f64) -> f64 {
        length * self.length_km
    }

    pub fn from_km_s(&self, km_s: f64) -> f64 {
        km_s / self.length_km
    }

    pub fn to_km_s(&self, speed: f64) -> f64 {
        speed * self.length_km
    }

    pub fn from_km_s2(&self, km_s2: f64) -> f64 {
        km_s2 / self.length_km
    }

    /// Converts a gravitational parameter in km^3/s^2 into natural units.
    pub fn from_gm(&self, gm_km3_s2: f64) -> f64 {
        gm_km3_s2 / self.length_km.powi(3)
    }

    pub fn vec_from_km(&self, km: &Vector3<f64>) -> Vector3<f64> {
        km / self.length_km
    }

    pub fn vec_to_km(&self, length: &Vector3<f64>) -> Vector3<f64> {
        length * self.length_km
    }

    /// Converts a heliocentric distance in natural units into AU.
    pub fn to_au(&self, length: f64) -> f64 {
        length * self.length_km / AU_KM
    }
}

/// Thermal speed `sqrt(2 k T / m)` in km/s of a particle of `mass_amu` at `temperature_k`.
pub fn thermal_speed_km_s(temperature_k: f64, mass_amu: f64) -> f64 {
    (2.0 * BOLTZMANN_J_K * temperature_k / (mass_amu * AMU_KG)).sqrt() / 1e3
}

/// Speed `sqrt(2 U / m)` in km/s corresponding to a binding energy `energy_ev` for a particle of `mass_amu`.
pub fn binding_speed_km_s(energy_ev: f64, mass_amu: f64) -> f64 {
    (2.0 * energy_ev * EV_J / (mass_amu * AMU_KG)).sqrt() / 1e3
}

#[cfg(test)]
mod ut_units {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn natural_units() {
        let units = ModelUnits::new(2439.7);
        assert_relative_eq!(units.to_km(units.from_km(1234.5)), 1234.5);
        assert_relative_eq!(units.from_km(2439.7), 1.0);
        assert_relative_eq!(units.from_gm(22_031.868_55), 22_031.868_55 / 2439.7f64.powi(3));
        assert_relative_eq!(units.to_au(AU_KM / 2439.7), 1.0);
    }

    #[test]
    fn characteristic_speeds() {
        // Sodium at 1500 K has a thermal speed of about 1.04 km/s
        assert_relative_eq!(thermal_speed_km_s(1500.0, 22.989_77), 1.0417, max_relative = 1e-3);
        // Sodium bound by 0.27 eV
        assert_relative_eq!(binding_speed_km_s(0.27, 22.989_77), 1.5054, max_relative = 1e-3);
    }
}
