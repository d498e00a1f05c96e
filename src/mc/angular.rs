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

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Distribution of the ejection directions in the local tangent frame: altitude above the tangent plane and
/// azimuth east of north, in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AngularDistribution {
    /// Along the local vertical.
    Radial,
    /// Azimuth uniform in its range and altitude weighted by its cosine, so that the directions are isotropic
    /// over the selected part of the outward hemisphere.
    Isotropic {
        azimuth: (f64, f64),
        altitude: (f64, f64),
    },
}

impl AngularDistribution {
    /// Isotropic over the whole outward hemisphere.
    pub fn hemisphere() -> Self {
        Self::Isotropic {
            azimuth: (0.0, TAU),
            altitude: (0.0, FRAC_PI_2),
        }
    }

    /// Draws `n` pairs of (altitude, azimuth).
    pub fn choose_points<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<(f64, f64)> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl Distribution<(f64, f64)> for AngularDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        match self {
            Self::Radial => (FRAC_PI_2, 0.0),
            Self::Isotropic { azimuth, altitude } => {
                let unit = Uniform::new_inclusive(0.0, 1.0);
                let az_width = if azimuth.1 >= azimuth.0 {
                    azimuth.1 - azimuth.0
                } else {
                    azimuth.1 + TAU - azimuth.0
                };
                let mut az = azimuth.0 + unit.sample(rng) * az_width;
                if az > TAU && az_width < TAU {
                    az -= TAU;
                }
                let (s0, s1) = (altitude.0.sin(), altitude.1.sin());
                let alt = (s0 + unit.sample(rng) * (s1 - s0)).clamp(-1.0, 1.0).asin();
                (alt, az)
            }
        }
    }
}
