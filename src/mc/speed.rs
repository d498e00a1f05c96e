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

use super::cdf::{InverseCdf, CDF_NODES};
use crate::units::{binding_speed_km_s, thermal_speed_km_s};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use std::fmt;

/// Distribution of the ejection speeds, in km/s.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeedDistribution {
    /// Uniform in `[vmin, vmax]`.
    Flat { vmin: f64, vmax: f64 },
    /// Maxwellian flux `v³ exp(-v²/v_th²)` at a temperature in K, on `[0, 3 v_th]`.
    Maxwellian {
        temperature_k: f64,
        mass_amu: f64,
        sampler: InverseCdf,
    },
    /// Sputtering `v^(2β+1) / (v² + v_b²)^α` for a binding energy in eV, on `[0, 4 v_b]`.
    Sputtering {
        alpha: f64,
        beta: f64,
        binding_ev: f64,
        mass_amu: f64,
        sampler: InverseCdf,
    },
    /// Normal in speed, truncated to positive speeds.
    Gaussian { vprob: f64, sigma: f64 },
}

impl SpeedDistribution {
    pub fn flat(vmin: f64, vmax: f64) -> Self {
        Self::Flat { vmin, vmax }
    }

    /// Returns `None` when the temperature or the mass do not define a density.
    pub fn maxwellian(temperature_k: f64, mass_amu: f64) -> Option<Self> {
        let vth = thermal_speed_km_s(temperature_k, mass_amu);
        let sampler = InverseCdf::from_pdf(
            |v| (v / vth).powi(3) * (-(v / vth).powi(2)).exp(),
            0.0,
            3.0 * vth,
            CDF_NODES,
        )?;
        Some(Self::Maxwellian {
            temperature_k,
            mass_amu,
            sampler,
        })
    }

    /// Returns `None` when the parameters do not define a density.
    pub fn sputtering(alpha: f64, beta: f64, binding_ev: f64, mass_amu: f64) -> Option<Self> {
        let vb = binding_speed_km_s(binding_ev, mass_amu);
        let sampler = InverseCdf::from_pdf(
            |v| {
                let x = v / vb;
                x.powf(2.0 * beta + 1.0) / (x * x + 1.0).powf(alpha)
            },
            0.0,
            4.0 * vb,
            CDF_NODES,
        )?;
        Some(Self::Sputtering {
            alpha,
            beta,
            binding_ev,
            mass_amu,
            sampler,
        })
    }

    pub fn gaussian(vprob: f64, sigma: f64) -> Self {
        Self::Gaussian { vprob, sigma }
    }

    /// Smallest and largest speeds this distribution can produce.
    pub fn support(&self) -> (f64, f64) {
        match self {
            Self::Flat { vmin, vmax } => (*vmin, *vmax),
            Self::Maxwellian { sampler, .. } | Self::Sputtering { sampler, .. } => sampler.support(),
            Self::Gaussian { .. } => (0.0, f64::INFINITY),
        }
    }

    /// Draws `n` speeds in km/s.
    pub fn choose_points<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl Distribution<f64> for SpeedDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Flat { vmin, vmax } => {
                if vmin == vmax {
                    *vmin
                } else {
                    Uniform::new_inclusive(*vmin, *vmax).sample(rng)
                }
            }
            Self::Maxwellian { sampler, .. } | Self::Sputtering { sampler, .. } => sampler.sample(rng),
            Self::Gaussian { vprob, sigma } => {
                let normal = match Normal::new(*vprob, *sigma) {
                    Ok(normal) if *sigma > 0.0 => normal,
                    _ => return vprob.max(0.0),
                };
                loop {
                    let v = normal.sample(rng);
                    if v > 0.0 {
                        return v;
                    }
                }
            }
        }
    }
}

impl fmt::Display for SpeedDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Flat { vmin, vmax } => write!(f, "flat speeds in [{vmin}, {vmax}] km/s"),
            Self::Maxwellian { temperature_k, .. } => write!(f, "Maxwellian flux at {temperature_k} K"),
            Self::Sputtering {
                alpha,
                beta,
                binding_ev,
                ..
            } => write!(f, "sputtering (α = {alpha}, β = {beta}, U = {binding_ev} eV)"),
            Self::Gaussian { vprob, sigma } => write!(f, "Gaussian speeds ({vprob} ± {sigma} km/s)"),
        }
    }
}
