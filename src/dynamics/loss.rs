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

use super::solarpressure::{is_lit, shadowing_bodies};
use super::{DynamicsAtomicDataSnafu, DynamicsConfigSnafu, DynamicsError};
use crate::atomic::{AtomicData, ChargeExchange, ElectronImpact};
use crate::cosmic::Ephemeris;
use crate::linalg::Vector3;
use crate::plasma::PlasmaModel;
use snafu::{ensure, ResultExt};
use std::fmt;
use std::sync::Arc;

/// Loss rate of the neutral species, in 1/s.
#[derive(Clone, Debug, Default)]
pub enum LossModel {
    /// Packets never lose weight.
    #[default]
    None,
    /// Every packet decays with the same e-folding time, in seconds.
    ConstantLifetime { lifetime_s: f64 },
    /// Photoionisation, electron impact and charge exchange.
    Physical(Box<PhysicalLoss>),
}

impl LossModel {
    pub fn constant_lifetime(lifetime_s: f64) -> Result<Self, DynamicsError> {
        ensure!(
            lifetime_s > 0.0,
            DynamicsConfigSnafu {
                msg: format!("constant lifetime must be positive, got {lifetime_s}")
            }
        );
        Ok(Self::ConstantLifetime { lifetime_s })
    }

    /// Rate of loss of a packet at `x` moving at `v`, at offset `t`.
    pub fn rate(&self, t: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
        match self {
            Self::None => 0.0,
            Self::ConstantLifetime { lifetime_s } => 1.0 / lifetime_s,
            Self::Physical(loss) => loss.rate(t, x, v),
        }
    }
}

impl fmt::Display for LossModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "no loss"),
            Self::ConstantLifetime { lifetime_s } => write!(f, "constant lifetime of {lifetime_s} s"),
            Self::Physical(loss) => write!(f, "{loss}"),
        }
    }
}

/// Sum of the photoionisation, electron impact and charge exchange rates.
#[derive(Clone, Debug)]
pub struct PhysicalLoss {
    ephemeris: Arc<Ephemeris>,
    /// Photoionisation rate at 1 AU, already multiplied by its factor
    photo_rate: f64,
    eimpact: Option<ElectronImpact>,
    eimp_factor: f64,
    chx: ChargeExchange,
    chx_factor: f64,
    plasma: PlasmaModel,
    shadowing: Vec<usize>,
}

impl PhysicalLoss {
    /// Builds the loss of the species of `atomic`.
    ///
    /// A positive `photo_lifetime` (at 1 AU, in seconds) replaces the tabulated photoionisation rate. Missing
    /// electron impact or charge exchange data set their contribution to zero; a missing photoionisation rate is an
    /// error when photoionisation is requested.
    pub fn new(
        ephemeris: Arc<Ephemeris>,
        atomic: &AtomicData,
        plasma: PlasmaModel,
        photo_lifetime: f64,
        photo_factor: f64,
        eimp_factor: f64,
        chx_factor: f64,
    ) -> Result<Self, DynamicsError> {
        for (name, value) in [
            ("photo_lifetime", photo_lifetime),
            ("photo_factor", photo_factor),
            ("eimp_factor", eimp_factor),
            ("chx_factor", chx_factor),
        ] {
            ensure!(
                value >= 0.0,
                DynamicsConfigSnafu {
                    msg: format!("{name} must be non-negative, got {value}")
                }
            );
        }

        let photo_rate = if photo_factor > 0.0 {
            let rate = if photo_lifetime > 0.0 {
                1.0 / photo_lifetime
            } else {
                atomic.require_photo_rate().context(DynamicsAtomicDataSnafu)?
            };
            rate * photo_factor
        } else {
            0.0
        };

        let eimpact = if eimp_factor > 0.0 && !plasma.is_none() {
            if atomic.eimpact.is_none() {
                warn!("no electron impact coefficients for {}: contribution set to zero", atomic.species);
            }
            atomic.eimpact.clone()
        } else {
            None
        };

        if chx_factor > 0.0 {
            for ion in plasma.ions() {
                if atomic.chx.ions().iter().all(|known| *known != ion.ion) {
                    warn!(
                        "no charge exchange between {} and {}: contribution set to zero",
                        atomic.species, ion.ion
                    );
                }
            }
        }

        let shadowing = shadowing_bodies(&ephemeris);
        Ok(Self {
            ephemeris,
            photo_rate,
            eimpact,
            eimp_factor,
            chx: atomic.chx.clone(),
            chx_factor,
            plasma,
            shadowing,
        })
    }

    /// Photoionisation rate of a packet at `x`, zero in shadow.
    pub fn photo(&self, t: f64, x: &Vector3<f64>) -> f64 {
        if self.photo_rate == 0.0 || !is_lit(&self.ephemeris, &self.shadowing, t, x) {
            return 0.0;
        }
        let r_au = self.ephemeris.sun_distance_au_at(t, x);
        self.photo_rate / (r_au * r_au)
    }

    pub fn electron_impact(&self, x: &Vector3<f64>) -> f64 {
        match &self.eimpact {
            Some(eimpact) => {
                let (n_e, t_e) = self.plasma.electrons(x);
                if n_e > 0.0 {
                    eimpact.kappa(t_e) * n_e * self.eimp_factor
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    pub fn charge_exchange(&self, x: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
        if self.chx_factor == 0.0 || self.chx.reactions.is_empty() {
            return 0.0;
        }
        let v_rel = self.ephemeris.units.to_km_s((self.plasma.flow(x) - v).norm());
        self.plasma
            .ions()
            .iter()
            .map(|pop| {
                let (n_i, t_i) = self.plasma.ion(&pop.ion, x);
                self.chx.kappa(&pop.ion, v_rel, t_i) * n_i
            })
            .sum::<f64>()
            * self.chx_factor
    }

    pub fn rate(&self, t: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
        self.photo(t, x) + self.electron_impact(x) + self.charge_exchange(x, v)
    }
}

impl fmt::Display for PhysicalLoss {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "loss of {}: photo {:.3e} 1/s at 1 AU, e-impact x{}, charge exchange x{} in {}",
            self.chx.species, self.photo_rate, self.eimp_factor, self.chx_factor, self.plasma
        )
    }
}
