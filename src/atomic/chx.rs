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

use super::{read_maybe_gz, AtomicDataError, DecodeSnafu, Interp1D, Interp2D};
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum KappaRepr {
    OneD(Vec<f64>),
    TwoD(Vec<Vec<f64>>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ReactionRepr {
    ion: String,
    reaction: String,
    v_rel_km_s: Vec<f64>,
    #[serde(default)]
    temperature_ev: Option<Vec<f64>>,
    kappa_cm3_s: KappaRepr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ChargeExchangeRepr {
    species: String,
    reactions: Vec<ReactionRepr>,
}

#[derive(Clone, Debug, PartialEq)]
enum ChxKappa {
    Velocity(Interp1D),
    VelocityTemperature(Interp2D),
}

/// Charge exchange of the neutral with one ion species.
#[derive(Clone, Debug, PartialEq)]
pub struct ChxReaction {
    pub ion: String,
    pub reaction: String,
    kappa: ChxKappa,
}

impl ChxReaction {
    /// Reaction tabulated in relative velocity only.
    pub fn from_velocity(
        ion: &str,
        reaction: &str,
        v_rel_km_s: Vec<f64>,
        kappa_cm3_s: Vec<f64>,
    ) -> Result<Self, AtomicDataError> {
        Ok(Self {
            ion: ion.to_string(),
            reaction: reaction.to_string(),
            kappa: ChxKappa::Velocity(Interp1D::new(reaction, v_rel_km_s, kappa_cm3_s)?),
        })
    }

    /// Reaction tabulated in relative velocity and ion temperature, `kappa_cm3_s[i][j]` at `(v_rel[i], T[j])`.
    pub fn from_grid(
        ion: &str,
        reaction: &str,
        v_rel_km_s: Vec<f64>,
        temperature_ev: Vec<f64>,
        kappa_cm3_s: Vec<Vec<f64>>,
    ) -> Result<Self, AtomicDataError> {
        Ok(Self {
            ion: ion.to_string(),
            reaction: reaction.to_string(),
            kappa: ChxKappa::VelocityTemperature(Interp2D::new(
                reaction,
                v_rel_km_s,
                temperature_ev,
                kappa_cm3_s,
            )?),
        })
    }

    /// Rate coefficient in cm^3/s, clamped to the table. The temperature is ignored by one dimensional tables.
    pub fn kappa(&self, v_rel_km_s: f64, temperature_ev: f64) -> f64 {
        match &self.kappa {
            ChxKappa::Velocity(table) => table.eval(v_rel_km_s),
            ChxKappa::VelocityTemperature(table) => table.eval(v_rel_km_s, temperature_ev),
        }
    }
}

/// Every charge exchange reaction of a neutral species.
#[derive(Clone, Debug, PartialEq)]
pub struct ChargeExchange {
    pub species: String,
    pub reactions: Vec<ChxReaction>,
}

impl ChargeExchange {
    pub fn empty(species: &str) -> Self {
        Self {
            species: species.to_string(),
            reactions: Vec::new(),
        }
    }

    pub fn with_reaction(mut self, reaction: ChxReaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    /// Loads a YAML package, gzip compressed if its name ends with `.gz`.
    pub fn load(path: &Path) -> Result<Self, AtomicDataError> {
        let display = path.display().to_string();
        let contents = read_maybe_gz(path)?;
        let repr: ChargeExchangeRepr =
            serde_yaml::from_str(&contents).map_err(|e| AtomicDataError::Decode {
                path: display.clone(),
                reason: e.to_string(),
            })?;

        let mut chx = Self::empty(&repr.species);
        for reaction in repr.reactions {
            let parsed = match (reaction.kappa_cm3_s, reaction.temperature_ev) {
                (KappaRepr::OneD(kappa), _) => {
                    ChxReaction::from_velocity(&reaction.ion, &reaction.reaction, reaction.v_rel_km_s, kappa)?
                }
                (KappaRepr::TwoD(kappa), Some(temperature)) => ChxReaction::from_grid(
                    &reaction.ion,
                    &reaction.reaction,
                    reaction.v_rel_km_s,
                    temperature,
                    kappa,
                )?,
                (KappaRepr::TwoD(_), None) => {
                    return DecodeSnafu {
                        path: &display,
                        reason: format!("{} has a 2-D table but no temperatures", reaction.reaction),
                    }
                    .fail()
                }
            };
            chx.reactions.push(parsed);
        }
        debug!("loaded {} charge exchange reactions from {display}", chx.reactions.len());
        Ok(chx)
    }

    /// Ions with at least one reaction
    pub fn ions(&self) -> Vec<&str> {
        let mut ions: Vec<&str> = Vec::new();
        for reaction in &self.reactions {
            if !ions.contains(&reaction.ion.as_str()) {
                ions.push(&reaction.ion);
            }
        }
        ions
    }

    /// Sum of the rate coefficients of every reaction with `ion`, zero when there is none.
    pub fn kappa(&self, ion: &str, v_rel_km_s: f64, temperature_ev: f64) -> f64 {
        self.reactions
            .iter()
            .filter(|r| r.ion == ion)
            .map(|r| r.kappa(v_rel_km_s, temperature_ev))
            .sum()
    }
}

#[cfg(test)]
mod ut_chx {
    use super::*;

    #[test]
    fn one_and_two_dimensional() {
        let path = std::env::temp_dir().join(format!("exo-chx-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "species: Na\nreactions:
  - ion: O+
    reaction: Na + O+ -> Na+ + O
    v_rel_km_s: [0.0, 100.0]
    kappa_cm3_s: [1.0e-9, 3.0e-9]
  - ion: S+
    reaction: Na + S+ -> Na+ + S
    v_rel_km_s: [0.0, 100.0]
    temperature_ev: [1.0, 10.0]
    kappa_cm3_s: [[1.0e-9, 2.0e-9], [3.0e-9, 4.0e-9]]
",
        )
        .unwrap();
        let chx = ChargeExchange::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(chx.ions(), vec!["O+", "S+"]);
        assert!((chx.kappa("O+", 50.0, 123.0) - 2.0e-9).abs() < 1e-22);
        assert!((chx.kappa("S+", 100.0, 10.0) - 4.0e-9).abs() < 1e-22);
        assert!((chx.kappa("S+", 0.0, 5.5) - 1.5e-9).abs() < 1e-22);
        assert_eq!(chx.kappa("H+", 10.0, 1.0), 0.0);
    }

    #[test]
    fn two_dimensional_needs_temperatures() {
        let path = std::env::temp_dir().join(format!("exo-chx-bad-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "species: Na\nreactions:\n  - ion: O+\n    reaction: r\n    v_rel_km_s: [0.0, 1.0]\n    kappa_cm3_s: [[1.0], [2.0]]\n",
        )
        .unwrap();
        let result = ChargeExchange::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(AtomicDataError::Decode { .. })));
    }
}
