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

use super::{read_maybe_gz, AtomicDataError, Interp1D};
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// On-disk electron impact package of one species.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ElectronImpactRepr {
    species: String,
    /// Electron temperatures, in eV
    temperature_ev: Vec<f64>,
    /// Ionisation rate coefficients, in cm^3/s
    kappa_cm3_s: Vec<f64>,
}

/// Electron impact ionisation rate coefficient of a species as a function of electron temperature.
#[derive(Clone, Debug, PartialEq)]
pub struct ElectronImpact {
    pub species: String,
    kappa: Interp1D,
}

impl ElectronImpact {
    pub fn new(species: &str, temperature_ev: Vec<f64>, kappa_cm3_s: Vec<f64>) -> Result<Self, AtomicDataError> {
        Ok(Self {
            species: species.to_string(),
            kappa: Interp1D::new(species, temperature_ev, kappa_cm3_s)?,
        })
    }

    /// Loads a YAML package, gzip compressed if its name ends with `.gz`.
    pub fn load(path: &Path) -> Result<Self, AtomicDataError> {
        let display = path.display().to_string();
        let contents = read_maybe_gz(path)?;
        let repr: ElectronImpactRepr =
            serde_yaml::from_str(&contents).map_err(|e| AtomicDataError::Decode {
                path: display.clone(),
                reason: e.to_string(),
            })?;
        Self::new(&display, repr.temperature_ev, repr.kappa_cm3_s).map(|eimp| Self {
            species: repr.species,
            ..eimp
        })
    }

    /// Rate coefficient in cm^3/s at an electron temperature in eV, clamped to the table.
    pub fn kappa(&self, temperature_ev: f64) -> f64 {
        self.kappa.eval(temperature_ev)
    }
}

#[cfg(test)]
mod ut_eimpact {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn gzipped_package() {
        let yaml = "species: Na\ntemperature_ev: [1.0, 10.0, 100.0]\nkappa_cm3_s: [1.0e-9, 2.0e-8, 5.0e-8]\n";
        let path = std::env::temp_dir().join(format!("exo-eimp-{}.yaml.gz", std::process::id()));
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(yaml.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let eimp = ElectronImpact::load(&path).unwrap();
        assert_eq!(eimp.species, "Na");
        assert_eq!(eimp.kappa(10.0), 2.0e-8);
        assert_eq!(eimp.kappa(1e4), 5.0e-8);
        assert!((eimp.kappa(55.0) - 3.5e-8).abs() < 1e-20);
        std::fs::remove_file(&path).unwrap();
    }
}
