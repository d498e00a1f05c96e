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

use super::{atomic_mass, AtomicDataError, CsvSnafu, DecodeSnafu, Interp1D, IoSnafu};
use crate::units::{ModelUnits, AMU_KG, PLANCK_J_S};
use regex::Regex;
use snafu::{ensure, ResultExt};
use std::path::Path;

/// Heliocentric distance at which g-values are tabulated, in AU.
pub const REFERENCE_DISTANCE_AU: f64 = 0.352;

lazy_static! {
    static ref GVALUE_FILE: Regex =
        Regex::new(r"^(?P<species>[A-Za-z]+\+?)\.(?P<lines>\d+(?:\.\d+)?(?:_\d+(?:\.\d+)?)*)\.csv$").unwrap();
}

/// g-values of the resonance lines of one species as a function of heliocentric radial velocity.
///
/// The file is named `<species>.<λ1>_<λ2>...csv` with the wavelengths in Å; its first column is the radial
/// velocity in km/s and every other column the g-value in 1/s of one line, in the order of the file name, at
/// [`REFERENCE_DISTANCE_AU`].
#[derive(Clone, Debug, PartialEq)]
pub struct GValueTable {
    pub species: String,
    pub mass_amu: f64,
    pub wavelengths_angstrom: Vec<f64>,
    pub velocity_km_s: Vec<f64>,
    /// One column per line
    pub gvalues: Vec<Vec<f64>>,
}

impl GValueTable {
    /// Parses the species and the wavelengths from a g-value file name.
    pub fn parse_name(file_name: &str) -> Option<(String, Vec<f64>)> {
        let caps = GVALUE_FILE.captures(file_name)?;
        let lines = caps["lines"]
            .split('_')
            .map(|l| l.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .ok()?;
        Some((caps["species"].to_string(), lines))
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, AtomicDataError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let (species, wavelengths_angstrom) =
            Self::parse_name(&file_name).ok_or_else(|| AtomicDataError::Decode {
                path: display.clone(),
                reason: "file name is not <species>.<wavelengths>.csv".to_string(),
            })?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .context(CsvSnafu { path: &display })?;

        let mut velocity_km_s = Vec::new();
        let mut gvalues = vec![Vec::new(); wavelengths_angstrom.len()];
        for record in reader.records() {
            let record = record.context(CsvSnafu { path: &display })?;
            ensure!(
                record.len() == wavelengths_angstrom.len() + 1,
                DecodeSnafu {
                    path: &display,
                    reason: format!(
                        "expected {} columns, found {}",
                        wavelengths_angstrom.len() + 1,
                        record.len()
                    )
                }
            );
            let values = record
                .iter()
                .map(|field| field.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| AtomicDataError::Decode {
                    path: display.clone(),
                    reason: e.to_string(),
                })?;
            velocity_km_s.push(values[0]);
            for (column, value) in gvalues.iter_mut().zip(&values[1..]) {
                column.push(*value);
            }
        }

        let table = Self {
            mass_amu: atomic_mass(&species)?,
            species,
            wavelengths_angstrom,
            velocity_km_s,
            gvalues,
        };
        // Validates the velocity grid
        table.radiation_acceleration_km_s2(&display)?;
        debug!("loaded {} g-value samples from {display}", table.velocity_km_s.len());
        Ok(table)
    }

    /// Finds and loads the table of `species` in `dir`, if there is one.
    pub fn find(dir: &Path, species: &str) -> Result<Option<Self>, AtomicDataError> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let entries = std::fs::read_dir(dir).context(IoSnafu {
            path: dir.display().to_string(),
        })?;
        let mut candidates: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| Self::parse_name(&name.to_string_lossy()))
                    .map_or(false, |(sp, _)| sp == species)
            })
            .collect();
        candidates.sort();
        match candidates.first() {
            Some(path) => Ok(Some(Self::from_csv(path)?)),
            None => Ok(None),
        }
    }

    /// Radiation acceleration in km/s² at the reference distance, as a function of radial velocity in km/s.
    ///
    /// Each line contributes `h g / (m λ)`.
    pub fn radiation_acceleration_km_s2(&self, name: &str) -> Result<Interp1D, AtomicDataError> {
        let mass_kg = self.mass_amu * AMU_KG;
        let accel = (0..self.velocity_km_s.len())
            .map(|k| {
                self.wavelengths_angstrom
                    .iter()
                    .zip(&self.gvalues)
                    .map(|(lambda, g)| PLANCK_J_S * g[k] / (mass_kg * lambda * 1e-10))
                    .sum::<f64>()
                    / 1e3
            })
            .collect();
        Interp1D::new(name, self.velocity_km_s.clone(), accel)
    }

    /// Same as [`Self::radiation_acceleration_km_s2`] in the natural units of a run.
    pub fn radiation_acceleration(&self, units: &ModelUnits) -> Result<Interp1D, AtomicDataError> {
        Ok(self
            .radiation_acceleration_km_s2(&self.species)?
            .scaled(units.from_km_s(1.0), units.from_km_s2(1.0)))
    }
}

#[cfg(test)]
mod ut_gvalues {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn file_names() {
        assert_eq!(
            GValueTable::parse_name("Na.5891_5897.csv"),
            Some(("Na".to_string(), vec![5891.0, 5897.0]))
        );
        assert_eq!(
            GValueTable::parse_name("Ca+.3934.8.csv"),
            Some(("Ca+".to_string(), vec![3934.8]))
        );
        assert_eq!(GValueTable::parse_name("Na.csv"), None);
        assert_eq!(GValueTable::parse_name("readme.txt"), None);
    }

    #[test]
    fn sodium_acceleration() {
        let table = GValueTable {
            species: "Na".to_string(),
            mass_amu: atomic_mass("Na").unwrap(),
            wavelengths_angstrom: vec![5891.0],
            velocity_km_s: vec![-10.0, 0.0, 10.0],
            gvalues: vec![vec![20.0, 10.0, 20.0]],
        };
        let accel = table.radiation_acceleration_km_s2("Na").unwrap();
        // h g / (m λ) for g = 10 /s
        let expected = PLANCK_J_S * 10.0 / (22.989_769 * AMU_KG * 5891e-10) / 1e3;
        assert_relative_eq!(accel.eval(0.0), expected, max_relative = 1e-12);
        assert_relative_eq!(accel.eval(5.0), 1.5 * expected, max_relative = 1e-12);
        // About 3e-4 km/s² for 10 photons per second
        assert!(expected > 1e-4 && expected < 1e-3);

        let units = ModelUnits::new(2439.7);
        let natural = table.radiation_acceleration(&units).unwrap();
        assert_relative_eq!(natural.eval(5.0 / 2439.7), 1.5 * expected / 2439.7, max_relative = 1e-12);
    }
}
