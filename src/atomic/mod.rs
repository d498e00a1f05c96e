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

use flate2::read::GzDecoder;
use snafu::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

mod interp;
pub use self::interp::{Interp1D, Interp2D};

/// Velocity dependent g-values of the resonance lines of a species, and the radiation acceleration they produce.
mod gvalues;
pub use self::gvalues::{GValueTable, REFERENCE_DISTANCE_AU};

/// Photoionisation rates at 1 AU.
mod photo;
pub use self::photo::PhotoRates;

/// Electron impact ionisation coefficients.
mod eimpact;
pub use self::eimpact::ElectronImpact;

/// Charge exchange coefficients of a neutral with the ions of a plasma.
mod chx;
pub use self::chx::{ChargeExchange, ChxReaction};

/// Errors of the atomic data loaders.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AtomicDataError {
    #[snafu(display("no {what} available for {species}"))]
    MissingData { species: String, what: &'static str },
    #[snafu(display("could not decode {path}: {reason}"))]
    Decode { path: String, reason: String },
    #[snafu(display("CSV issue in {path}: {source}"))]
    Csv { path: String, source: csv::Error },
    #[snafu(display("could not read {path}: {source}"))]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Atomic masses in amu of the species the model knows about.
const ATOMIC_MASSES: &[(&str, f64)] = &[
    ("H", 1.008),
    ("He", 4.002_602),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("Na", 22.989_769),
    ("Mg", 24.305),
    ("Al", 26.981_538),
    ("Si", 28.085),
    ("S", 32.06),
    ("K", 39.098_3),
    ("Ca", 40.078),
    ("Ti", 47.867),
    ("Fe", 55.845),
];

/// Returns the atomic mass in amu of a species (an ion has the mass of its neutral).
pub fn atomic_mass(species: &str) -> Result<f64, AtomicDataError> {
    let neutral = species.trim_end_matches('+');
    ATOMIC_MASSES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(neutral))
        .map(|(_, mass)| *mass)
        .context(MissingDataSnafu {
            species,
            what: "atomic mass",
        })
}

/// Reads a whole file, decompressing it on the fly if its name ends with `.gz`.
pub(crate) fn read_maybe_gz(path: &Path) -> Result<String, AtomicDataError> {
    let display = path.display().to_string();
    let file = File::open(path).context(IoSnafu { path: &display })?;
    let mut buffer = String::new();
    if path.extension().map_or(false, |ext| ext == "gz") {
        GzDecoder::new(file)
            .read_to_string(&mut buffer)
            .context(IoSnafu { path: &display })?;
    } else {
        let mut file = file;
        file.read_to_string(&mut buffer)
            .context(IoSnafu { path: &display })?;
    }
    Ok(buffer)
}

/// Returns the first existing file among `<dir>/<stem>.yaml` and `<dir>/<stem>.yaml.gz`.
fn find_package(dir: &Path, stem: &str) -> Option<PathBuf> {
    ["yaml", "yaml.gz", "yml", "yml.gz"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.exists())
}

/// All the atomic data of one species.
///
/// Every table is optional: which ones are required depends on the forces and losses of a run, which check for
/// them when they are built.
#[derive(Clone, Debug)]
pub struct AtomicData {
    pub species: String,
    pub mass_amu: f64,
    pub gvalues: Option<GValueTable>,
    /// Photoionisation rate at 1 AU, in 1/s
    pub photo_rate: Option<f64>,
    pub eimpact: Option<ElectronImpact>,
    pub chx: ChargeExchange,
}

impl AtomicData {
    /// Species with no table at all.
    pub fn new(species: &str) -> Result<Self, AtomicDataError> {
        Ok(Self {
            species: species.to_string(),
            mass_amu: atomic_mass(species)?,
            gvalues: None,
            photo_rate: None,
            eimpact: None,
            chx: ChargeExchange::empty(species),
        })
    }

    pub fn with_gvalues(mut self, gvalues: GValueTable) -> Self {
        self.gvalues = Some(gvalues);
        self
    }

    pub fn with_photo_rate(mut self, rate_at_1au: f64) -> Self {
        self.photo_rate = Some(rate_at_1au);
        self
    }

    pub fn with_eimpact(mut self, eimpact: ElectronImpact) -> Self {
        self.eimpact = Some(eimpact);
        self
    }

    pub fn with_chx(mut self, chx: ChargeExchange) -> Self {
        self.chx = chx;
        self
    }

    /// Loads the tables of `species` found in `dir`.
    ///
    /// Layout: `gvalues/<species>.<wavelengths>.csv`, `photorates.csv`, `eimpact/<species>.yaml[.gz]` and
    /// `chx/<species>.yaml[.gz]`. A missing file leaves the table unset; a file that exists but cannot be decoded
    /// is an error.
    pub fn load<P: AsRef<Path>>(dir: P, species: &str) -> Result<Self, AtomicDataError> {
        let dir = dir.as_ref();
        let mut data = Self::new(species)?;

        data.gvalues = GValueTable::find(&dir.join("gvalues"), species)?;
        if data.gvalues.is_none() {
            warn!("no g-value table for {species} in {}", dir.display());
        }

        let photo_path = dir.join("photorates.csv");
        if photo_path.exists() {
            data.photo_rate = PhotoRates::from_csv(&photo_path)?.rate(species);
        }
        if data.photo_rate.is_none() {
            warn!("no photoionisation rate for {species} in {}", dir.display());
        }

        match find_package(&dir.join("eimpact"), species) {
            Some(path) => data.eimpact = Some(ElectronImpact::load(&path)?),
            None => warn!("no electron impact coefficients for {species}: contribution set to zero"),
        }

        match find_package(&dir.join("chx"), species) {
            Some(path) => data.chx = ChargeExchange::load(&path)?,
            None => warn!("no charge exchange reactions for {species}: contribution set to zero"),
        }

        info!(
            "atomic data of {species} ({} amu): g-values {}, photo rate {:?}, e-impact {}, {} charge exchange reactions",
            data.mass_amu,
            data.gvalues.is_some(),
            data.photo_rate,
            data.eimpact.is_some(),
            data.chx.reactions.len()
        );
        Ok(data)
    }

    /// Photoionisation rate at 1 AU, or an error when the species has none.
    pub fn require_photo_rate(&self) -> Result<f64, AtomicDataError> {
        self.photo_rate.context(MissingDataSnafu {
            species: &self.species,
            what: "photoionisation rate",
        })
    }

    pub fn require_gvalues(&self) -> Result<&GValueTable, AtomicDataError> {
        self.gvalues.as_ref().context(MissingDataSnafu {
            species: &self.species,
            what: "g-value table",
        })
    }
}

#[cfg(test)]
mod ut_atomic {
    use super::*;

    #[test]
    fn masses() {
        assert_eq!(atomic_mass("Na").unwrap(), 22.989_769);
        assert_eq!(atomic_mass("na").unwrap(), 22.989_769);
        assert_eq!(atomic_mass("O+").unwrap(), 15.999);
        assert!(atomic_mass("Xx").is_err());
    }

    #[test]
    fn missing_tables() {
        let data = AtomicData::new("Ca").unwrap();
        assert!(matches!(
            data.require_photo_rate(),
            Err(AtomicDataError::MissingData { .. })
        ));
        assert!(data.require_gvalues().is_err());
        assert_eq!(data.with_photo_rate(1e-5).require_photo_rate().unwrap(), 1e-5);
    }

    #[test]
    fn load_directory() {
        let dir = std::env::temp_dir().join(format!("exo-atomic-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("gvalues")).unwrap();
        std::fs::create_dir_all(dir.join("chx")).unwrap();
        std::fs::write(
            dir.join("photorates.csv"),
            "species,reaction,rate\nNa,Na -> Na+ + e,1.2e-5\nNa,Na -> Na+* + e,0.3e-5\nK,K -> K+ + e,2.0e-5\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("gvalues").join("Na.5891_5897.csv"),
            "velocity,5891,5897\n-10,1.0,0.5\n0,0.5,0.25\n10,1.0,0.5\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("chx").join("Na.yaml"),
            "species: Na\nreactions:\n  - ion: O+\n    reaction: Na + O+ -> Na+ + O\n    v_rel_km_s: [0.0, 100.0]\n    kappa_cm3_s: [1.0e-9, 2.0e-9]\n",
        )
        .unwrap();

        let data = AtomicData::load(&dir, "Na").unwrap();
        assert!((data.photo_rate.unwrap() - 1.5e-5).abs() < 1e-18);
        assert_eq!(data.gvalues.as_ref().unwrap().wavelengths_angstrom, vec![5891.0, 5897.0]);
        assert!(data.eimpact.is_none());
        assert_eq!(data.chx.reactions.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
