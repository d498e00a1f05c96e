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

use super::{AtomicDataError, CsvSnafu};
use serde_derive::Deserialize;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PhotoRecord {
    species: String,
    #[allow(dead_code)]
    reaction: String,
    rate: f64,
}

/// Photoionisation rates at 1 AU for the quiet Sun, summed over every reaction of a species.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhotoRates {
    rates: BTreeMap<String, f64>,
}

impl PhotoRates {
    /// Reads a CSV file with the `species`, `reaction` and `rate` columns, the rate being in 1/s at 1 AU.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, AtomicDataError> {
        let display = path.as_ref().display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .context(CsvSnafu { path: &display })?;

        let mut rates = BTreeMap::new();
        for record in reader.deserialize() {
            let record: PhotoRecord = record.context(CsvSnafu { path: &display })?;
            *rates.entry(record.species).or_insert(0.0) += record.rate;
        }
        Ok(Self { rates })
    }

    pub fn rate(&self, species: &str) -> Option<f64> {
        self.rates.get(species).copied()
    }

    pub fn species(&self) -> impl Iterator<Item = &String> {
        self.rates.keys()
    }
}
