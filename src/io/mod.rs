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

use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::prelude::*;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub(crate) mod watermark;

/// Run inputs: the configuration groups, their validation and their comparison rules.
pub mod inputs;
pub use self::inputs::*;

/// The fingerprint index mapping normalised inputs to run identifiers.
pub mod index;
pub use self::index::*;

/// Packet stores: the `Store` interface, an in-memory store and the Parquet store.
pub mod store;
pub use self::store::*;

mod parquet_store;
pub use self::parquet_store::ParquetStore;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors raised while reading or validating the inputs of a run, before anything is written.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InputError {
    #[snafu(display("invalid `{key}`: {reason}"))]
    Config { key: String, reason: String },
    #[snafu(display("`{key}` = {value} is out of range [{min}, {max}]"))]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[snafu(display("unknown body `{name}`"))]
    UnknownBody { name: String },
    #[snafu(display("failed to parse YAML inputs: {source}"))]
    Parse { source: serde_yaml::Error },
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PartialEq for InputError {
    /// No two input errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

/// Errors of the packet stores and of the fingerprint index.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InputOutputError {
    #[snafu(display("{action} encountered i/o error: {source}"))]
    StdIOError {
        action: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("missing required data {which}"))]
    MissingData { which: String },
    #[snafu(display("unknown run #{run}"))]
    UnknownRun { run: u64 },
    #[snafu(display("{action} encountered a Parquet error: {source}"))]
    ParquetError {
        action: &'static str,
        source: ParquetError,
    },
    #[snafu(display("{action} encountered an Arrow error: {source}"))]
    ArrowError {
        action: &'static str,
        source: ArrowError,
    },
    #[snafu(display("{action} encountered a YAML error: {source}"))]
    YamlError {
        action: &'static str,
        source: serde_yaml::Error,
    },
    #[snafu(display("inconsistent data: {msg}"))]
    Inconsistency { msg: String },
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, InputError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path.as_ref()).context(ReadSnafu {
            path: path.as_ref().to_path_buf(),
        })?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, InputError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path.as_ref()).context(ReadSnafu {
            path: path.as_ref().to_path_buf(),
        })?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds the configuration representation from a yaml string
    fn loads(data: &str) -> Result<Self, InputError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, InputError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}
