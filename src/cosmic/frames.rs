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

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Frames in which an ephemeris provider can express states and rotations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Frame {
    /// Inertial J2000 axes (ICRF).
    J2000,
    /// IAU body-fixed frame of the body with this NAIF identifier.
    Iau(i32),
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::J2000 => write!(f, "J2000"),
            Self::Iau(id) => write!(f, "IAU({id})"),
        }
    }
}

/// Frame in which the surface source of a run is defined.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFrame {
    /// Body-fixed frame of the source body, rotating with its surface.
    #[serde(rename = "IAU")]
    Iau,
    /// Model axes frozen at the end of the run: the source is fixed in inertial space.
    #[serde(rename = "SOLAR")]
    Solar,
    /// Model axes at each instant: the source is fixed with respect to the Sun direction.
    #[default]
    #[serde(rename = "SOLARFIXED")]
    SolarFixed,
}

impl SourceFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iau => "IAU",
            Self::Solar => "SOLAR",
            Self::SolarFixed => "SOLARFIXED",
        }
    }
}

impl fmt::Display for SourceFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
