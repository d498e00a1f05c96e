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

use anise::errors::AlmanacError;
use anise::orientations::OrientationError;
use snafu::prelude::*;

/// Static catalogue of the solar system bodies.
mod bodies;
pub use self::bodies::{Body, BodyKind};

/// Frames understood by the ephemeris providers and the frames in which sources are defined.
mod frames;
pub use self::frames::{Frame, SourceFrame};

/// Orbital elements computed from a cartesian state.
mod orbit;
pub use self::orbit::{CartesianState, OrbitElements};

/// The ephemeris provider contract and the analytic providers.
mod provider;
pub use self::provider::{EphemerisProvider, FixedGeometryProvider, KeplerianProvider};

/// Ephemeris provider backed by SPICE kernels loaded in an ANISE almanac.
mod almanac;
pub use self::almanac::AlmanacProvider;

/// Sampled ephemeris of a single body over the run window.
mod track;
pub use self::track::EphemerisTrack;

/// The set of tracks of a run and the frame rotations.
mod ephemeris;
pub use self::ephemeris::Ephemeris;

/// Geometric shadow test.
mod eclipse;
pub use self::eclipse::out_of_shadow;
pub(crate) use self::eclipse::out_of_shadow_at;

/// Errors of the body catalogue and of the ephemeris layer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EphemerisError {
    #[snafu(display("unknown body `{name}`"))]
    UnknownBody { name: String },
    #[snafu(display("body `{name}` is not in the scope of this run"))]
    OutOfScope { name: String },
    #[snafu(display("the provider does not support {action}"))]
    Unsupported { action: String },
    #[snafu(display("ephemeris track of {name} requires at least two samples, got {samples}"))]
    TooFewSamples { name: String, samples: usize },
    #[snafu(display("almanac could not {action}: {source}"))]
    Almanac {
        action: &'static str,
        #[snafu(source(from(AlmanacError, Box::new)))]
        source: Box<AlmanacError>,
    },
    #[snafu(display("almanac could not {action}: {source}"))]
    Orientation {
        action: &'static str,
        #[snafu(source(from(OrientationError, Box::new)))]
        source: Box<OrientationError>,
    },
}
