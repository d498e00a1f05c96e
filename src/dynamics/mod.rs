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

use crate::atomic::AtomicDataError;
use crate::cosmic::EphemerisError;
use crate::linalg::Vector3;
use crate::state::PacketBatch;
use crate::PacketVector;
use snafu::Snafu;

use std::fmt;

/// Point mass gravity of every body in scope.
pub mod gravity;
pub use self::gravity::*;

/// Radiation pressure from velocity dependent g-values, gated by the shadows of the bodies.
pub mod solarpressure;
pub use self::solarpressure::*;

/// Ionisation losses: constant lifetime, or photoionisation, electron impact and charge exchange.
pub mod loss;
pub use self::loss::*;

/// Surface interaction of packets hitting a body.
pub mod surface;
pub use self::surface::*;

/// Dynamics of the packets of a run, combining the above with the escape test.
pub mod packet;
pub use self::packet::*;

/// A trait for models with equations of motion that can be integrated on a batch of packets.
///
/// Each packet is integrated in `(X, V, ln frac)`: the derivative of the last component is minus the loss rate so
/// that an exponential decay of the surviving fraction is linear in the integrated state.
pub trait Dynamics: Send + Sync {
    /// Defines the equations of motion of every packet `y[i]` at its own offset `t[i]` to the end of the run.
    fn eom(&self, t: &[f64], y: &[PacketVector]) -> Result<Vec<PacketVector>, DynamicsError>;

    /// Performs final changes to packet `i` of `batch` after each accepted step of length `step`.
    ///
    /// This is where surface collisions and escapes are accounted for.
    fn finally(&self, batch: &mut PacketBatch, i: usize, step: f64) -> Result<(), DynamicsError>;

    /// Names of the bodies a packet may land on, in the order of the hit fractions of a [`PacketBatch`].
    fn hit_bodies(&self) -> Vec<String>;
}

/// A trait for immutable dynamics that return an acceleration in natural units (e.g. gravity, radiation pressure).
pub trait AccelModel: Send + Sync + fmt::Display {
    /// Acceleration of a packet at position `x` with velocity `v`, at offset `t` to the end of the run.
    fn eom(&self, t: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64>;
}

/// Dynamical model errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// An acceleration or a loss rate is NaN or infinite.
    #[snafu(display("{quantity} of packet {index} is not finite"))]
    NonFinite { index: usize, quantity: &'static str },
    #[snafu(display("dynamical model is missing atomic data: {source}"))]
    DynamicsAtomicData { source: AtomicDataError },
    #[snafu(display("dynamical model encountered an ephemeris issue: {source}"))]
    DynamicsEphemeris { source: EphemerisError },
    #[snafu(display("invalid dynamical model: {msg}"))]
    DynamicsConfig { msg: String },
}
