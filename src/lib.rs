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

/*! # nyx-exosphere

Monte Carlo simulation of tenuous neutral exospheres around planets and moons.

Each simulated packet carries a statistical weight of atoms ejected from a source surface. Packets are
advanced with an adaptive Dormand-Prince integrator under the gravity of the bodies in scope and solar
radiation pressure, while losing weight to photoionisation, electron-impact ionisation and charge exchange.
The final ensemble is persisted for post-processing into column densities or radiances.
*/

/// Provides the Dormand-Prince integrator and the adaptive / fixed step drivers acting on packet batches.
pub mod propagators;

/// Provides the force and loss models evaluated at each integration stage, and the surface and escape bookkeeping.
pub mod dynamics;

/// Provides the body catalogue, the ephemeris providers, the sampled ephemeris tracks and the shadow test.
pub mod cosmic;

/// Atomic data tables: g-values, photoionisation rates, electron impact and charge exchange coefficients.
pub mod atomic;

/// Plasma models providing electron and ion densities, temperatures and flow velocities.
pub mod plasma;

/// Monte Carlo source sampling and the simulation driver across iterations.
pub mod mc;
pub use self::mc::Simulation;

/// Run inputs, the fingerprint index and the packet stores.
pub mod io;

/// Natural units of a run and the physical constants used to convert into them.
pub mod units;

/// Utility functions shared by different modules.
pub mod utils;

mod state;
pub use self::state::{BatchTotals, Packet, PacketBatch};

mod errors;
pub use self::errors::ExosphereError;

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Dimension of the integrated state of a packet: position (3), velocity (3) and the log of the surviving fraction.
pub const STATE_DIM: usize = 7;

/// Integrated state of a single packet, (X, V, log frac) in natural units.
pub type PacketVector = na::SVector<f64, STATE_DIM>;
