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

use super::{DynamicsConfigSnafu, DynamicsError};
use crate::linalg::Vector3;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// Fate of a packet reaching the surface of a body.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SurfaceInteraction {
    /// A constant share of the weight sticks; the rest bounces back specularly, its speed reduced by the thermal
    /// accommodation with the surface.
    Constant { stickcoef: f64, accomfactor: f64 },
}

impl Default for SurfaceInteraction {
    fn default() -> Self {
        Self::Constant {
            stickcoef: 1.0,
            accomfactor: 0.0,
        }
    }
}

impl SurfaceInteraction {
    pub fn constant(stickcoef: f64, accomfactor: f64) -> Result<Self, DynamicsError> {
        ensure!(
            (0.0..=1.0).contains(&stickcoef),
            DynamicsConfigSnafu {
                msg: format!("sticking coefficient must be in [0, 1], got {stickcoef}")
            }
        );
        ensure!(
            (0.0..=1.0).contains(&accomfactor),
            DynamicsConfigSnafu {
                msg: format!("accommodation factor must be in [0, 1], got {accomfactor}")
            }
        );
        Ok(Self::Constant {
            stickcoef,
            accomfactor,
        })
    }

    /// Share of the weight deposited on the surface at each contact.
    pub fn stickcoef(&self) -> f64 {
        match self {
            Self::Constant { stickcoef, .. } => *stickcoef,
        }
    }

    /// Velocity, relative to the body, of the part leaving a surface point of outward normal `normal` after hitting
    /// it with `v_in`.
    pub fn reemit(&self, v_in: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Self::Constant { accomfactor, .. } => {
                let reflected = v_in - normal * (2.0 * v_in.dot(normal));
                reflected * (1.0 - accomfactor).sqrt()
            }
        }
    }
}

impl fmt::Display for SurfaceInteraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Constant {
                stickcoef,
                accomfactor,
            } => write!(f, "constant sticking {stickcoef} (accommodation {accomfactor})"),
        }
    }
}

/// Time elapsed since a packet, now at `d` from the centre of a sphere of radius `radius` with relative velocity `v`,
/// crossed the surface moving in a straight line.
///
/// This is the larger root of `|d - v Δ|² = radius²`, clamped to `[0, max_back]`.
pub fn time_since_crossing(d: &Vector3<f64>, v: &Vector3<f64>, radius: f64, max_back: f64) -> f64 {
    let vv = v.norm_squared();
    if vv == 0.0 {
        return 0.0;
    }
    let dv = d.dot(v);
    let disc = (dv * dv - vv * (d.norm_squared() - radius * radius)).max(0.0);
    ((dv + disc.sqrt()) / vv).clamp(0.0, max_back.max(0.0))
}

#[cfg(test)]
mod ut_surface {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn crossing_time() {
        // Falling straight down at 1 R/s, now 0.1 R under the surface
        let d = Vector3::new(0.9, 0.0, 0.0);
        let v = Vector3::new(-1.0, 0.0, 0.0);
        assert_relative_eq!(time_since_crossing(&d, &v, 1.0, 10.0), 0.1, epsilon = 1e-12);
        // Never further back than the step
        assert_relative_eq!(time_since_crossing(&d, &v, 1.0, 0.05), 0.05);
        // Grazing chord: crossing at y = -sqrt(1 - 0.25)
        let d = Vector3::new(0.5, 0.0, 0.0);
        let v = Vector3::new(0.0, 2.0, 0.0);
        assert_relative_eq!(time_since_crossing(&d, &v, 1.0, 10.0), 0.75f64.sqrt() / 2.0, epsilon = 1e-12);
        assert_eq!(time_since_crossing(&d, &Vector3::zeros(), 1.0, 10.0), 0.0);
    }

    #[test]
    fn specular_reemission() {
        let surface = SurfaceInteraction::constant(0.5, 0.75).unwrap();
        let out = surface.reemit(&Vector3::new(-1.0, 1.0, 0.0), &Vector3::x());
        assert_relative_eq!(out, Vector3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert_eq!(surface.stickcoef(), 0.5);
        assert!(SurfaceInteraction::constant(1.5, 0.0).is_err());
        assert!(SurfaceInteraction::constant(0.5, -0.1).is_err());
    }

    #[test]
    fn from_yaml() {
        let surface: SurfaceInteraction =
            serde_yaml::from_str("type: constant\nstickcoef: 0.3\naccomfactor: 0.1").unwrap();
        assert_eq!(surface, SurfaceInteraction::constant(0.3, 0.1).unwrap());
        assert_eq!(SurfaceInteraction::default().stickcoef(), 1.0);
    }
}
