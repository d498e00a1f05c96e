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

use super::AccelModel;
use crate::cosmic::Ephemeris;
use crate::linalg::Vector3;
use std::fmt;
use std::sync::Arc;

/// Newtonian point mass gravity of the bodies of an ephemeris.
///
/// The Sun only pulls when it is the central body of the run: otherwise the model frame follows the central body
/// and the solar attraction is (to first order) already accounted for by its orbit.
#[derive(Clone, Debug)]
pub struct PointMasses {
    ephemeris: Arc<Ephemeris>,
    /// Indices of the attracting tracks
    bodies: Vec<usize>,
}

impl PointMasses {
    /// Gravity of every body of the ephemeris.
    pub fn new(ephemeris: Arc<Ephemeris>) -> Arc<Self> {
        let heliocentric = ephemeris.heliocentric();
        let bodies = ephemeris
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, track)| heliocentric || !track.body.is_star())
            .map(|(idx, _)| idx)
            .collect();
        Arc::new(Self { ephemeris, bodies })
    }

    /// Gravity of the named bodies only, which must be in the ephemeris.
    pub fn with_bodies(ephemeris: Arc<Ephemeris>, names: &[&str]) -> Arc<Self> {
        let bodies = ephemeris
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, track)| names.iter().any(|name| track.body.name.eq_ignore_ascii_case(name)))
            .map(|(idx, _)| idx)
            .collect();
        Arc::new(Self { ephemeris, bodies })
    }

    /// Specific potential energy of a packet at `x`, used to check energy conservation.
    pub fn potential(&self, t: f64, x: &Vector3<f64>) -> f64 {
        self.bodies
            .iter()
            .map(|&idx| {
                let track = &self.ephemeris.tracks()[idx];
                -track.gm / (track.position_at(t) - x).norm()
            })
            .sum()
    }
}

impl fmt::Display for PointMasses {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = self
            .bodies
            .iter()
            .map(|&idx| self.ephemeris.tracks()[idx].body.name)
            .collect();
        write!(f, "point mass gravity of {names:?}")
    }
}

impl AccelModel for PointMasses {
    fn eom(&self, t: f64, x: &Vector3<f64>, _v: &Vector3<f64>) -> Vector3<f64> {
        let mut accel = Vector3::zeros();
        for &idx in &self.bodies {
            let track = &self.ephemeris.tracks()[idx];
            let d = track.position_at(t) - x;
            let r = d.norm();
            accel += d * (track.gm / (r * r * r));
        }
        accel
    }
}

#[cfg(test)]
mod ut_gravity {
    use super::*;
    use crate::cosmic::{Body, KeplerianProvider};
    use crate::time::Epoch;
    use approx::assert_relative_eq;

    fn jovian() -> Arc<Ephemeris> {
        let jupiter = Body::from_name("Jupiter").unwrap();
        let io = Body::from_name("Io").unwrap();
        let provider = KeplerianProvider::new(Epoch::from_gregorian_utc_at_midnight(2000, 1, 1));
        Arc::new(
            Ephemeris::build(
                &provider,
                jupiter,
                &[io],
                Epoch::from_gregorian_utc_at_midnight(2020, 1, 1),
                3600.0,
                None,
            )
            .unwrap(),
        )
    }

    #[test]
    fn surface_gravity() {
        let ephem = jovian();
        let gravity = PointMasses::with_bodies(ephem.clone(), &["Jupiter"]);
        let x = Vector3::new(1.0, 0.0, 0.0);
        let accel = gravity.eom(0.0, &x, &Vector3::zeros());
        // g = GM / R² toward the centre, in R/s²
        let jupiter = ephem.central_track();
        assert_relative_eq!(accel.x, -jupiter.gm, max_relative = 1e-12);
        assert_relative_eq!(accel.y, 0.0);
        assert_relative_eq!(gravity.potential(0.0, &x), -jupiter.gm, max_relative = 1e-12);
    }

    #[test]
    fn moon_pulls_toward_itself() {
        let ephem = jovian();
        let all = PointMasses::new(ephem.clone());
        let jupiter_only = PointMasses::with_bodies(ephem.clone(), &["jupiter"]);
        let io = ephem.track("Io").unwrap();
        // Just outside the surface of Io, on the side facing away from Jupiter
        let pos = io.position_at(0.0);
        let x = pos + pos.normalize() * (io.radius * 1.01);
        let delta = all.eom(0.0, &x, &Vector3::zeros()) - jupiter_only.eom(0.0, &x, &Vector3::zeros());
        assert!(delta.dot(&pos) < 0.0);
        assert_relative_eq!(delta.norm(), io.gm / (io.radius * 1.01).powi(2), max_relative = 1e-9);
        assert!(format!("{all}").contains("Io"));
    }
}
