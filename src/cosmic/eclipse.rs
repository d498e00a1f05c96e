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

use super::EphemerisTrack;
use crate::linalg::Vector3;

/// Returns whether each point `x[i]` of the model frame, at offset `t[i]`, is lit by the Sun as far as `body` is
/// concerned.
///
/// A point is in the shadow of a body when it lies in the anti-solar half space of the body and within one body
/// radius of the body-Sun line, i.e. inside the half cylinder behind the body. A star never casts a shadow.
pub fn out_of_shadow(body: &EphemerisTrack, t: &[f64], x: &[Vector3<f64>]) -> Vec<bool> {
    t.iter()
        .zip(x)
        .map(|(&ti, xi)| out_of_shadow_at(body, ti, xi))
        .collect()
}

pub(crate) fn out_of_shadow_at(body: &EphemerisTrack, t: f64, x: &Vector3<f64>) -> bool {
    if body.body.is_star() {
        return true;
    }
    let d = x - body.position_at(t);
    let s = body.sun_dir_at(t);
    let along = d.dot(&s);
    if along >= 0.0 {
        return true;
    }
    // |d| sin θ is the distance to the body-Sun line
    let perp2 = d.norm_squared() - along * along;
    perp2 >= body.radius * body.radius
}

#[cfg(test)]
mod ut_eclipse {
    use super::*;
    use crate::cosmic::{Body, FixedGeometryProvider};
    use crate::time::Epoch;
    use crate::units::ModelUnits;

    #[test]
    fn shadow_cylinder() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let mercury = Body::from_name("Mercury").unwrap();
        let provider = FixedGeometryProvider::new(mercury, 0.0, &[], (0.0, 0.0), epoch).unwrap();
        let units = ModelUnits::for_body(mercury);
        let track = EphemerisTrack::sample(&provider, mercury, mercury, epoch, 100.0, 2, &units).unwrap();
        let sun = EphemerisTrack::sample(&provider, Body::sun(), mercury, epoch, 100.0, 2, &units).unwrap();

        let points = [
            Vector3::new(-2.0, 0.0, 0.0),
            Vector3::new(-20.0, 0.9, 0.0),
            Vector3::new(-2.0, 1.1, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.5),
        ];
        let t = [-50.0; 5];
        assert_eq!(
            out_of_shadow(&track, &t, &points),
            vec![false, false, true, true, true]
        );
        assert!(out_of_shadow(&sun, &t, &points).iter().all(|&lit| lit));
    }
}
