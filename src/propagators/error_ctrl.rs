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

use crate::PacketVector;

/// The Error Control trait manages how a propagator computes the error in the current step.
pub trait ErrorCtrl
where
    Self: Copy + Send + Sync,
{
    /// Computes the normalised error of a step from the error estimate `error_est` of the integrated state
    /// `(X, V, ln frac)` and the `candidate` state. A step is acceptable when the returned value is below one.
    fn estimate(error_est: &PacketVector, candidate: &PacketVector, resolution: f64) -> f64;

    /// Whether the surviving fraction grew by more than what the controller tolerates.
    ///
    /// Never true for fractions in `[0, 1]`: the surviving fraction is kept monotone by the clamp applied when a
    /// step is accepted, and this test only backstops that clamp.
    fn frac_increased(frac_new: f64, frac_old: f64, resolution: f64) -> bool {
        frac_new - frac_old > resolution + frac_new.abs()
    }
}

/// Root mean square of the error of the seven components, each scaled by the resolution of a run.
///
/// In natural units the scales are `res (1 + |X|)` for positions, `res / 10 (1 + |V|)` for velocities and
/// `res + frac` for the surviving fraction, whose error is estimated from that of its logarithm.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolutionScaled;

impl ErrorCtrl for ResolutionScaled {
    fn estimate(error_est: &PacketVector, candidate: &PacketVector, resolution: f64) -> f64 {
        let pos = candidate.fixed_rows::<3>(0).norm();
        let vel = candidate.fixed_rows::<3>(3).norm();
        let frac = candidate[6].exp();

        let scale_x = resolution * (1.0 + pos);
        let scale_v = resolution / 10.0 * (1.0 + vel);
        let scale_f = resolution + frac;

        let err_x = error_est.fixed_rows::<3>(0).norm_squared() / (scale_x * scale_x);
        let err_v = error_est.fixed_rows::<3>(3).norm_squared() / (scale_v * scale_v);
        let err_f = (frac * error_est[6] / scale_f).powi(2);
        ((err_x + err_v + err_f) / 7.0).sqrt()
    }
}
