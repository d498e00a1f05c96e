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

use crate::linalg::{Matrix3, Vector3};
use std::f64::consts::{PI, TAU};

/// Relative tolerance used by [`isclose`], identical to the usual `isclose` default.
pub const ISCLOSE_REL_TOL: f64 = 1e-9;

/// Returns whether two floats are equal within a relative tolerance of 1e-9 (and exactly equal at zero).
pub fn isclose(a: f64, b: f64) -> bool {
    isclose_tol(a, b, ISCLOSE_REL_TOL, 0.0)
}

/// Returns whether `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`.
pub fn isclose_tol(a: f64, b: f64, rel_tol: f64, abs_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= (rel_tol * a.abs().max(b.abs())).max(abs_tol)
}

/// Returns whether `a` and `b` are within `eps` of each other modulo `period`.
///
/// Reflexive, symmetric and insensitive to shifting either argument by a multiple of the period.
pub fn mod_close(a: f64, b: f64, period: f64, eps: f64) -> bool {
    let diff = (a - b).rem_euclid(period);
    diff <= eps || period - diff <= eps
}

/// Wraps an angle in radians into [0, 2π).
pub fn wrap_2pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid may return exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Unwraps a sequence of angles in radians so that it has no jump larger than π.
///
/// A drop of more than π between consecutive samples is a wrap of the angle and adds 2π to all
/// subsequent samples, a rise of more than π removes 2π.
pub fn unwrap_angles(angles: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(angles.len());
    let mut offset = 0.0;
    for (i, angle) in angles.iter().enumerate() {
        if i > 0 {
            let step = angle - angles[i - 1];
            if step < -PI {
                offset += TAU;
            } else if step > PI {
                offset -= TAU;
            }
        }
        unwrapped.push(angle + offset);
    }
    unwrapped
}

/// Converts a longitude and latitude (radians) and a radius into cartesian coordinates.
pub fn lonlat_to_xyz(lon: f64, lat: f64, radius: f64) -> Vector3<f64> {
    Vector3::new(
        radius * lat.cos() * lon.cos(),
        radius * lat.cos() * lon.sin(),
        radius * lat.sin(),
    )
}

/// Converts cartesian coordinates into (longitude in [0, 2π), latitude, radius).
pub fn xyz_to_lonlat(xyz: &Vector3<f64>) -> (f64, f64, f64) {
    let radius = xyz.norm();
    if radius == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let lon = wrap_2pi(xyz[1].atan2(xyz[0]));
    let lat = (xyz[2] / radius).clamp(-1.0, 1.0).asin();
    (lon, lat, radius)
}

/// Rotation matrix about the first axis, for a frame rotation of `angle` radians (passive rotation).
pub fn r1(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Rotation matrix about the second axis, for a frame rotation of `angle` radians (passive rotation).
pub fn r2(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

/// Rotation matrix about the third axis, for a frame rotation of `angle` radians (passive rotation).
pub fn r3(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Re-orthonormalizes a matrix which is close to a rotation matrix (e.g. after a linear interpolation).
///
/// The rows are orthonormalized with Gram-Schmidt, starting from the first row.
pub fn orthonormalize(m: &Matrix3<f64>) -> Matrix3<f64> {
    let x = m.row(0).transpose().normalize();
    let y_raw = m.row(1).transpose();
    let y = (y_raw - x * x.dot(&y_raw)).normalize();
    let z = x.cross(&y);
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

/// Returns the DCM whose rows are the provided unit vectors, i.e. the rotation into the frame with these axes.
pub fn dcm_from_axes(x: &Vector3<f64>, y: &Vector3<f64>, z: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}
