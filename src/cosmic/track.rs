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

use super::{Body, EphemerisError, EphemerisProvider, Frame, TooFewSamplesSnafu};
use crate::linalg::{Matrix3, Vector3};
use crate::time::{Epoch, Unit};
use crate::units::{ModelUnits, AU_KM};
use crate::utils::{dcm_from_axes, orthonormalize, unwrap_angles, wrap_2pi};
use snafu::ensure;
use std::fmt;

/// Sampled ephemeris of one body over the run window, expressed in the model frame of the run.
///
/// Samples are stored by their signed offset to the end of the run (0 = end, negative = earlier). Every getter
/// linearly interpolates the samples and clamps the requested offsets to the stored window. Angles are stored
/// unwrapped and reduced modulo 2π on output.
#[derive(Clone, Debug)]
pub struct EphemerisTrack {
    pub body: &'static Body,
    /// Radius of the body in natural units
    pub radius: f64,
    /// Gravitational parameter of the body in natural units
    pub gm: f64,
    times: Vec<f64>,
    position: Vec<Vector3<f64>>,
    velocity: Vec<Vector3<f64>>,
    r_sun_au: Vec<f64>,
    drdt_sun: Vec<f64>,
    sun_dir: Vec<Vector3<f64>>,
    model_from_j2000: Vec<Matrix3<f64>>,
    iau_from_j2000: Vec<Matrix3<f64>>,
    taa: Vec<f64>,
    phi: Vec<f64>,
    subsolar_lon: Vec<f64>,
    subsolar_lat: Vec<f64>,
}

/// Rotation from J2000 to the model axes of a run centred on `central`, computed from heliocentric states.
pub(crate) fn model_rotation(
    provider: &dyn EphemerisProvider,
    central: &Body,
    epoch: Epoch,
) -> Result<Matrix3<f64>, EphemerisError> {
    let planet = match central.planet() {
        Some(planet) => planet,
        None => return Ok(Matrix3::identity()),
    };
    let central_state = provider.state(central, epoch, Frame::J2000)?;
    let planet_state = provider.state(planet, epoch, Frame::J2000)?;
    let xhat = -central_state.position_km.normalize();
    let zhat = planet_state.hvec().normalize();
    let yhat = zhat.cross(&xhat).normalize();
    let zhat = xhat.cross(&yhat);
    Ok(dcm_from_axes(&xhat, &yhat, &zhat))
}

impl EphemerisTrack {
    /// Samples `provider` at `n_samples` uniformly spaced epochs over `[end_epoch - runtime_s, end_epoch]`.
    pub fn sample(
        provider: &dyn EphemerisProvider,
        body: &'static Body,
        central: &'static Body,
        end_epoch: Epoch,
        runtime_s: f64,
        n_samples: usize,
        units: &ModelUnits,
    ) -> Result<Self, EphemerisError> {
        ensure!(
            n_samples >= 2,
            TooFewSamplesSnafu {
                name: body.name,
                samples: n_samples
            }
        );

        let mut track = Self {
            body,
            radius: units.from_km(body.radius_km),
            gm: units.from_gm(body.gm_km3_s2),
            times: Vec::with_capacity(n_samples),
            position: Vec::with_capacity(n_samples),
            velocity: Vec::with_capacity(n_samples),
            r_sun_au: Vec::with_capacity(n_samples),
            drdt_sun: Vec::with_capacity(n_samples),
            sun_dir: Vec::with_capacity(n_samples),
            model_from_j2000: Vec::with_capacity(n_samples),
            iau_from_j2000: Vec::with_capacity(n_samples),
            taa: Vec::with_capacity(n_samples),
            phi: Vec::with_capacity(n_samples),
            subsolar_lon: Vec::with_capacity(n_samples),
            subsolar_lat: Vec::with_capacity(n_samples),
        };

        let spacing = runtime_s / (n_samples - 1) as f64;
        for k in 0..n_samples {
            // The last sample is exactly the end of the run
            let offset = if k == n_samples - 1 {
                0.0
            } else {
                -runtime_s + k as f64 * spacing
            };
            let epoch = end_epoch + offset * Unit::Second;

            let dcm = model_rotation(provider, central, epoch)?;
            let central_state = provider.state(central, epoch, Frame::J2000)?;
            let body_state = provider.state(body, epoch, Frame::J2000)?;

            track.times.push(offset);
            track.model_from_j2000.push(dcm);
            track
                .iau_from_j2000
                .push(provider.frame_rotation(Frame::J2000, Frame::Iau(body.naif_id), epoch)?);

            if body.is_star() {
                track.position.push(Vector3::zeros());
                track.velocity.push(Vector3::zeros());
                track.r_sun_au.push(0.0);
                track.drdt_sun.push(0.0);
                track.sun_dir.push(Vector3::zeros());
                track.taa.push(0.0);
                track.phi.push(0.0);
                track.subsolar_lon.push(0.0);
                track.subsolar_lat.push(0.0);
                continue;
            }

            let relative = body_state - central_state;
            track.position.push(units.vec_from_km(&(dcm * relative.position_km)));
            track.velocity.push(units.vec_from_km(&(dcm * relative.velocity_km_s)));
            track.r_sun_au.push(body_state.rmag_km() / AU_KM);
            track.drdt_sun.push(units.from_km_s(body_state.rdot_km_s()));
            track.sun_dir.push(dcm * -body_state.position_km.normalize());

            let taa = match body.planet() {
                Some(planet) => provider.orbit_elements(planet, epoch)?.taa,
                None => 0.0,
            };
            track.taa.push(taa);

            let phi = match body.parent_body() {
                Some(parent) if body.is_moon() => {
                    let parent_state = provider.state(parent, epoch, Frame::J2000)?;
                    let rel = dcm * (body_state.position_km - parent_state.position_km);
                    (-rel.y).atan2(-rel.x)
                }
                _ => 0.0,
            };
            track.phi.push(wrap_2pi(phi));

            let (lon, lat) = provider.subsolar_point(body, epoch)?;
            track.subsolar_lon.push(lon);
            track.subsolar_lat.push(lat);
        }

        track.taa = unwrap_angles(&track.taa);
        track.phi = unwrap_angles(&track.phi);
        track.subsolar_lon = unwrap_angles(&track.subsolar_lon);

        debug!(
            "sampled {} over {runtime_s} s with {n_samples} samples ({provider})",
            body.name
        );
        Ok(track)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First and last stored offsets, in seconds
    pub fn window(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// Index of the sample at or before `t` and the interpolation weight of the next sample, clamped to the window.
    fn locate(&self, t: f64) -> (usize, f64) {
        let (first, last) = self.window();
        if t.is_nan() || t <= first {
            return (0, 0.0);
        }
        if t >= last {
            return (self.times.len() - 2, 1.0);
        }
        let idx = self.times.partition_point(|&ti| ti <= t).saturating_sub(1);
        let idx = idx.min(self.times.len() - 2);
        let w = (t - self.times[idx]) / (self.times[idx + 1] - self.times[idx]);
        (idx, w)
    }

    fn lerp(samples: &[f64], (i, w): (usize, f64)) -> f64 {
        samples[i] + w * (samples[i + 1] - samples[i])
    }

    fn lerp_vec(samples: &[Vector3<f64>], (i, w): (usize, f64)) -> Vector3<f64> {
        samples[i] + (samples[i + 1] - samples[i]) * w
    }

    fn lerp_mat(samples: &[Matrix3<f64>], (i, w): (usize, f64)) -> Matrix3<f64> {
        if w == 0.0 {
            samples[i]
        } else if w == 1.0 {
            samples[i + 1]
        } else {
            orthonormalize(&(samples[i] + (samples[i + 1] - samples[i]) * w))
        }
    }

    pub fn position_at(&self, t: f64) -> Vector3<f64> {
        Self::lerp_vec(&self.position, self.locate(t))
    }

    pub fn velocity_at(&self, t: f64) -> Vector3<f64> {
        Self::lerp_vec(&self.velocity, self.locate(t))
    }

    /// Heliocentric distance of the body, in AU
    pub fn r_sun_au_at(&self, t: f64) -> f64 {
        Self::lerp(&self.r_sun_au, self.locate(t))
    }

    /// Heliocentric radial velocity of the body, in natural units
    pub fn drdt_sun_at(&self, t: f64) -> f64 {
        Self::lerp(&self.drdt_sun, self.locate(t))
    }

    /// Unit vector from the body toward the Sun, in the model frame (zero for the Sun itself)
    pub fn sun_dir_at(&self, t: f64) -> Vector3<f64> {
        let dir = Self::lerp_vec(&self.sun_dir, self.locate(t));
        let norm = dir.norm();
        if norm > 0.0 {
            dir / norm
        } else {
            dir
        }
    }

    pub fn model_from_j2000_at(&self, t: f64) -> Matrix3<f64> {
        Self::lerp_mat(&self.model_from_j2000, self.locate(t))
    }

    /// Rotation from J2000 to the body-fixed frame of the body
    pub fn iau_from_j2000_at(&self, t: f64) -> Matrix3<f64> {
        Self::lerp_mat(&self.iau_from_j2000, self.locate(t))
    }

    pub fn taa_at(&self, t: f64) -> f64 {
        wrap_2pi(Self::lerp(&self.taa, self.locate(t)))
    }

    pub fn phi_at(&self, t: f64) -> f64 {
        wrap_2pi(Self::lerp(&self.phi, self.locate(t)))
    }

    pub fn subsolar_lon_at(&self, t: f64) -> f64 {
        wrap_2pi(Self::lerp(&self.subsolar_lon, self.locate(t)))
    }

    pub fn subsolar_lat_at(&self, t: f64) -> f64 {
        Self::lerp(&self.subsolar_lat, self.locate(t))
    }

    pub fn position(&self, t: &[f64]) -> Vec<Vector3<f64>> {
        t.iter().map(|&ti| self.position_at(ti)).collect()
    }

    pub fn velocity(&self, t: &[f64]) -> Vec<Vector3<f64>> {
        t.iter().map(|&ti| self.velocity_at(ti)).collect()
    }

    pub fn r_sun_au(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.r_sun_au_at(ti)).collect()
    }

    pub fn drdt_sun(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.drdt_sun_at(ti)).collect()
    }

    pub fn sun_dir(&self, t: &[f64]) -> Vec<Vector3<f64>> {
        t.iter().map(|&ti| self.sun_dir_at(ti)).collect()
    }

    pub fn model_from_j2000(&self, t: &[f64]) -> Vec<Matrix3<f64>> {
        t.iter().map(|&ti| self.model_from_j2000_at(ti)).collect()
    }

    pub fn taa(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.taa_at(ti)).collect()
    }

    pub fn phi(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.phi_at(ti)).collect()
    }

    pub fn subsolar_lon(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.subsolar_lon_at(ti)).collect()
    }

    pub fn subsolar_lat(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.subsolar_lat_at(ti)).collect()
    }
}

impl fmt::Display for EphemerisTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (first, last) = self.window();
        write!(
            f,
            "{} track over [{first}, {last}] s ({} samples)",
            self.body.name,
            self.len()
        )
    }
}
