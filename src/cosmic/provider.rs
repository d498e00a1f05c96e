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

use super::{Body, CartesianState, EphemerisError, Frame, OrbitElements, UnknownBodySnafu};
use crate::linalg::{Matrix3, Vector3};
use crate::time::Epoch;
use crate::utils::{dcm_from_axes, r1, r2, r3, xyz_to_lonlat};
use snafu::ensure;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fmt;

/// Source of the absolute geometry of the solar system.
///
/// States are heliocentric, in km and km/s. The core queries a provider once per run when building the ephemeris
/// tracks, so implementations may be slow.
pub trait EphemerisProvider: Send + Sync + fmt::Display {
    /// Heliocentric state of `body` at `epoch`, expressed in the axes of `frame`.
    fn state(&self, body: &Body, epoch: Epoch, frame: Frame) -> Result<CartesianState, EphemerisError>;

    /// Rotation matrix such that `v_to = M * v_from`.
    fn frame_rotation(&self, from: Frame, to: Frame, epoch: Epoch) -> Result<Matrix3<f64>, EphemerisError>;

    /// Osculating heliocentric elements of `body` at `epoch`.
    fn orbit_elements(&self, body: &Body, epoch: Epoch) -> Result<OrbitElements, EphemerisError> {
        let state = self.state(body, epoch, Frame::J2000)?;
        Ok(state.orbit_elements(Body::sun().gm_km3_s2 + body.gm_km3_s2))
    }

    /// Longitude and latitude in radians of the point of `body` below the Sun, in its body-fixed frame.
    fn subsolar_point(&self, body: &Body, epoch: Epoch) -> Result<(f64, f64), EphemerisError> {
        if body.is_star() {
            return Ok((0.0, 0.0));
        }
        let to_sun = -self.state(body, epoch, Frame::J2000)?.position_km;
        let dcm = self.frame_rotation(Frame::J2000, Frame::Iau(body.naif_id), epoch)?;
        let (lon, lat, _) = xyz_to_lonlat(&(dcm * to_sun));
        Ok((lon, lat))
    }
}

/// Expresses a J2000 state in `frame`, without the transport velocity of a rotating frame.
fn rotate_state<P: EphemerisProvider + ?Sized>(
    provider: &P,
    state: CartesianState,
    frame: Frame,
    epoch: Epoch,
) -> Result<CartesianState, EphemerisError> {
    match frame {
        Frame::J2000 => Ok(state),
        _ => {
            let dcm = provider.frame_rotation(Frame::J2000, frame, epoch)?;
            Ok(CartesianState::new(
                dcm * state.position_km,
                dcm * state.velocity_km_s,
            ))
        }
    }
}

/// Solves Kepler's equation for the eccentric anomaly by Newton iterations.
fn eccentric_anomaly(mean_anomaly: f64, ecc: f64) -> f64 {
    let m = mean_anomaly.rem_euclid(TAU);
    let mut ea = if ecc > 0.8 { std::f64::consts::PI } else { m };
    for _ in 0..50 {
        let delta = (ea - ecc * ea.sin() - m) / (1.0 - ecc * ea.cos());
        ea -= delta;
        if delta.abs() < 1e-14 {
            break;
        }
    }
    ea
}

/// State on a planar orbit of the x-y plane with periapsis along +x, for a true anomaly `taa`.
/// A negative `sense` flips the orbit to retrograde.
fn planar_state(sma_km: f64, ecc: f64, gm: f64, taa: f64, sense: f64) -> CartesianState {
    let p = sma_km * (1.0 - ecc * ecc);
    let r = p / (1.0 + ecc * taa.cos());
    let k = (gm / p).sqrt();
    CartesianState::new(
        Vector3::new(r * taa.cos(), sense * r * taa.sin(), 0.0),
        Vector3::new(-k * taa.sin(), sense * k * (ecc + taa.cos()), 0.0),
    )
}

fn true_anomaly(sma_km: f64, ecc: f64, gm: f64, dt_s: f64) -> f64 {
    let n = (gm / sma_km.powi(3)).sqrt();
    let ea = eccentric_anomaly(n * dt_s, ecc);
    2.0 * ((1.0 + ecc).sqrt() * (ea / 2.0).sin()).atan2((1.0 - ecc).sqrt() * (ea / 2.0).cos())
}

/// Rotation from J2000 to a uniformly spinning body-fixed frame whose pole is tilted about the x axis.
fn spin_rotation(body: &Body, dt_s: f64) -> Matrix3<f64> {
    if body.rotation_period_s == 0.0 {
        return Matrix3::identity();
    }
    let w = TAU * dt_s / body.rotation_period_s;
    r3(w) * r1(body.tilt_deg.to_radians())
}

/// Analytic, coplanar two-body ephemeris built from the body catalogue.
///
/// Every orbit lies in the J2000 x-y plane with its periapsis along +x and mean anomaly zero at the reference
/// epoch. Moons orbit their parent. Body-fixed frames spin uniformly about a pole tilted about the x axis.
#[derive(Copy, Clone, Debug)]
pub struct KeplerianProvider {
    pub reference_epoch: Epoch,
}

impl KeplerianProvider {
    pub fn new(reference_epoch: Epoch) -> Self {
        Self { reference_epoch }
    }

    fn relative_state(&self, body: &Body, epoch: Epoch) -> Result<CartesianState, EphemerisError> {
        let parent = match body.parent_body() {
            Some(parent) => parent,
            None => return Ok(CartesianState::zero()),
        };
        let gm = parent.gm_km3_s2 + body.gm_km3_s2;
        let dt = (epoch - self.reference_epoch).to_seconds();
        let nu = true_anomaly(body.semi_major_axis_km, body.eccentricity, gm, dt);
        Ok(planar_state(
            body.semi_major_axis_km,
            body.eccentricity,
            gm,
            nu,
            body.orbital_period_s.signum(),
        ))
    }

    fn j2000_state(&self, body: &Body, epoch: Epoch) -> Result<CartesianState, EphemerisError> {
        let relative = self.relative_state(body, epoch)?;
        match body.parent_body() {
            Some(parent) if !parent.is_star() => Ok(self.j2000_state(parent, epoch)? + relative),
            _ => Ok(relative),
        }
    }

    fn iau_from_j2000(&self, naif_id: i32, epoch: Epoch) -> Result<Matrix3<f64>, EphemerisError> {
        let body = Body::from_naif_id(naif_id)?;
        Ok(spin_rotation(body, (epoch - self.reference_epoch).to_seconds()))
    }
}

impl EphemerisProvider for KeplerianProvider {
    fn state(&self, body: &Body, epoch: Epoch, frame: Frame) -> Result<CartesianState, EphemerisError> {
        let state = self.j2000_state(body, epoch)?;
        rotate_state(self, state, frame, epoch)
    }

    fn frame_rotation(&self, from: Frame, to: Frame, epoch: Epoch) -> Result<Matrix3<f64>, EphemerisError> {
        let to_j2000 = |frame: Frame| -> Result<Matrix3<f64>, EphemerisError> {
            match frame {
                Frame::J2000 => Ok(Matrix3::identity()),
                Frame::Iau(id) => Ok(self.iau_from_j2000(id, epoch)?.transpose()),
            }
        };
        if from == to {
            return Ok(Matrix3::identity());
        }
        Ok(to_j2000(to)?.transpose() * to_j2000(from)?)
    }
}

impl fmt::Display for KeplerianProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Keplerian ephemeris (reference {})", self.reference_epoch)
    }
}

/// Stationary geometry of a planetary system, used when a run is defined by angles instead of a date.
///
/// The planet of the system sits at the heliocentric distance of the requested true anomaly and keeps the
/// corresponding orbital velocity (so its heliocentric radial velocity is right) without moving. Its moons move on
/// circular orbits starting at the requested orbital phases at the reference epoch. The body-fixed frame of the
/// central body is frozen with the Sun at the requested subsolar point; synchronously rotating moons keep their
/// prime meridian toward the planet.
#[derive(Clone, Debug)]
pub struct FixedGeometryProvider {
    pub central: &'static Body,
    pub planet: &'static Body,
    /// True anomaly of the planet, in radians
    pub taa: f64,
    /// Orbital phase of each moon at the reference epoch, in radians, measured from the anti-Sun line
    pub phases: HashMap<&'static str, f64>,
    /// Longitude and latitude of the subsolar point of the central body, in radians
    pub subsolar_point: (f64, f64),
    pub reference_epoch: Epoch,
}

impl FixedGeometryProvider {
    /// Builds the provider. `phases` is in the order of the planet's satellites; missing phases default to zero.
    pub fn new(
        central: &'static Body,
        taa: f64,
        phases: &[f64],
        subsolar_point: (f64, f64),
        reference_epoch: Epoch,
    ) -> Result<Self, EphemerisError> {
        let planet = central.planet().ok_or_else(|| EphemerisError::Unsupported {
            action: format!("a time-free geometry centred on {central}"),
        })?;
        let phases = planet
            .satellites
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, phases.get(i).copied().unwrap_or(0.0)))
            .collect();
        Ok(Self {
            central,
            planet,
            taa,
            phases,
            subsolar_point,
            reference_epoch,
        })
    }

    fn planet_state(&self) -> CartesianState {
        let gm = Body::sun().gm_km3_s2 + self.planet.gm_km3_s2;
        planar_state(
            self.planet.semi_major_axis_km,
            self.planet.eccentricity,
            gm,
            self.taa,
            1.0,
        )
    }

    /// Position unit vector of the planet and the in-plane direction of motion for circular orbits
    fn planet_axes(&self) -> (Vector3<f64>, Vector3<f64>) {
        let rhat = self.planet_state().position_km.normalize();
        (rhat, Vector3::z().cross(&rhat))
    }

    /// J2000 to model axes of the system, which do not move in this geometry
    fn model_from_j2000(&self) -> Matrix3<f64> {
        let (rhat, that) = self.planet_axes();
        dcm_from_axes(&-rhat, &-that, &Vector3::z())
    }

    fn moon_relative_state(&self, moon: &Body, epoch: Epoch) -> Result<CartesianState, EphemerisError> {
        let phase0 = self
            .phases
            .get(moon.name)
            .copied()
            .ok_or_else(|| EphemerisError::OutOfScope {
                name: moon.name.to_string(),
            })?;
        let n = moon.mean_motion();
        let phase = phase0 + n * (epoch - self.reference_epoch).to_seconds();
        let (rhat, that) = self.planet_axes();
        let a = moon.semi_major_axis_km;
        Ok(CartesianState::new(
            (rhat * phase.cos() + that * phase.sin()) * a,
            (-rhat * phase.sin() + that * phase.cos()) * a * n,
        ))
    }

    fn iau_from_j2000(&self, naif_id: i32, epoch: Epoch) -> Result<Matrix3<f64>, EphemerisError> {
        let body = Body::from_naif_id(naif_id)?;
        if body.is_star() {
            return Ok(Matrix3::identity());
        }
        let synchronous = body.is_moon()
            && (body.rotation_period_s - body.orbital_period_s).abs() < 1e-6 * body.orbital_period_s.abs();
        if synchronous && body.name != self.central.name {
            let relative = self.moon_relative_state(body, epoch)?;
            let xhat = -relative.position_km.normalize();
            let zhat = Vector3::z() * body.orbital_period_s.signum();
            let yhat = zhat.cross(&xhat);
            return Ok(dcm_from_axes(&xhat, &yhat, &zhat));
        }
        let (lon, lat) = if body.name == self.central.name {
            self.subsolar_point
        } else {
            (0.0, 0.0)
        };
        // Active rotation bringing the Sun direction (model x axis) onto the subsolar point
        let iau_from_model = r3(lon).transpose() * r2(-lat).transpose();
        Ok(iau_from_model * self.model_from_j2000())
    }
}

impl EphemerisProvider for FixedGeometryProvider {
    fn state(&self, body: &Body, epoch: Epoch, frame: Frame) -> Result<CartesianState, EphemerisError> {
        let state = if body.is_star() {
            CartesianState::zero()
        } else if body.name == self.planet.name {
            self.planet_state()
        } else {
            ensure!(
                body.parent == Some(self.planet.name),
                UnknownBodySnafu {
                    name: format!("{body} (not in the {} system)", self.planet)
                }
            );
            let planet = self.planet_state();
            let relative = self.moon_relative_state(body, epoch)?;
            CartesianState::new(
                planet.position_km + relative.position_km,
                planet.velocity_km_s + relative.velocity_km_s,
            )
        };
        rotate_state(self, state, frame, epoch)
    }

    fn frame_rotation(&self, from: Frame, to: Frame, epoch: Epoch) -> Result<Matrix3<f64>, EphemerisError> {
        if from == to {
            return Ok(Matrix3::identity());
        }
        let from_j2000 = |frame: Frame| -> Result<Matrix3<f64>, EphemerisError> {
            match frame {
                Frame::J2000 => Ok(Matrix3::identity()),
                Frame::Iau(id) => self.iau_from_j2000(id, epoch),
            }
        };
        Ok(from_j2000(to)? * from_j2000(from)?.transpose())
    }

    /// Every body of the system reports the elements of the planet, which do not change with time.
    fn orbit_elements(&self, _body: &Body, _epoch: Epoch) -> Result<OrbitElements, EphemerisError> {
        let gm = Body::sun().gm_km3_s2 + self.planet.gm_km3_s2;
        Ok(self.planet_state().orbit_elements(gm))
    }

    fn subsolar_point(&self, body: &Body, epoch: Epoch) -> Result<(f64, f64), EphemerisError> {
        if body.name == self.central.name {
            return Ok(self.subsolar_point);
        }
        if body.is_star() {
            return Ok((0.0, 0.0));
        }
        let to_sun = -self.state(body, epoch, Frame::J2000)?.position_km;
        let dcm = self.frame_rotation(Frame::J2000, Frame::Iau(body.naif_id), epoch)?;
        let (lon, lat, _) = xyz_to_lonlat(&(dcm * to_sun));
        Ok((lon, lat))
    }
}

impl fmt::Display for FixedGeometryProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "fixed geometry of {} (taa = {:.2} deg, subsolar = ({:.2}, {:.2}) deg)",
            self.planet,
            self.taa.to_degrees(),
            self.subsolar_point.0.to_degrees(),
            self.subsolar_point.1.to_degrees()
        )
    }
}

#[cfg(test)]
mod ut_provider {
    use super::*;
    use crate::time::{Epoch, Unit};
    use crate::utils::lonlat_to_xyz;
    use approx::assert_relative_eq;

    #[test]
    fn kepler_equation() {
        for ecc in [0.0, 0.2, 0.7, 0.95] {
            for m in [0.1, 1.0, 3.0, 5.5] {
                let ea = eccentric_anomaly(m, ecc);
                assert_relative_eq!(ea - ecc * ea.sin(), m, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn keplerian_mercury() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let provider = KeplerianProvider::new(epoch);
        let mercury = Body::from_name("Mercury").unwrap();

        let at_peri = provider.orbit_elements(mercury, epoch).unwrap();
        assert_relative_eq!(at_peri.sma_km, mercury.semi_major_axis_km, max_relative = 1e-9);
        assert_relative_eq!(at_peri.ecc, mercury.eccentricity, max_relative = 1e-9);
        assert!(at_peri.taa < 1e-9 || TAU - at_peri.taa < 1e-9);

        let later = epoch + 20 * Unit::Day;
        let state = provider.state(mercury, later, Frame::J2000).unwrap();
        assert!(state.position_km.z.abs() < 1e-6);
        let elements = provider.orbit_elements(mercury, later).unwrap();
        assert!(elements.taa > 0.5 && elements.taa < 2.0);
    }

    #[test]
    fn keplerian_rotations_are_inverse() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let provider = KeplerianProvider::new(epoch);
        let t = epoch + 3 * Unit::Hour;
        let fwd = provider.frame_rotation(Frame::J2000, Frame::Iau(599), t).unwrap();
        let back = provider.frame_rotation(Frame::Iau(599), Frame::J2000, t).unwrap();
        assert_relative_eq!(fwd * back, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn fixed_geometry_subsolar_point() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let mercury = Body::from_name("Mercury").unwrap();
        let lon = 30.0_f64.to_radians();
        let lat = 5.0_f64.to_radians();
        let provider =
            FixedGeometryProvider::new(mercury, 1.0, &[], (lon, lat), epoch).unwrap();

        let to_sun = -provider.state(mercury, epoch, Frame::J2000).unwrap().position_km;
        let dcm = provider
            .frame_rotation(Frame::J2000, Frame::Iau(mercury.naif_id), epoch)
            .unwrap();
        let computed = (dcm * to_sun).normalize();
        assert_relative_eq!(computed, lonlat_to_xyz(lon, lat, 1.0), epsilon = 1e-12);

        // The planet stays put
        let later = provider.state(mercury, epoch + 1 * Unit::Day, Frame::J2000).unwrap();
        let now = provider.state(mercury, epoch, Frame::J2000).unwrap();
        assert_eq!(later.position_km, now.position_km);
    }

    #[test]
    fn fixed_geometry_moon_phase() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let jupiter = Body::from_name("Jupiter").unwrap();
        let io = Body::from_name("Io").unwrap();
        let phi = 90.0_f64.to_radians();
        let provider =
            FixedGeometryProvider::new(jupiter, 0.0, &[phi], (0.0, 0.0), epoch).unwrap();
        let planet = provider.state(jupiter, epoch, Frame::J2000).unwrap();
        let moon = provider.state(io, epoch, Frame::J2000).unwrap();
        let relative = moon.position_km - planet.position_km;
        assert_relative_eq!(relative.norm(), io.semi_major_axis_km, max_relative = 1e-12);

        let model = provider.model_from_j2000() * relative;
        let measured = (-model.y).atan2(-model.x);
        assert_relative_eq!(measured, phi, epsilon = 1e-12);
    }
}
