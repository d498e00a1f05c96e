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

use super::{Body, EphemerisError, EphemerisProvider, EphemerisTrack, OutOfScopeSnafu, SourceFrame};
use crate::linalg::{Matrix3, Vector3};
use crate::time::Epoch;
use crate::units::{ModelUnits, AU_KM};
use snafu::OptionExt;
use std::fmt;

/// Default spacing between two ephemeris samples, in seconds.
pub const SAMPLE_SPACING_S: f64 = 60.0;

/// Number of samples covering a run of `runtime_s` seconds at the default spacing.
pub fn default_sample_count(runtime_s: f64) -> usize {
    ((runtime_s / SAMPLE_SPACING_S).ceil() as usize + 1).max(2)
}

/// All the ephemeris tracks of a run, owned in one place and shared read-only by the force and loss models.
///
/// The provider is only consulted while building; every query afterwards reads the sampled tracks.
#[derive(Clone, Debug)]
pub struct Ephemeris {
    pub central: &'static Body,
    pub end_epoch: Epoch,
    pub runtime_s: f64,
    pub units: ModelUnits,
    /// Tracks, the central body first
    tracks: Vec<EphemerisTrack>,
}

impl Ephemeris {
    /// Samples the tracks of the central body and of every body in `bodies`.
    pub fn build(
        provider: &dyn EphemerisProvider,
        central: &'static Body,
        bodies: &[&'static Body],
        end_epoch: Epoch,
        runtime_s: f64,
        n_samples: Option<usize>,
    ) -> Result<Self, EphemerisError> {
        let units = ModelUnits::for_body(central);
        let n_samples = n_samples.unwrap_or_else(|| default_sample_count(runtime_s));
        let mut tracks = vec![EphemerisTrack::sample(
            provider, central, central, end_epoch, runtime_s, n_samples, &units,
        )?];
        for body in bodies {
            if tracks.iter().any(|track| track.body.name == body.name) {
                continue;
            }
            tracks.push(EphemerisTrack::sample(
                provider, body, central, end_epoch, runtime_s, n_samples, &units,
            )?);
        }
        info!(
            "ephemeris of {} bodies around {central} sampled from {provider} ({n_samples} samples ending {end_epoch})",
            tracks.len()
        );
        Ok(Self {
            central,
            end_epoch,
            runtime_s,
            units,
            tracks,
        })
    }

    pub fn tracks(&self) -> &[EphemerisTrack] {
        &self.tracks
    }

    pub fn central_track(&self) -> &EphemerisTrack {
        &self.tracks[0]
    }

    pub fn track(&self, name: &str) -> Result<&EphemerisTrack, EphemerisError> {
        self.tracks
            .iter()
            .find(|track| track.body.name.eq_ignore_ascii_case(name))
            .context(OutOfScopeSnafu { name })
    }

    /// Whether the run is centred on the Sun
    pub fn heliocentric(&self) -> bool {
        self.central.is_star()
    }

    /// Rotation from the axes of `frame` attached to `body` into the model axes at offset `t`.
    fn model_from(&self, track: &EphemerisTrack, frame: SourceFrame, t: f64) -> Matrix3<f64> {
        match frame {
            SourceFrame::SolarFixed => Matrix3::identity(),
            SourceFrame::Solar => {
                track.model_from_j2000_at(t) * track.model_from_j2000_at(0.0).transpose()
            }
            SourceFrame::Iau => track.model_from_j2000_at(t) * track.iau_from_j2000_at(t).transpose(),
        }
    }

    /// Rotates each vector `v[i]`, given at offset `t[i]` in `frame_in` of `body`, into `frame_out`.
    pub fn rotate(
        &self,
        body: &str,
        t: &[f64],
        v: &[Vector3<f64>],
        frame_in: SourceFrame,
        frame_out: SourceFrame,
    ) -> Result<Vec<Vector3<f64>>, EphemerisError> {
        if frame_in == frame_out {
            return Ok(v.to_vec());
        }
        let track = self.track(body)?;
        Ok(t.iter()
            .zip(v)
            .map(|(&ti, vi)| {
                let out_from_model = self.model_from(track, frame_out, ti).transpose();
                out_from_model * self.model_from(track, frame_in, ti) * vi
            })
            .collect())
    }

    /// Position of the Sun in the model frame, in natural units
    pub fn sun_position_at(&self, t: f64) -> Vector3<f64> {
        if self.heliocentric() {
            return Vector3::zeros();
        }
        let central = self.central_track();
        central.sun_dir_at(t) * self.units.from_km(central.r_sun_au_at(t) * AU_KM)
    }

    /// Heliocentric distance of a point of the model frame, in AU
    pub fn sun_distance_au_at(&self, t: f64, x: &Vector3<f64>) -> f64 {
        self.units.to_au((x - self.sun_position_at(t)).norm())
    }

    /// Body whose Sun direction and heliocentric radial velocity drive radiation pressure: the start point of a
    /// heliocentric run, otherwise the central body.
    pub fn radiation_reference<'a>(&'a self, startpoint: &str) -> Result<&'a EphemerisTrack, EphemerisError> {
        if self.heliocentric() {
            self.track(startpoint)
        } else {
            Ok(self.central_track())
        }
    }
}

impl fmt::Display for Ephemeris {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = self.tracks.iter().map(|t| t.body.name).collect();
        write!(f, "ephemeris around {} of {:?}", self.central, names)
    }
}

#[cfg(test)]
mod ut_ephemeris {
    use super::*;
    use crate::cosmic::KeplerianProvider;
    use crate::time::Unit;
    use approx::assert_relative_eq;

    fn jovian() -> Ephemeris {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let provider = KeplerianProvider::new(epoch);
        let jupiter = Body::from_name("Jupiter").unwrap();
        Ephemeris::build(
            &provider,
            jupiter,
            &jupiter.satellite_bodies(),
            epoch + 100 * Unit::Day,
            7200.0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn sample_count() {
        assert_eq!(default_sample_count(0.5), 2);
        assert_eq!(default_sample_count(60.0), 2);
        assert_eq!(default_sample_count(61.0), 3);
        assert_eq!(default_sample_count(3600.0), 61);
    }

    #[test]
    fn tracks_in_scope() {
        let eph = jovian();
        assert_eq!(eph.tracks().len(), 5);
        assert_eq!(eph.central_track().body.name, "Jupiter");
        assert!(eph.track("europa").is_ok());
        assert!(eph.track("Titan").is_err());
        assert_eq!(eph.central_track().len(), 121);
    }

    #[test]
    fn rotation_round_trip() {
        let eph = jovian();
        let t = [-7000.0, -3000.0, -10.0];
        let v = [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-0.5, 0.1, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        for (a, b) in [
            (SourceFrame::Iau, SourceFrame::SolarFixed),
            (SourceFrame::Solar, SourceFrame::Iau),
            (SourceFrame::SolarFixed, SourceFrame::Solar),
        ] {
            let there = eph.rotate("Io", &t, &v, a, b).unwrap();
            let back = eph.rotate("Io", &t, &there, b, a).unwrap();
            for (orig, round) in v.iter().zip(&back) {
                assert_relative_eq!(orig, round, epsilon = 1e-12);
            }
            for (orig, rot) in v.iter().zip(&there) {
                assert_relative_eq!(orig.norm(), rot.norm(), epsilon = 1e-12);
            }
        }
        assert_eq!(eph.rotate("Io", &t, &v, SourceFrame::Iau, SourceFrame::Iau).unwrap(), v.to_vec());
    }

    #[test]
    fn sun_distance() {
        let eph = jovian();
        let r_au = eph.central_track().r_sun_au_at(-100.0);
        assert_relative_eq!(eph.sun_distance_au_at(-100.0, &Vector3::zeros()), r_au, max_relative = 1e-12);
        // One radius toward the Sun is closer
        assert!(eph.sun_distance_au_at(-100.0, &Vector3::x()) < r_au);
    }
}
