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

use super::{AngularDistribution, SpatialDistribution, SpeedDistribution};
use crate::cosmic::{Body, Ephemeris, EphemerisError, SourceFrame};
use crate::linalg::Vector3;
use crate::state::{Packet, PacketBatch};
use crate::utils::lonlat_to_xyz;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::f64::consts::PI;

/// Samples of the source distribution, in the frame of the start point body.
///
/// Angles are in radians, `radius` in radii of the start point, `speed_km_s` in km/s and `local_time` in hours.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StartingPoints {
    pub time: Vec<f64>,
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    pub local_time: Vec<f64>,
    pub radius: Vec<f64>,
    pub speed_km_s: Vec<f64>,
    pub altitude: Vec<f64>,
    pub azimuth: Vec<f64>,
    pub iteration: Vec<u32>,
    pub packet_number: Vec<u64>,
}

impl StartingPoints {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn extend(&mut self, other: &StartingPoints) {
        self.time.extend_from_slice(&other.time);
        self.longitude.extend_from_slice(&other.longitude);
        self.latitude.extend_from_slice(&other.latitude);
        self.local_time.extend_from_slice(&other.local_time);
        self.radius.extend_from_slice(&other.radius);
        self.speed_km_s.extend_from_slice(&other.speed_km_s);
        self.altitude.extend_from_slice(&other.altitude);
        self.azimuth.extend_from_slice(&other.azimuth);
        self.iteration.extend_from_slice(&other.iteration);
        self.packet_number.extend_from_slice(&other.packet_number);
    }
}

/// Velocity of a particle leaving the point `x0` of a sphere at `speed`, `altitude` above the tangent plane and
/// `azimuth` east of north.
pub fn local_velocity(x0: &Vector3<f64>, speed: f64, altitude: f64, azimuth: f64) -> Vector3<f64> {
    let rhat = x0.normalize();
    let east = Vector3::z().cross(&rhat);
    // At the poles east is undefined: any tangent direction will do
    let ehat = if east.norm() > 1e-12 {
        east.normalize()
    } else {
        Vector3::y()
    };
    let nhat = rhat.cross(&ehat);
    (rhat * altitude.sin() + nhat * (altitude.cos() * azimuth.cos()) + ehat * (altitude.cos() * azimuth.sin()))
        * speed
}

/// Local solar time in hours of a point given in model axes, noon being toward the Sun.
pub fn local_time(x: &Vector3<f64>) -> f64 {
    (12.0 + x.y.atan2(x.x) * 12.0 / PI).rem_euclid(24.0)
}

/// Draws packets from the source of a run and places them in the model frame.
#[derive(Clone, Debug)]
pub struct SourceGenerator {
    pub startpoint: &'static Body,
    pub spatial: SpatialDistribution,
    pub speed: SpeedDistribution,
    pub angular: AngularDistribution,
    pub runtime_s: f64,
    /// All packets start at the beginning of the run instead of uniformly over it
    pub start_together: bool,
}

impl SourceGenerator {
    /// Draws `n` starting points. Random numbers are consumed in the order: start times, positions, speeds,
    /// directions.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
        iteration: u32,
        first_packet: u64,
    ) -> StartingPoints {
        let time = if self.start_together {
            vec![-self.runtime_s; n]
        } else {
            let window = Uniform::new_inclusive(-self.runtime_s, 0.0);
            (0..n).map(|_| window.sample(rng)).collect()
        };
        let (longitude, latitude) = self.spatial.choose_points(n, rng).into_iter().unzip();
        let speed_km_s = self.speed.choose_points(n, rng);
        let (altitude, azimuth) = self.angular.choose_points(n, rng).into_iter().unzip();

        StartingPoints {
            time,
            longitude,
            latitude,
            local_time: vec![0.0; n],
            radius: vec![self.spatial.exobase(); n],
            speed_km_s,
            altitude,
            azimuth,
            iteration: vec![iteration; n],
            packet_number: (first_packet..first_packet + n as u64).collect(),
        }
    }

    /// Converts starting points into packets of the model frame, filling in their local times.
    pub fn initial_states(
        &self,
        points: &mut StartingPoints,
        ephemeris: &Ephemeris,
        hit_bodies: Vec<String>,
    ) -> Result<PacketBatch, EphemerisError> {
        let units = ephemeris.units;
        let track = ephemeris.track(self.startpoint.name)?;
        let frame = self.spatial.frame();

        let radius_scale = units.from_km(self.startpoint.radius_km);
        let (x_local, v_local): (Vec<Vector3<f64>>, Vec<Vector3<f64>>) = (0..points.len())
            .map(|i| {
                let x0 = lonlat_to_xyz(
                    points.longitude[i],
                    points.latitude[i],
                    points.radius[i] * radius_scale,
                );
                let v0 = local_velocity(
                    &x0,
                    units.from_km_s(points.speed_km_s[i]),
                    points.altitude[i],
                    points.azimuth[i],
                );
                (x0, v0)
            })
            .unzip();

        let x_model = ephemeris.rotate(self.startpoint.name, &points.time, &x_local, frame, SourceFrame::SolarFixed)?;
        let v_model = ephemeris.rotate(self.startpoint.name, &points.time, &v_local, frame, SourceFrame::SolarFixed)?;

        let n_bodies = hit_bodies.len();
        let mut batch = PacketBatch::new(hit_bodies);
        for i in 0..points.len() {
            let t = points.time[i];
            points.local_time[i] = local_time(&x_model[i]);
            batch.push(Packet::new(
                t,
                track.position_at(t) + x_model[i],
                track.velocity_at(t) + v_model[i],
                n_bodies,
                points.iteration[i],
                points.packet_number[i],
            ));
        }
        Ok(batch)
    }

    /// Draws `n` packets and returns both their starting points and their initial states.
    #[allow(clippy::too_many_arguments)]
    pub fn generate<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
        iteration: u32,
        first_packet: u64,
        ephemeris: &Ephemeris,
        hit_bodies: Vec<String>,
    ) -> Result<(StartingPoints, PacketBatch), EphemerisError> {
        let mut points = self.choose(n, rng, iteration, first_packet);
        let batch = self.initial_states(&mut points, ephemeris, hit_bodies)?;
        Ok((points, batch))
    }
}
