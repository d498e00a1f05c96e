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

use super::surface::time_since_crossing;
use super::{
    AccelModel, Dynamics, DynamicsConfigSnafu, DynamicsEphemerisSnafu, DynamicsError, LossModel, NonFiniteSnafu,
    SurfaceInteraction,
};
use crate::cosmic::Ephemeris;
use crate::linalg::Vector3;
use crate::state::PacketBatch;
use crate::PacketVector;
use rayon::prelude::*;
use snafu::{ensure, ResultExt};
use std::fmt;
use std::sync::Arc;

/// Dynamics of the packets of a run: accelerations, loss, surface interaction and escape.
#[derive(Clone)]
pub struct PacketDynamics {
    pub ephemeris: Arc<Ephemeris>,
    pub accel_models: Vec<Arc<dyn AccelModel>>,
    pub loss: LossModel,
    pub surface: SurfaceInteraction,
    /// Escape distance from the edge origin, in natural units
    pub outer_edge: f64,
    edge_origin: usize,
    /// Indices of the tracks with a surface packets can hit
    solid: Vec<usize>,
}

impl PacketDynamics {
    /// Initializes the dynamics of a run.
    ///
    /// `outer_edge` is in radii of the central body and measured from `edge_origin`. The Sun is only a solid body
    /// when it is the central body.
    pub fn new(
        ephemeris: Arc<Ephemeris>,
        accel_models: Vec<Arc<dyn AccelModel>>,
        loss: LossModel,
        surface: SurfaceInteraction,
        outer_edge: f64,
        edge_origin: &str,
    ) -> Result<Self, DynamicsError> {
        ensure!(
            outer_edge > 1.0,
            DynamicsConfigSnafu {
                msg: format!("outer edge must be beyond the central body surface, got {outer_edge} R")
            }
        );
        let origin_name = ephemeris.track(edge_origin).context(DynamicsEphemerisSnafu)?.body.name;
        let edge_origin = ephemeris
            .tracks()
            .iter()
            .position(|track| track.body.name == origin_name)
            .unwrap_or(0);
        let heliocentric = ephemeris.heliocentric();
        let solid = ephemeris
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, track)| heliocentric || !track.body.is_star())
            .map(|(idx, _)| idx)
            .collect();

        Ok(Self {
            ephemeris,
            accel_models,
            loss,
            surface,
            outer_edge,
            edge_origin,
            solid,
        })
    }

    /// Derivative of `(X, V, ln frac)` of one packet.
    fn derivative(&self, index: usize, t: f64, y: &PacketVector) -> Result<PacketVector, DynamicsError> {
        let x = Vector3::new(y[0], y[1], y[2]);
        let v = Vector3::new(y[3], y[4], y[5]);

        let mut accel = Vector3::zeros();
        for model in &self.accel_models {
            accel += model.eom(t, &x, &v);
        }
        ensure!(
            accel.iter().all(|a| a.is_finite()),
            NonFiniteSnafu {
                index,
                quantity: "acceleration"
            }
        );

        let rate = self.loss.rate(t, &x, &v);
        ensure!(
            rate.is_finite(),
            NonFiniteSnafu {
                index,
                quantity: "loss rate"
            }
        );

        Ok(PacketVector::from_column_slice(&[
            v.x, v.y, v.z, accel.x, accel.y, accel.z, -rate,
        ]))
    }

    /// Moves packet `i` back to the surface of the first body it went through during the last step, and applies the
    /// surface interaction. Returns whether a surface was hit.
    fn collide(&self, batch: &mut PacketBatch, i: usize, step: f64) -> bool {
        let t = batch.time[i];
        for (k, &idx) in self.solid.iter().enumerate() {
            let track = &self.ephemeris.tracks()[idx];
            let d = batch.x[i] - track.position_at(t);
            if d.norm_squared() >= track.radius * track.radius {
                continue;
            }

            let v_rel = batch.v[i] - track.velocity_at(t);
            let back = time_since_crossing(&d, &v_rel, track.radius, step);
            let t_hit = t - back;
            let mut rel = d - v_rel * back;
            if rel.norm() > 0.0 {
                rel = rel.normalize() * track.radius;
            }
            let normal = rel / track.radius;

            batch.time[i] = t_hit;
            batch.x[i] = track.position_at(t_hit) + rel;

            let stick = self.surface.stickcoef();
            let frac = batch.frac[i];
            batch.hit[k][i] += frac * stick;
            batch.frac[i] = frac * (1.0 - stick);
            batch.v[i] = if batch.frac[i] > 0.0 {
                track.velocity_at(t_hit) + self.surface.reemit(&v_rel, &normal)
            } else {
                v_rel + track.velocity_at(t_hit)
            };
            trace!(
                "packet {} hit {} at t = {t_hit} s, {} left",
                batch.packet_number[i],
                track.body.name,
                batch.frac[i]
            );
            return true;
        }
        false
    }

    /// Distance of a packet from the origin of the escape sphere.
    pub fn edge_distance(&self, t: f64, x: &Vector3<f64>) -> f64 {
        (x - self.ephemeris.tracks()[self.edge_origin].position_at(t)).norm()
    }
}

impl Dynamics for PacketDynamics {
    fn eom(&self, t: &[f64], y: &[PacketVector]) -> Result<Vec<PacketVector>, DynamicsError> {
        t.par_iter()
            .zip(y.par_iter())
            .enumerate()
            .map(|(index, (ti, yi))| self.derivative(index, *ti, yi))
            .collect()
    }

    fn finally(&self, batch: &mut PacketBatch, i: usize, step: f64) -> Result<(), DynamicsError> {
        if batch.frac[i] <= 0.0 {
            return Ok(());
        }
        self.collide(batch, i, step);
        if batch.frac[i] > 0.0 && self.edge_distance(batch.time[i], &batch.x[i]) >= self.outer_edge {
            batch.escaped[i] += batch.frac[i];
            batch.frac[i] = 0.0;
        }
        Ok(())
    }

    fn hit_bodies(&self) -> Vec<String> {
        self.solid
            .iter()
            .map(|&idx| self.ephemeris.tracks()[idx].body.name.to_string())
            .collect()
    }
}

impl fmt::Display for PacketDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let models: Vec<String> = self.accel_models.iter().map(|m| format!("{m}")).collect();
        write!(
            f,
            "packet dynamics with {} ({}; {}; outer edge {} R from {})",
            models.join(", "),
            self.loss,
            self.surface,
            self.outer_edge,
            self.ephemeris.tracks()[self.edge_origin].body.name
        )
    }
}

impl fmt::Debug for PacketDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod ut_packet_dynamics {
    use super::*;
    use crate::cosmic::{Body, FixedGeometryProvider};
    use crate::dynamics::PointMasses;
    use crate::state::Packet;
    use crate::time::Epoch;
    use approx::assert_relative_eq;

    fn mercury(stickcoef: f64) -> PacketDynamics {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let mercury = Body::from_name("Mercury").unwrap();
        let provider = FixedGeometryProvider::new(mercury, 0.0, &[], (0.0, 0.0), epoch).unwrap();
        let ephem = Arc::new(Ephemeris::build(&provider, mercury, &[], epoch, 3600.0, Some(2)).unwrap());
        PacketDynamics::new(
            ephem.clone(),
            vec![PointMasses::new(ephem)],
            LossModel::constant_lifetime(100.0).unwrap(),
            SurfaceInteraction::constant(stickcoef, 0.0).unwrap(),
            5.0,
            "Mercury",
        )
        .unwrap()
    }

    fn batch_with(dynamics: &PacketDynamics, x: Vector3<f64>, v: Vector3<f64>) -> PacketBatch {
        let mut batch = PacketBatch::new(dynamics.hit_bodies());
        batch.push(Packet::new(-100.0, x, v, 1, 0, 0));
        batch
    }

    #[test]
    fn equations_of_motion() {
        let dynamics = mercury(1.0);
        let batch = batch_with(&dynamics, Vector3::new(2.0, 0.0, 0.0), Vector3::new(0.0, 1e-3, 0.0));
        let dy = dynamics.eom(&batch.time, &[batch.as_vector(0)]).unwrap();
        let gm = dynamics.ephemeris.central_track().gm;
        assert_relative_eq!(dy[0][1], 1e-3);
        assert_relative_eq!(dy[0][3], -gm / 4.0, max_relative = 1e-12);
        assert_relative_eq!(dy[0][6], -1e-2);
        assert_eq!(dynamics.hit_bodies(), vec!["Mercury".to_string()]);
    }

    #[test]
    fn non_finite_acceleration() {
        let dynamics = mercury(1.0);
        let err = dynamics.eom(&[-1.0], &[PacketVector::zeros()]).unwrap_err();
        assert!(matches!(err, DynamicsError::NonFinite { index: 0, .. }));
    }

    #[test]
    fn sticks_on_the_surface() {
        let dynamics = mercury(1.0);
        let mut batch = batch_with(&dynamics, Vector3::new(0.9, 0.0, 0.0), Vector3::new(-0.01, 0.0, 0.0));
        dynamics.finally(&mut batch, 0, 50.0).unwrap();
        assert_relative_eq!(batch.time[0], -110.0, epsilon = 1e-9);
        assert_relative_eq!(batch.x[0].norm(), 1.0, epsilon = 1e-12);
        assert_eq!(batch.frac[0], 0.0);
        assert_eq!(batch.hit[0][0], 1.0);
        assert!(batch.check_conservation(1e-12).is_none());
    }

    #[test]
    fn bounces_off_the_surface() {
        let dynamics = mercury(0.25);
        let mut batch = batch_with(&dynamics, Vector3::new(0.9, 0.0, 0.0), Vector3::new(-0.01, 0.0, 0.0));
        dynamics.finally(&mut batch, 0, 50.0).unwrap();
        assert_relative_eq!(batch.frac[0], 0.75);
        assert_relative_eq!(batch.hit[0][0], 0.25);
        assert_relative_eq!(batch.v[0], Vector3::new(0.01, 0.0, 0.0), epsilon = 1e-15);
    }

    #[test]
    fn escapes() {
        let dynamics = mercury(1.0);
        let mut batch = batch_with(&dynamics, Vector3::new(0.0, 5.5, 0.0), Vector3::new(0.0, 0.01, 0.0));
        dynamics.finally(&mut batch, 0, 50.0).unwrap();
        assert_eq!(batch.frac[0], 0.0);
        assert_eq!(batch.escaped[0], 1.0);
        assert!(format!("{dynamics}").contains("outer edge 5 R"));
    }
}
