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

use crate::linalg::Vector3;
use crate::PacketVector;
use std::fmt;

/// A single packet, as read from or written into a [`PacketBatch`].
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub time: f64,
    pub x: Vector3<f64>,
    pub v: Vector3<f64>,
    pub frac: f64,
    pub escaped: f64,
    pub ionized: f64,
    /// Fraction deposited on each body, in the order of the batch's `hit_bodies`
    pub hit: Vec<f64>,
    pub iteration: u32,
    pub packet_number: u64,
}

impl Packet {
    /// A fresh packet: full weight and nothing lost yet.
    pub fn new(
        time: f64,
        x: Vector3<f64>,
        v: Vector3<f64>,
        n_bodies: usize,
        iteration: u32,
        packet_number: u64,
    ) -> Self {
        Self {
            time,
            x,
            v,
            frac: 1.0,
            escaped: 0.0,
            ionized: 0.0,
            hit: vec![0.0; n_bodies],
            iteration,
            packet_number,
        }
    }

    /// Total weight accounted for, which must remain one.
    pub fn total(&self) -> f64 {
        self.frac + self.escaped + self.ionized + self.hit.iter().sum::<f64>()
    }
}

/// Structure of arrays holding a batch of packets.
///
/// Positions are in the model frame in units of the central body radius and velocities in radii per second.
/// Throughout the life of a packet, `frac + escaped + ionized + Σ hit = 1`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PacketBatch {
    pub time: Vec<f64>,
    pub x: Vec<Vector3<f64>>,
    pub v: Vec<Vector3<f64>>,
    pub frac: Vec<f64>,
    pub escaped: Vec<f64>,
    pub ionized: Vec<f64>,
    /// `hit[b][i]` is the fraction of packet `i` deposited on body `hit_bodies[b]`
    pub hit: Vec<Vec<f64>>,
    pub hit_bodies: Vec<String>,
    pub iteration: Vec<u32>,
    pub packet_number: Vec<u64>,
}

/// Sums of the weights of a batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchTotals {
    pub packets: usize,
    pub frac: f64,
    pub escaped: f64,
    pub ionized: f64,
    pub hit: Vec<(String, f64)>,
}

impl fmt::Display for BatchTotals {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} packets: frac = {:.6}, escaped = {:.6}, ionized = {:.6}",
            self.packets, self.frac, self.escaped, self.ionized
        )?;
        for (body, hit) in &self.hit {
            write!(f, ", hit[{body}] = {hit:.6}")?;
        }
        Ok(())
    }
}

impl PacketBatch {
    pub fn new(hit_bodies: Vec<String>) -> Self {
        Self {
            hit: vec![Vec::new(); hit_bodies.len()],
            hit_bodies,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn push(&mut self, packet: Packet) {
        debug_assert_eq!(packet.hit.len(), self.hit_bodies.len());
        self.time.push(packet.time);
        self.x.push(packet.x);
        self.v.push(packet.v);
        self.frac.push(packet.frac);
        self.escaped.push(packet.escaped);
        self.ionized.push(packet.ionized);
        for (column, hit) in self.hit.iter_mut().zip(packet.hit) {
            column.push(hit);
        }
        self.iteration.push(packet.iteration);
        self.packet_number.push(packet.packet_number);
    }

    pub fn get(&self, i: usize) -> Packet {
        Packet {
            time: self.time[i],
            x: self.x[i],
            v: self.v[i],
            frac: self.frac[i],
            escaped: self.escaped[i],
            ionized: self.ionized[i],
            hit: self.hit.iter().map(|column| column[i]).collect(),
            iteration: self.iteration[i],
            packet_number: self.packet_number[i],
        }
    }

    pub fn set(&mut self, i: usize, packet: Packet) {
        self.time[i] = packet.time;
        self.x[i] = packet.x;
        self.v[i] = packet.v;
        self.frac[i] = packet.frac;
        self.escaped[i] = packet.escaped;
        self.ionized[i] = packet.ionized;
        for (column, hit) in self.hit.iter_mut().zip(packet.hit) {
            column[i] = hit;
        }
        self.iteration[i] = packet.iteration;
        self.packet_number[i] = packet.packet_number;
    }

    /// Appends every packet of `other`, which must track the same bodies.
    pub fn extend(&mut self, other: &PacketBatch) {
        debug_assert_eq!(self.hit_bodies, other.hit_bodies);
        for i in 0..other.len() {
            self.push(other.get(i));
        }
    }

    /// Copies the packets at `indices` into a new batch.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut sub = Self::new(self.hit_bodies.clone());
        for &i in indices {
            sub.push(self.get(i));
        }
        sub
    }

    /// Writes the packets of `sub`, previously selected at `indices`, back into this batch.
    pub fn scatter(&mut self, indices: &[usize], sub: &PacketBatch) {
        for (k, &i) in indices.iter().enumerate() {
            self.set(i, sub.get(k));
        }
    }

    /// Integrated state `(X, V, ln frac)` of packet `i`.
    pub fn as_vector(&self, i: usize) -> PacketVector {
        let (x, v) = (self.x[i], self.v[i]);
        PacketVector::from_column_slice(&[x.x, x.y, x.z, v.x, v.y, v.z, self.frac[i].ln()])
    }

    /// Whether packet `i` still has to be integrated: some weight left and not yet at the end of the run.
    pub fn is_live(&self, i: usize, time_tolerance: f64) -> bool {
        self.frac[i] > 0.0 && self.time[i] < -time_tolerance
    }

    pub fn live_indices(&self, time_tolerance: f64) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_live(i, time_tolerance)).collect()
    }

    /// Departure from one of the total weight of packet `i`.
    pub fn conservation_error(&self, i: usize) -> f64 {
        let total = self.frac[i]
            + self.escaped[i]
            + self.ionized[i]
            + self.hit.iter().map(|column| column[i]).sum::<f64>();
        (total - 1.0).abs()
    }

    /// Returns the first packet whose total weight departs from one by more than `tolerance`.
    pub fn check_conservation(&self, tolerance: f64) -> Option<(usize, f64)> {
        (0..self.len())
            .map(|i| (i, self.conservation_error(i)))
            .find(|(_, err)| *err > tolerance)
    }

    pub fn totals(&self) -> BatchTotals {
        BatchTotals {
            packets: self.len(),
            frac: self.frac.iter().sum(),
            escaped: self.escaped.iter().sum(),
            ionized: self.ionized.iter().sum(),
            hit: self
                .hit_bodies
                .iter()
                .zip(&self.hit)
                .map(|(body, column)| (body.clone(), column.iter().sum()))
                .collect(),
        }
    }
}

impl fmt::Display for PacketBatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "batch of {}", self.totals())
    }
}
