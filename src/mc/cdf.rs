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

use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Number of nodes of the tabulated cumulative distributions.
pub const CDF_NODES: usize = 10_001;

/// Numerical inverse of the cumulative distribution of a density tabulated on a closed interval.
///
/// The density is integrated with the trapezoid rule on a uniform grid and the resulting piecewise linear
/// cumulative distribution is inverted by bisection.
#[derive(Clone, Debug, PartialEq)]
pub struct InverseCdf {
    x: Vec<f64>,
    cdf: Vec<f64>,
}

impl InverseCdf {
    /// Tabulates `pdf` (which need not be normalised) on `[lo, hi]`. Returns `None` if the density integrates to
    /// zero or is not finite.
    pub fn from_pdf<F: Fn(f64) -> f64>(pdf: F, lo: f64, hi: f64, nodes: usize) -> Option<Self> {
        let nodes = nodes.max(2);
        let step = (hi - lo) / (nodes - 1) as f64;
        let x: Vec<f64> = (0..nodes).map(|k| lo + k as f64 * step).collect();
        let density: Vec<f64> = x.iter().map(|&xi| pdf(xi).max(0.0)).collect();
        let mut cdf = Vec::with_capacity(nodes);
        cdf.push(0.0);
        for k in 1..nodes {
            cdf.push(cdf[k - 1] + 0.5 * (density[k] + density[k - 1]) * step);
        }
        let total = cdf[nodes - 1];
        if !(total.is_finite() && total > 0.0) {
            return None;
        }
        cdf.iter_mut().for_each(|c| *c /= total);
        Some(Self { x, cdf })
    }

    /// Value whose cumulative probability is `u`, with `u` in [0, 1].
    pub fn invert(&self, u: f64) -> f64 {
        let n = self.cdf.len();
        let u = u.clamp(0.0, 1.0);
        let idx = self.cdf.partition_point(|&c| c < u).clamp(1, n - 1);
        let (c0, c1) = (self.cdf[idx - 1], self.cdf[idx]);
        if c1 > c0 {
            self.x[idx - 1] + (u - c0) / (c1 - c0) * (self.x[idx] - self.x[idx - 1])
        } else {
            self.x[idx - 1]
        }
    }

    /// Cumulative probability at `x`, by linear interpolation.
    pub fn cdf(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x <= self.x[0] {
            return 0.0;
        }
        if x >= self.x[n - 1] {
            return 1.0;
        }
        let idx = self.x.partition_point(|&xi| xi <= x).clamp(1, n - 1);
        let w = (x - self.x[idx - 1]) / (self.x[idx] - self.x[idx - 1]);
        self.cdf[idx - 1] + w * (self.cdf[idx] - self.cdf[idx - 1])
    }

    pub fn support(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }
}

impl Distribution<f64> for InverseCdf {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.invert(Uniform::new_inclusive(0.0, 1.0).sample(rng))
    }
}

#[cfg(test)]
mod ut_cdf {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_density() {
        // f(x) = 2x on [0, 1], F(x) = x²
        let inv = InverseCdf::from_pdf(|x| 2.0 * x, 0.0, 1.0, CDF_NODES).unwrap();
        for u in [0.0, 0.01, 0.25, 0.5, 0.81, 1.0] {
            assert_relative_eq!(inv.invert(u), u.sqrt(), epsilon = 1e-4);
        }
        assert_relative_eq!(inv.cdf(0.5), 0.25, epsilon = 1e-6);
        assert_eq!(inv.support(), (0.0, 1.0));
    }

    #[test]
    fn degenerate_density() {
        assert!(InverseCdf::from_pdf(|_| 0.0, 0.0, 1.0, 100).is_none());
        assert!(InverseCdf::from_pdf(|_| f64::NAN, 0.0, 1.0, 100).is_none());
    }
}
