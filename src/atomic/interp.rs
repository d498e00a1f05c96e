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

use super::{AtomicDataError, DecodeSnafu};
use snafu::ensure;

/// Index of the grid cell containing `x` and the weight of its upper node, with `x` clamped to the grid.
fn bracket(grid: &[f64], x: f64) -> (usize, f64) {
    let n = grid.len();
    if n == 1 || x.is_nan() || x <= grid[0] {
        return (0, 0.0);
    }
    if x >= grid[n - 1] {
        return (n - 2, 1.0);
    }
    let idx = grid.partition_point(|&g| g <= x).saturating_sub(1).min(n - 2);
    (idx, (x - grid[idx]) / (grid[idx + 1] - grid[idx]))
}

fn check_grid(name: &str, grid: &[f64]) -> Result<(), AtomicDataError> {
    ensure!(
        !grid.is_empty(),
        DecodeSnafu {
            path: name,
            reason: "empty grid"
        }
    );
    ensure!(
        grid.windows(2).all(|w| w[1] > w[0]),
        DecodeSnafu {
            path: name,
            reason: "grid is not strictly increasing"
        }
    );
    Ok(())
}

/// Piecewise linear interpolant which clamps its argument to the tabulated domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Interp1D {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Interp1D {
    pub fn new(name: &str, x: Vec<f64>, y: Vec<f64>) -> Result<Self, AtomicDataError> {
        check_grid(name, &x)?;
        ensure!(
            x.len() == y.len(),
            DecodeSnafu {
                path: name,
                reason: format!("{} abscissas for {} values", x.len(), y.len())
            }
        );
        Ok(Self { x, y })
    }

    /// A table holding the same value everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            x: vec![0.0],
            y: vec![value],
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        if self.y.len() == 1 {
            return self.y[0];
        }
        let (i, w) = bracket(&self.x, x);
        self.y[i] + w * (self.y[i + 1] - self.y[i])
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Returns a copy with the abscissas and values scaled.
    pub fn scaled(&self, x_scale: f64, y_scale: f64) -> Self {
        Self {
            x: self.x.iter().map(|x| x * x_scale).collect(),
            y: self.y.iter().map(|y| y * y_scale).collect(),
        }
    }
}

/// Bilinear interpolant on a rectangular grid, clamping both arguments to the tabulated domain.
///
/// Values are stored row-major: `z[i][j]` is the value at `(x[i], y[j])`.
#[derive(Clone, Debug, PartialEq)]
pub struct Interp2D {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<Vec<f64>>,
}

impl Interp2D {
    pub fn new(name: &str, x: Vec<f64>, y: Vec<f64>, z: Vec<Vec<f64>>) -> Result<Self, AtomicDataError> {
        check_grid(name, &x)?;
        check_grid(name, &y)?;
        ensure!(
            z.len() == x.len() && z.iter().all(|row| row.len() == y.len()),
            DecodeSnafu {
                path: name,
                reason: format!("values must be a {} x {} grid", x.len(), y.len())
            }
        );
        Ok(Self { x, y, z })
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let (i, wx) = if self.x.len() == 1 { (0, 0.0) } else { bracket(&self.x, x) };
        let (j, wy) = if self.y.len() == 1 { (0, 0.0) } else { bracket(&self.y, y) };
        let i1 = (i + 1).min(self.x.len() - 1);
        let j1 = (j + 1).min(self.y.len() - 1);
        let lo = self.z[i][j] + wy * (self.z[i][j1] - self.z[i][j]);
        let hi = self.z[i1][j] + wy * (self.z[i1][j1] - self.z[i1][j]);
        lo + wx * (hi - lo)
    }
}

#[cfg(test)]
mod ut_interp {
    use super::*;

    #[test]
    fn linear_and_clamped() {
        let table = Interp1D::new("t", vec![0.0, 1.0, 3.0], vec![0.0, 10.0, 30.0]).unwrap();
        assert_eq!(table.eval(0.5), 5.0);
        assert_eq!(table.eval(2.0), 20.0);
        assert_eq!(table.eval(-4.0), 0.0);
        assert_eq!(table.eval(7.0), 30.0);
        assert_eq!(Interp1D::constant(3.0).eval(1e9), 3.0);
        assert!(Interp1D::new("t", vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Interp1D::new("t", vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn bilinear() {
        let table = Interp2D::new(
            "t",
            vec![0.0, 1.0],
            vec![0.0, 2.0],
            vec![vec![0.0, 2.0], vec![1.0, 3.0]],
        )
        .unwrap();
        assert_eq!(table.eval(0.5, 1.0), 1.5);
        assert_eq!(table.eval(1.0, 2.0), 3.0);
        assert_eq!(table.eval(5.0, -5.0), 1.0);
        assert!(Interp2D::new("t", vec![0.0, 1.0], vec![0.0], vec![vec![0.0]]).is_err());
    }
}
