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

use std::fmt;

use super::{ErrorCtrl, ResolutionScaled};
use typed_builder::TypedBuilder;

/// PropOpts stores the integrator options of a batch of packets. All durations are in seconds.
///
/// A positive `step_size` selects the fixed step mode, where every packet advances by that step and a snapshot of
/// the batch is kept after each step. Otherwise, each packet has its own adaptive step size, starting at
/// `init_step` and controlled by the normalised error at the given `resolution`.
#[derive(Clone, Copy, Debug, TypedBuilder)]
#[builder(doc)]
pub struct PropOpts<E: ErrorCtrl> {
    #[builder(default = 1000.0)]
    pub init_step: f64,
    /// Fixed step size, zero for an adaptive step
    #[builder(default = 0.0)]
    pub step_size: f64,
    #[builder(default = 1e-4)]
    pub resolution: f64,
    #[builder(default = 0.95)]
    pub safety: f64,
    /// Exponent of the error when growing an accepted step
    #[builder(default = -0.2)]
    pub grow: f64,
    /// Exponent of the error when shrinking a rejected step
    #[builder(default = -0.25)]
    pub shrink: f64,
    /// Below this error a step is considered exact and the step size is multiplied by `exact_growth`
    #[builder(default = 1e-7)]
    pub exact_error: f64,
    #[builder(default = 10.0)]
    pub exact_growth: f64,
    /// A rejected step shrinking below this size aborts the propagation
    #[builder(default = 1e-9)]
    pub min_step: f64,
    /// A packet within this duration of the end of the run is considered done
    #[builder(default = 1e-6)]
    pub time_tolerance: f64,
    pub error_ctrl: E,
}

impl<E: ErrorCtrl> PropOpts<E> {
    /// `with_adaptive_step` initializes a `PropOpts` with an adaptive step size at the provided resolution.
    pub fn with_adaptive_step(resolution: f64, error_ctrl: E) -> Self {
        Self::builder()
            .resolution(resolution)
            .error_ctrl(error_ctrl)
            .build()
    }

    pub fn fixed_step(&self) -> bool {
        self.step_size > 0.0
    }

    /// Returns a string with the information about these options
    pub fn info(&self) -> String {
        format!("{self}")
    }
}

impl<E: ErrorCtrl> fmt::Display for PropOpts<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fixed_step() {
            write!(f, "fixed step: {:e} s", self.step_size)
        } else {
            write!(
                f,
                "init_step: {:e} s, resolution: {:e}, min_step: {:e} s",
                self.init_step, self.resolution, self.min_step,
            )
        }
    }
}

impl PropOpts<ResolutionScaled> {
    /// `with_fixed_step` initializes a `PropOpts` such that every packet advances by `step` seconds.
    pub fn with_fixed_step(step: f64) -> Self {
        Self::builder()
            .step_size(step)
            .init_step(step)
            .error_ctrl(ResolutionScaled)
            .build()
    }

    /// Fixed step if `step_size` is positive, adaptive at `resolution` otherwise.
    pub fn from_run(step_size: f64, resolution: f64) -> Self {
        if step_size > 0.0 {
            Self::with_fixed_step(step_size)
        } else {
            Self::with_adaptive_step(resolution, ResolutionScaled)
        }
    }
}

impl Default for PropOpts<ResolutionScaled> {
    fn default() -> PropOpts<ResolutionScaled> {
        Self::builder().error_ctrl(ResolutionScaled).build()
    }
}

#[test]
fn test_options() {
    let opts = PropOpts::with_fixed_step(10.0);
    assert!(opts.fixed_step());
    assert_eq!(opts.init_step, 10.0);
    assert_eq!(format!("{opts}"), "fixed step: 1e1 s");

    let opts = PropOpts::with_adaptive_step(1e-5, ResolutionScaled);
    assert!(!opts.fixed_step());
    assert!((opts.resolution - 1e-5).abs() < f64::EPSILON);

    let opts: PropOpts<ResolutionScaled> = Default::default();
    assert_eq!(opts.init_step, 1000.0);
    assert_eq!(opts.safety, 0.95);
    assert_eq!(opts.grow, -0.2);
    assert_eq!(opts.shrink, -0.25);
    assert_eq!(opts.min_step, 1e-9);
    assert!(!opts.fixed_step());

    assert!(PropOpts::from_run(5.0, 1e-4).fixed_step());
    assert!(!PropOpts::from_run(0.0, 1e-4).fixed_step());
}
