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

use crate::io::{InputOutputError, Store};
use crate::propagators::IntegrationDetails;
use crate::state::BatchTotals;
use std::fmt;

/// Outcome of one iteration of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationSummary {
    pub iteration: u32,
    pub totals: BatchTotals,
    /// Integration statistics, only known for iterations run in this process
    pub details: Option<IntegrationDetails>,
}

/// Per-iteration totals of the weights of a run: what is left in the exosphere, what escaped, what was ionized
/// and what landed on each body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub run: u64,
    pub iterations: Vec<IterationSummary>,
}

impl RunSummary {
    pub fn new(run: u64) -> Self {
        Self {
            run,
            iterations: Vec::new(),
        }
    }

    /// Rebuilds the summary of every committed iteration of a run.
    pub fn from_store<S: Store + ?Sized>(store: &S, run: u64) -> Result<Self, InputOutputError> {
        let mut summary = Self::new(run);
        for iteration in store.state(run)?.iterations {
            let record = store.snapshot(run, iteration)?;
            summary.push(iteration, record.final_state.totals(), None);
        }
        Ok(summary)
    }

    pub fn push(&mut self, iteration: u32, totals: BatchTotals, details: Option<IntegrationDetails>) {
        self.iterations.push(IterationSummary {
            iteration,
            totals,
            details,
        });
    }

    pub fn packets(&self) -> usize {
        self.iterations.iter().map(|it| it.totals.packets).sum()
    }

    /// Totals over every iteration.
    pub fn totals(&self) -> BatchTotals {
        let mut totals = BatchTotals::default();
        for it in &self.iterations {
            totals.packets += it.totals.packets;
            totals.frac += it.totals.frac;
            totals.escaped += it.totals.escaped;
            totals.ionized += it.totals.ionized;
            for (body, hit) in &it.totals.hit {
                match totals.hit.iter_mut().find(|(name, _)| name == body) {
                    Some((_, sum)) => *sum += hit,
                    None => totals.hit.push((body.clone(), *hit)),
                }
            }
        }
        totals
    }

    /// Shares of the initial weight still in flight, escaped, ionized and deposited on each body.
    pub fn fractions(&self) -> BatchTotals {
        let mut totals = self.totals();
        if totals.packets > 0 {
            let n = totals.packets as f64;
            totals.frac /= n;
            totals.escaped /= n;
            totals.ionized /= n;
            for (_, hit) in totals.hit.iter_mut() {
                *hit /= n;
            }
        }
        totals
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "run #{} ({} iterations)", self.run, self.iterations.len())?;
        for it in &self.iterations {
            writeln!(f, "  iteration {}: {}", it.iteration, it.totals)?;
        }
        write!(f, "  mean shares: {}", self.fractions())
    }
}
