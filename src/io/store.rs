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

use super::index::{InputIndex, RunEntry};
use super::inputs::RunInputs;
use super::{InputOutputError, UnknownRunSnafu};
use crate::mc::StartingPoints;
use crate::state::PacketBatch;
use snafu::OptionExt;
use std::collections::{BTreeMap, HashMap};

/// Everything produced by one iteration of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IterationRecord {
    pub iteration: u32,
    pub starting_points: StartingPoints,
    pub initial_state: PacketBatch,
    pub final_state: PacketBatch,
    /// State after every step, for fixed step runs
    pub trajectory: Option<PacketBatch>,
}

impl IterationRecord {
    pub fn len(&self) -> usize {
        self.final_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.final_state.is_empty()
    }
}

/// Progress of a run in a store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunState {
    pub run: u64,
    /// Committed iterations
    pub iterations: Vec<u32>,
    pub packets: u64,
}

impl RunState {
    /// Iteration number following the last committed one.
    pub fn next_iteration(&self) -> u32 {
        self.iterations.iter().max().map_or(0, |it| it + 1)
    }

    pub fn completed(&self) -> usize {
        self.iterations.len()
    }
}

impl From<&RunEntry> for RunState {
    fn from(entry: &RunEntry) -> Self {
        Self {
            run: entry.run,
            iterations: entry.iterations.clone(),
            packets: entry.packets,
        }
    }
}

/// Persistence of the runs, append-only per iteration.
///
/// A run only exists in a store once its first iteration is committed: an interrupted iteration leaves no trace.
pub trait Store {
    /// State of the run matching these inputs, or an empty state with a fresh run identifier.
    fn resume(&self, inputs: &RunInputs) -> Result<RunState, InputOutputError>;

    /// Commits one complete iteration of a run.
    fn append(&mut self, inputs: &RunInputs, run: u64, record: &IterationRecord) -> Result<(), InputOutputError>;

    /// State of a known run.
    fn state(&self, run: u64) -> Result<RunState, InputOutputError>;

    /// Committed data of one iteration.
    fn snapshot(&self, run: u64, iteration: u32) -> Result<IterationRecord, InputOutputError>;

    /// Final states of every committed iteration of a run, in commit order.
    fn final_states(&self, run: u64) -> Result<PacketBatch, InputOutputError> {
        let mut all: Option<PacketBatch> = None;
        for iteration in self.state(run)?.iterations {
            let record = self.snapshot(run, iteration)?;
            match all.as_mut() {
                Some(all) => all.extend(&record.final_state),
                None => all = Some(record.final_state),
            }
        }
        Ok(all.unwrap_or_default())
    }

    /// Starting points of every committed iteration of a run, in commit order.
    fn starting_points(&self, run: u64) -> Result<StartingPoints, InputOutputError> {
        let mut all = StartingPoints::default();
        for iteration in self.state(run)?.iterations {
            all.extend(&self.snapshot(run, iteration)?.starting_points);
        }
        Ok(all)
    }
}

/// Store keeping everything in memory, for tests and for runs whose results are consumed right away.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    index: InputIndex,
    records: HashMap<u64, BTreeMap<u32, IterationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &InputIndex {
        &self.index
    }
}

impl Store for MemoryStore {
    fn resume(&self, inputs: &RunInputs) -> Result<RunState, InputOutputError> {
        Ok(match self.index.find(inputs) {
            Some(entry) => entry.into(),
            None => RunState {
                run: self.index.next_run_id(),
                ..Default::default()
            },
        })
    }

    fn append(&mut self, inputs: &RunInputs, run: u64, record: &IterationRecord) -> Result<(), InputOutputError> {
        self.index
            .commit(inputs, run, record.iteration, record.len() as u64)?;
        self.records
            .entry(run)
            .or_default()
            .insert(record.iteration, record.clone());
        Ok(())
    }

    fn state(&self, run: u64) -> Result<RunState, InputOutputError> {
        self.index
            .entry(run)
            .map(RunState::from)
            .context(UnknownRunSnafu { run })
    }

    fn snapshot(&self, run: u64, iteration: u32) -> Result<IterationRecord, InputOutputError> {
        let records = self.records.get(&run).context(UnknownRunSnafu { run })?;
        records
            .get(&iteration)
            .cloned()
            .ok_or_else(|| InputOutputError::MissingData {
                which: format!("iteration {iteration} of run #{run}"),
            })
    }
}

#[cfg(test)]
mod ut_store {
    use super::*;
    use crate::io::ConfigRepr;
    use crate::linalg::Vector3;
    use crate::state::Packet;

    fn inputs() -> RunInputs {
        RunInputs::loads(
            r#"
geometry: {central_body: Mercury, taa: 90.0}
spatial: {type: uniform}
speed: {type: maxwellian, temperature: 1200.0}
angular: {type: isotropic}
options: {runtime: 1800.0, species: Na, n_packets: 2}
"#,
        )
        .unwrap()
    }

    fn record(iteration: u32, first: u64) -> IterationRecord {
        let mut final_state = PacketBatch::new(vec!["Mercury".to_string()]);
        for k in 0..2 {
            final_state.push(Packet::new(0.0, Vector3::x(), Vector3::zeros(), 1, iteration, first + k));
        }
        IterationRecord {
            iteration,
            initial_state: final_state.clone(),
            final_state,
            ..Default::default()
        }
    }

    #[test]
    fn memory_store() {
        let inputs = inputs();
        let mut store = MemoryStore::new();
        let fresh = store.resume(&inputs).unwrap();
        assert_eq!(fresh, RunState::default());
        assert!(store.index().runs().is_empty());
        assert!(matches!(store.state(0), Err(InputOutputError::UnknownRun { run: 0 })));

        store.append(&inputs, 0, &record(0, 0)).unwrap();
        store.append(&inputs, 0, &record(1, 2)).unwrap();
        let state = store.resume(&inputs).unwrap();
        assert_eq!(state.iterations, vec![0, 1]);
        assert_eq!(state.packets, 4);
        assert_eq!(state.next_iteration(), 2);
        assert_eq!(store.state(0).unwrap(), state);

        // Iterations cannot be committed twice
        assert!(store.append(&inputs, 0, &record(1, 4)).is_err());

        assert_eq!(store.snapshot(0, 1).unwrap(), record(1, 2));
        assert!(matches!(
            store.snapshot(0, 5),
            Err(InputOutputError::MissingData { .. })
        ));
        let finals = store.final_states(0).unwrap();
        assert_eq!(finals.packet_number, vec![0, 1, 2, 3]);
        assert_eq!(finals.iteration, vec![0, 0, 1, 1]);
        assert!(store.starting_points(0).unwrap().is_empty());

        // Another geometry is another run
        let mut other = inputs.clone();
        other.geometry.taa = Some(180.0);
        assert_eq!(store.resume(&other).unwrap().run, 1);
        assert_eq!(
            store.index().find(&inputs).map(|entry| entry.fingerprint.to_string()),
            Some("G0-F0-S0-X0-V0-A0-L0-P0-O0".to_string())
        );
    }
}
