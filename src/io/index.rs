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

use super::inputs::{
    AngularInputs, ForcesInputs, GeometryInputs, LossInputs, Matches, RunInputs, SimulationOptions, SpatialInputs,
    SpeedInputs, SurfaceInputs,
};
use super::{InputOutputError, StdIOSnafu, YamlSnafu};
use crate::plasma::PlasmaModel;
use serde_derive::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Identifiers of the stored input groups of a run. Two sets of inputs that match group by group share a
/// fingerprint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub geometry: usize,
    pub forces: usize,
    pub surface: usize,
    pub spatial: usize,
    pub speed: usize,
    pub angular: usize,
    pub loss: usize,
    pub plasma: usize,
    pub options: usize,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "G{}-F{}-S{}-X{}-V{}-A{}-L{}-P{}-O{}",
            self.geometry,
            self.forces,
            self.surface,
            self.spatial,
            self.speed,
            self.angular,
            self.loss,
            self.plasma,
            self.options
        )
    }
}

/// One row of the inputs table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub run: u64,
    pub fingerprint: Fingerprint,
    /// Committed iterations, in commit order
    #[serde(default)]
    pub iterations: Vec<u32>,
    #[serde(default)]
    pub packets: u64,
}

impl RunEntry {
    /// Iteration number following the last committed one.
    pub fn next_iteration(&self) -> u32 {
        self.iterations.iter().max().map_or(0, |it| it + 1)
    }
}

fn position<T: Matches>(groups: &[T], item: &T) -> Option<usize> {
    groups.iter().position(|group| group.matches(item))
}

fn position_or_insert<T: Matches + Clone>(groups: &mut Vec<T>, item: &T) -> usize {
    position(groups, item).unwrap_or_else(|| {
        groups.push(item.clone());
        groups.len() - 1
    })
}

/// Database of the runs of a store: every input group is stored once and the inputs table maps the tuple of group
/// identifiers to a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputIndex {
    #[serde(default)]
    geometry: Vec<GeometryInputs>,
    #[serde(default)]
    forces: Vec<ForcesInputs>,
    #[serde(default)]
    surface: Vec<SurfaceInputs>,
    #[serde(default)]
    spatial: Vec<SpatialInputs>,
    #[serde(default)]
    speed: Vec<SpeedInputs>,
    #[serde(default)]
    angular: Vec<AngularInputs>,
    #[serde(default)]
    loss: Vec<LossInputs>,
    #[serde(default)]
    plasma: Vec<PlasmaModel>,
    #[serde(default)]
    options: Vec<SimulationOptions>,
    #[serde(default)]
    inputs: Vec<RunEntry>,
}

impl InputIndex {
    /// Loads the index from a YAML file, or returns an empty index when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InputOutputError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no index at {}, starting afresh", path.display());
            return Ok(Self::default());
        }
        let file = File::open(path).context(StdIOSnafu {
            action: "opening the run index",
        })?;
        serde_yaml::from_reader(BufReader::new(file)).context(YamlSnafu {
            action: "reading the run index",
        })
    }

    /// Writes the index next to `path` then moves it in place, so that readers never see a partial index.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), InputOutputError> {
        let path = path.as_ref();
        let tmp = path.with_extension("yaml.tmp");
        {
            let file = File::create(&tmp).context(StdIOSnafu {
                action: "creating the run index",
            })?;
            serde_yaml::to_writer(BufWriter::new(file), self).context(YamlSnafu {
                action: "writing the run index",
            })?;
        }
        fs::rename(&tmp, path).context(StdIOSnafu {
            action: "committing the run index",
        })
    }

    /// Fingerprint of these inputs if every group is already stored.
    pub fn fingerprint(&self, inputs: &RunInputs) -> Option<Fingerprint> {
        Some(Fingerprint {
            geometry: position(&self.geometry, &inputs.geometry)?,
            forces: position(&self.forces, &inputs.forces)?,
            surface: position(&self.surface, &inputs.surface)?,
            spatial: position(&self.spatial, &inputs.spatial)?,
            speed: position(&self.speed, &inputs.speed)?,
            angular: position(&self.angular, &inputs.angular)?,
            loss: position(&self.loss, &inputs.loss)?,
            plasma: position(&self.plasma, &inputs.plasma)?,
            options: position(&self.options, &inputs.options)?,
        })
    }

    /// Stores the groups of these inputs that are not known yet and returns their fingerprint.
    pub fn register(&mut self, inputs: &RunInputs) -> Fingerprint {
        Fingerprint {
            geometry: position_or_insert(&mut self.geometry, &inputs.geometry),
            forces: position_or_insert(&mut self.forces, &inputs.forces),
            surface: position_or_insert(&mut self.surface, &inputs.surface),
            spatial: position_or_insert(&mut self.spatial, &inputs.spatial),
            speed: position_or_insert(&mut self.speed, &inputs.speed),
            angular: position_or_insert(&mut self.angular, &inputs.angular),
            loss: position_or_insert(&mut self.loss, &inputs.loss),
            plasma: position_or_insert(&mut self.plasma, &inputs.plasma),
            options: position_or_insert(&mut self.options, &inputs.options),
        }
    }

    /// The run these inputs belong to, if any iteration of it was committed.
    pub fn find(&self, inputs: &RunInputs) -> Option<&RunEntry> {
        let fingerprint = self.fingerprint(inputs)?;
        self.inputs.iter().find(|entry| entry.fingerprint == fingerprint)
    }

    pub fn entry(&self, run: u64) -> Option<&RunEntry> {
        self.inputs.iter().find(|entry| entry.run == run)
    }

    pub fn runs(&self) -> &[RunEntry] {
        &self.inputs
    }

    /// Identifier given to the next new run.
    pub fn next_run_id(&self) -> u64 {
        self.inputs.iter().map(|entry| entry.run + 1).max().unwrap_or(0)
    }

    /// Records a committed iteration of `packets` packets, creating the run entry on its first iteration.
    pub fn commit(
        &mut self,
        inputs: &RunInputs,
        run: u64,
        iteration: u32,
        packets: u64,
    ) -> Result<&RunEntry, InputOutputError> {
        let fingerprint = self.register(inputs);
        let idx = match self.inputs.iter().position(|entry| entry.run == run) {
            Some(idx) => {
                if self.inputs[idx].fingerprint != fingerprint {
                    return Err(InputOutputError::Inconsistency {
                        msg: format!(
                            "run #{run} has fingerprint {} but the inputs have {fingerprint}",
                            self.inputs[idx].fingerprint
                        ),
                    });
                }
                idx
            }
            None => {
                self.inputs.push(RunEntry {
                    run,
                    fingerprint,
                    iterations: Vec::new(),
                    packets: 0,
                });
                self.inputs.len() - 1
            }
        };
        let entry = &mut self.inputs[idx];
        if entry.iterations.contains(&iteration) {
            return Err(InputOutputError::Inconsistency {
                msg: format!("iteration {iteration} of run #{run} is already committed"),
            });
        }
        entry.iterations.push(iteration);
        entry.packets += packets;
        Ok(&self.inputs[idx])
    }
}
