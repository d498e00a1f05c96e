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

use super::index::InputIndex;
use super::inputs::RunInputs;
use super::store::{IterationRecord, RunState, Store};
use super::watermark::pq_writer;
use super::{ArrowSnafu, InputOutputError, MissingDataSnafu, ParquetSnafu, StdIOSnafu, UnknownRunSnafu};
use crate::linalg::Vector3;
use crate::mc::StartingPoints;
use crate::state::PacketBatch;
use arrow::array::{Array, ArrayRef, Float64Array, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use snafu::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INDEX_FILE: &str = "index.yaml";
const TMP_EXTENSION: &str = "tmp";
const HIT_PREFIX: &str = "hit_";

const STARTING_POINT: &str = "starting_point";
const INITIAL_STATE: &str = "initial_state";
const FINAL_STATE: &str = "final_state";
const TRAJECTORY: &str = "trajectory";

/// Store of runs on disk: an index of the inputs at the root, and one directory of Parquet files per run with one
/// file per iteration and group.
///
/// ```text
/// <root>/index.yaml
/// <root>/run_<id>/it<iteration>_starting_point.parquet
/// <root>/run_<id>/it<iteration>_initial_state.parquet
/// <root>/run_<id>/it<iteration>_final_state.parquet
/// <root>/run_<id>/it<iteration>_trajectory.parquet    (fixed step runs)
/// ```
#[derive(Debug)]
pub struct ParquetStore {
    root: PathBuf,
    index: InputIndex,
}

impl ParquetStore {
    /// Opens or creates the store at `root`, discarding the files of iterations that were never committed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, InputOutputError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).context(StdIOSnafu {
            action: "creating the store directory",
        })?;
        let index = InputIndex::load(root.join(INDEX_FILE))?;
        let store = Self { root, index };
        store.discard_partial()?;
        info!(
            "opened packet store {} with {} runs",
            store.root.display(),
            store.index.runs().len()
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &InputIndex {
        &self.index
    }

    pub fn run_dir(&self, run: u64) -> PathBuf {
        self.root.join(format!("run_{run}"))
    }

    fn group_path(&self, run: u64, iteration: u32, group: &str) -> PathBuf {
        self.run_dir(run).join(format!("it{iteration}_{group}.parquet"))
    }

    /// Removes temporary files and files of iterations missing from the index.
    fn discard_partial(&self) -> Result<(), InputOutputError> {
        let dirs = fs::read_dir(&self.root).context(StdIOSnafu {
            action: "listing the store directory",
        })?;
        for dir in dirs {
            let dir = dir
                .context(StdIOSnafu {
                    action: "listing the store directory",
                })?
                .path();
            let run = match dir
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix("run_"))
                .and_then(|id| id.parse::<u64>().ok())
            {
                Some(run) if dir.is_dir() => run,
                _ => continue,
            };
            let committed = self
                .index
                .entry(run)
                .map(|entry| entry.iterations.clone())
                .unwrap_or_default();

            let files = fs::read_dir(&dir).context(StdIOSnafu {
                action: "listing a run directory",
            })?;
            for file in files {
                let path = file
                    .context(StdIOSnafu {
                        action: "listing a run directory",
                    })?
                    .path();
                let partial = path.extension().map_or(false, |ext| ext == TMP_EXTENSION)
                    || iteration_of(&path).map_or(false, |it| !committed.contains(&it));
                if partial {
                    warn!("discarding uncommitted {}", path.display());
                    fs::remove_file(&path).context(StdIOSnafu {
                        action: "discarding an uncommitted file",
                    })?;
                }
            }
        }
        Ok(())
    }

    fn write_group(
        &self,
        run: u64,
        iteration: u32,
        group: &'static str,
        batch: RecordBatch,
    ) -> Result<(PathBuf, PathBuf), InputOutputError> {
        let path = self.group_path(run, iteration, group);
        let tmp = path.with_extension(format!("parquet.{TMP_EXTENSION}"));

        let mut metadata = HashMap::new();
        metadata.insert("Purpose".to_string(), "Exosphere packets".to_string());
        metadata.insert("Group".to_string(), group.to_string());
        metadata.insert("Run".to_string(), run.to_string());
        metadata.insert("Iteration".to_string(), iteration.to_string());

        let file = File::create(&tmp).context(StdIOSnafu {
            action: "creating a packet file",
        })?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), pq_writer(Some(metadata))).context(
            ParquetSnafu {
                action: "opening a packet file for writing",
            },
        )?;
        writer.write(&batch).context(ParquetSnafu {
            action: "writing packets",
        })?;
        writer.close().context(ParquetSnafu {
            action: "closing a packet file",
        })?;
        Ok((tmp, path))
    }
}

/// Iteration number encoded in a packet file name.
fn iteration_of(path: &Path) -> Option<u32> {
    let stem = path.file_name()?.to_str()?;
    let digits = stem.strip_prefix("it")?.split('_').next()?;
    digits.parse().ok()
}

impl Store for ParquetStore {
    fn resume(&self, inputs: &RunInputs) -> Result<RunState, InputOutputError> {
        Ok(match self.index.find(inputs) {
            Some(entry) => {
                info!(
                    "resuming run #{} ({}) after {} iterations",
                    entry.run,
                    entry.fingerprint,
                    entry.iterations.len()
                );
                entry.into()
            }
            None => RunState {
                run: self.index.next_run_id(),
                ..Default::default()
            },
        })
    }

    fn append(&mut self, inputs: &RunInputs, run: u64, record: &IterationRecord) -> Result<(), InputOutputError> {
        fs::create_dir_all(self.run_dir(run)).context(StdIOSnafu {
            action: "creating a run directory",
        })?;
        let mut written = vec![
            self.write_group(run, record.iteration, STARTING_POINT, points_to_record(&record.starting_points)?)?,
            self.write_group(run, record.iteration, INITIAL_STATE, packets_to_record(&record.initial_state)?)?,
            self.write_group(run, record.iteration, FINAL_STATE, packets_to_record(&record.final_state)?)?,
        ];
        if let Some(trajectory) = &record.trajectory {
            written.push(self.write_group(run, record.iteration, TRAJECTORY, packets_to_record(trajectory)?)?);
        }
        for (tmp, path) in &written {
            fs::rename(tmp, path).context(StdIOSnafu {
                action: "committing a packet file",
            })?;
        }

        let mut index = self.index.clone();
        index.commit(inputs, run, record.iteration, record.len() as u64)?;
        index.save(self.root.join(INDEX_FILE))?;
        self.index = index;
        debug!(
            "committed iteration {} of run #{run} ({} packets)",
            record.iteration,
            record.len()
        );
        Ok(())
    }

    fn state(&self, run: u64) -> Result<RunState, InputOutputError> {
        self.index
            .entry(run)
            .map(RunState::from)
            .context(UnknownRunSnafu { run })
    }

    fn snapshot(&self, run: u64, iteration: u32) -> Result<IterationRecord, InputOutputError> {
        let state = self.state(run)?;
        if !state.iterations.contains(&iteration) {
            return Err(InputOutputError::MissingData {
                which: format!("iteration {iteration} of run #{run}"),
            });
        }
        let trajectory_path = self.group_path(run, iteration, TRAJECTORY);
        let trajectory = if trajectory_path.exists() {
            Some(packets_from_records(&read_records(&trajectory_path)?)?)
        } else {
            None
        };
        Ok(IterationRecord {
            iteration,
            starting_points: points_from_records(&read_records(&self.group_path(run, iteration, STARTING_POINT))?)?,
            initial_state: packets_from_records(&read_records(&self.group_path(run, iteration, INITIAL_STATE))?)?,
            final_state: packets_from_records(&read_records(&self.group_path(run, iteration, FINAL_STATE))?)?,
            trajectory,
        })
    }
}

fn f64_field(name: &str) -> Field {
    Field::new(name, DataType::Float64, false)
}

fn f64_array(values: &[f64]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

fn f64_component(values: &[Vector3<f64>], k: usize) -> ArrayRef {
    Arc::new(Float64Array::from(
        values.iter().map(|value| value[k]).collect::<Vec<f64>>(),
    ))
}

fn bookkeeping_fields() -> [Field; 2] {
    [
        Field::new("iteration", DataType::UInt32, false),
        Field::new("packet_number", DataType::UInt64, false),
    ]
}

fn points_to_record(points: &StartingPoints) -> Result<RecordBatch, InputOutputError> {
    let float_columns: [(&str, &[f64]); 8] = [
        ("time", &points.time),
        ("longitude", &points.longitude),
        ("latitude", &points.latitude),
        ("local_time", &points.local_time),
        ("radius", &points.radius),
        ("speed", &points.speed_km_s),
        ("altitude", &points.altitude),
        ("azimuth", &points.azimuth),
    ];
    let mut fields: Vec<Field> = float_columns.iter().map(|(name, _)| f64_field(name)).collect();
    fields.extend(bookkeeping_fields());
    let mut columns: Vec<ArrayRef> = float_columns.iter().map(|(_, values)| f64_array(values)).collect();
    columns.push(Arc::new(UInt32Array::from(points.iteration.clone())));
    columns.push(Arc::new(UInt64Array::from(points.packet_number.clone())));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu {
        action: "building the starting points table",
    })
}

fn packets_to_record(batch: &PacketBatch) -> Result<RecordBatch, InputOutputError> {
    let mut fields: Vec<Field> = ["time", "x", "y", "z", "vx", "vy", "vz", "frac", "escaped", "ionized"]
        .iter()
        .map(|name| f64_field(name))
        .collect();
    let mut columns = vec![
        f64_array(&batch.time),
        f64_component(&batch.x, 0),
        f64_component(&batch.x, 1),
        f64_component(&batch.x, 2),
        f64_component(&batch.v, 0),
        f64_component(&batch.v, 1),
        f64_component(&batch.v, 2),
        f64_array(&batch.frac),
        f64_array(&batch.escaped),
        f64_array(&batch.ionized),
    ];
    for (body, hit) in batch.hit_bodies.iter().zip(&batch.hit) {
        fields.push(f64_field(&format!("{HIT_PREFIX}{body}")));
        columns.push(f64_array(hit));
    }
    fields.extend(bookkeeping_fields());
    columns.push(Arc::new(UInt32Array::from(batch.iteration.clone())));
    columns.push(Arc::new(UInt64Array::from(batch.packet_number.clone())));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu {
        action: "building a packet table",
    })
}

fn read_records(path: &Path) -> Result<Vec<RecordBatch>, InputOutputError> {
    let file = File::open(path).context(StdIOSnafu {
        action: "opening a packet file",
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context(ParquetSnafu {
            action: "reading the schema of a packet file",
        })?
        .build()
        .context(ParquetSnafu {
            action: "reading a packet file",
        })?;
    reader
        .map(|batch| {
            batch.context(ArrowSnafu {
                action: "reading a batch of packets",
            })
        })
        .collect()
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, InputOutputError> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<T>())
        .context(MissingDataSnafu { which: name })
}

fn f64_values(batch: &RecordBatch, name: &str) -> Result<Vec<f64>, InputOutputError> {
    Ok(column::<Float64Array>(batch, name)?.values().to_vec())
}

fn vectors(batch: &RecordBatch, names: [&str; 3]) -> Result<Vec<Vector3<f64>>, InputOutputError> {
    let x = column::<Float64Array>(batch, names[0])?;
    let y = column::<Float64Array>(batch, names[1])?;
    let z = column::<Float64Array>(batch, names[2])?;
    Ok((0..batch.num_rows())
        .map(|i| Vector3::new(x.value(i), y.value(i), z.value(i)))
        .collect())
}

fn points_from_records(records: &[RecordBatch]) -> Result<StartingPoints, InputOutputError> {
    let mut points = StartingPoints::default();
    for batch in records {
        points.extend(&StartingPoints {
            time: f64_values(batch, "time")?,
            longitude: f64_values(batch, "longitude")?,
            latitude: f64_values(batch, "latitude")?,
            local_time: f64_values(batch, "local_time")?,
            radius: f64_values(batch, "radius")?,
            speed_km_s: f64_values(batch, "speed")?,
            altitude: f64_values(batch, "altitude")?,
            azimuth: f64_values(batch, "azimuth")?,
            iteration: column::<UInt32Array>(batch, "iteration")?.values().to_vec(),
            packet_number: column::<UInt64Array>(batch, "packet_number")?.values().to_vec(),
        });
    }
    Ok(points)
}

fn packets_from_records(records: &[RecordBatch]) -> Result<PacketBatch, InputOutputError> {
    let mut packets: Option<PacketBatch> = None;
    for batch in records {
        let hit_bodies: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .filter_map(|field| field.name().strip_prefix(HIT_PREFIX).map(str::to_string))
            .collect();
        let hit = hit_bodies
            .iter()
            .map(|body| f64_values(batch, &format!("{HIT_PREFIX}{body}")))
            .collect::<Result<Vec<_>, _>>()?;
        let part = PacketBatch {
            time: f64_values(batch, "time")?,
            x: vectors(batch, ["x", "y", "z"])?,
            v: vectors(batch, ["vx", "vy", "vz"])?,
            frac: f64_values(batch, "frac")?,
            escaped: f64_values(batch, "escaped")?,
            ionized: f64_values(batch, "ionized")?,
            hit,
            hit_bodies,
            iteration: column::<UInt32Array>(batch, "iteration")?.values().to_vec(),
            packet_number: column::<UInt64Array>(batch, "packet_number")?.values().to_vec(),
        };
        match packets.as_mut() {
            Some(packets) => {
                if packets.hit_bodies != part.hit_bodies {
                    return Err(InputOutputError::Inconsistency {
                        msg: "packet file batches track different bodies".to_string(),
                    });
                }
                packets.extend(&part);
            }
            None => packets = Some(part),
        }
    }
    Ok(packets.unwrap_or_default())
}

#[cfg(test)]
mod ut_parquet_store {
    use super::*;
    use crate::io::ConfigRepr;
    use crate::state::Packet;

    fn inputs() -> RunInputs {
        RunInputs::loads(
            r#"
geometry: {central_body: Mercury, taa: 0.0}
spatial: {type: uniform}
speed: {type: flat, vmin: 1.0, vmax: 2.0}
angular: {type: radial}
options: {runtime: 3600.0, species: Na, n_packets: 3, step_size: 60.0}
"#,
        )
        .unwrap()
    }

    fn record(iteration: u32) -> IterationRecord {
        let bodies = vec!["Mercury".to_string()];
        let mut initial_state = PacketBatch::new(bodies.clone());
        for k in 0..3 {
            initial_state.push(Packet::new(
                -100.0 * (k + 1) as f64,
                Vector3::new(1.0, 0.0, 0.1 * k as f64),
                Vector3::new(1e-3, 0.0, 0.0),
                1,
                iteration,
                3 * iteration as u64 + k,
            ));
        }
        let mut final_state = initial_state.clone();
        final_state.time = vec![0.0; 3];
        final_state.frac = vec![0.5, 0.0, 0.75];
        final_state.ionized = vec![0.5, 0.0, 0.0];
        final_state.hit[0] = vec![0.0, 1.0, 0.25];

        IterationRecord {
            iteration,
            starting_points: StartingPoints {
                time: initial_state.time.clone(),
                longitude: vec![0.0, 1.0, 2.0],
                latitude: vec![0.0, 0.1, -0.1],
                local_time: vec![12.0, 13.0, 14.0],
                radius: vec![1.0; 3],
                speed_km_s: vec![1.5; 3],
                altitude: vec![0.5; 3],
                azimuth: vec![0.0; 3],
                iteration: vec![iteration; 3],
                packet_number: initial_state.packet_number.clone(),
            },
            trajectory: Some(final_state.clone()),
            initial_state,
            final_state,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("exosphere-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn append_and_read_back() {
        let dir = scratch("pq-append");
        let inputs = inputs();
        let mut store = ParquetStore::open(&dir).unwrap();
        let state = store.resume(&inputs).unwrap();
        assert_eq!(state.run, 0);
        assert_eq!(state.next_iteration(), 0);

        store.append(&inputs, 0, &record(0)).unwrap();
        store.append(&inputs, 0, &record(1)).unwrap();
        assert!(dir.join("index.yaml").exists());
        assert!(dir.join("run_0/it1_final_state.parquet").exists());

        // A fresh handle sees the committed iterations
        let store = ParquetStore::open(&dir).unwrap();
        let state = store.resume(&inputs).unwrap();
        assert_eq!(state.iterations, vec![0, 1]);
        assert_eq!(state.packets, 6);
        assert_eq!(state.next_iteration(), 2);

        assert_eq!(store.snapshot(0, 1).unwrap(), record(1));
        let finals = store.final_states(0).unwrap();
        assert_eq!(finals.len(), 6);
        assert_eq!(finals.hit_bodies, vec!["Mercury".to_string()]);
        assert!(finals.check_conservation(1e-12).is_none());
        assert_eq!(store.starting_points(0).unwrap().packet_number, vec![0, 1, 2, 3, 4, 5]);

        assert!(matches!(store.state(7), Err(InputOutputError::UnknownRun { run: 7 })));
        assert!(matches!(store.snapshot(0, 5), Err(InputOutputError::MissingData { .. })));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn partial_iterations_are_discarded() {
        let dir = scratch("pq-partial");
        let inputs = inputs();
        let mut store = ParquetStore::open(&dir).unwrap();
        store.append(&inputs, 0, &record(0)).unwrap();

        // An interrupted iteration: one renamed file and one temporary file, neither in the index
        fs::write(dir.join("run_0/it1_starting_point.parquet"), b"partial").unwrap();
        fs::write(dir.join("run_0/it1_final_state.parquet.tmp"), b"partial").unwrap();

        let store = ParquetStore::open(&dir).unwrap();
        assert!(!dir.join("run_0/it1_starting_point.parquet").exists());
        assert!(!dir.join("run_0/it1_final_state.parquet.tmp").exists());
        assert!(dir.join("run_0/it0_final_state.parquet").exists());
        assert_eq!(store.resume(&inputs).unwrap().next_iteration(), 1);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_names() {
        assert_eq!(iteration_of(Path::new("run_0/it12_final_state.parquet")), Some(12));
        assert_eq!(iteration_of(Path::new("run_0/notes.txt")), None);
    }
}
