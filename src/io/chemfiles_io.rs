// Copyright 2023-2024 Mikael Lund
//
// Licensed under the Apache license, version 2.0 (the "license");
// you may not use this file except in compliance with the license.
// You may obtain a copy of the license at
//
//     http://www.apache.org/licenses/license-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the license is distributed on an "as is" basis,
// without warranties or conditions of any kind, either express or implied.
// See the license for the specific language governing permissions and
// limitations under the license.

//! Chemfiles-based reader/writer for non-XYZ formats.
//!
//! Chemfiles works in ångström; positions are converted to and from nanometers.

use super::{TrajectoryData, TrajectoryIO};
use crate::{Point, Trajectory};
use std::path::Path;

const NANOMETER_PER_ANGSTROM: f64 = 0.1;

#[derive(Debug)]
pub(crate) struct ChemfilesFormat;

impl TrajectoryIO for ChemfilesFormat {
    fn read(&self, path: &Path) -> anyhow::Result<TrajectoryData> {
        let mut file = chemfiles::Trajectory::open(path, 'r')?;
        let num_steps = file.nsteps()?;
        let mut frame = chemfiles::Frame::new();
        let mut data = TrajectoryData::default();

        for step in 0..num_steps {
            file.read(&mut frame)?;
            if step == 0 {
                data.names = frame.iter_atoms().map(|a| a.name()).collect();
                let bonds = frame.topology().bonds();
                if !bonds.is_empty() {
                    data.bonds = Some(bonds);
                }
            }
            let positions = frame
                .positions()
                .iter()
                .map(|pos| Point::new(pos[0], pos[1], pos[2]) * NANOMETER_PER_ANGSTROM)
                .collect();
            data.trajectory.push(positions)?;
        }
        if data.trajectory.is_empty() {
            anyhow::bail!("No frames in {}", path.display());
        }
        Ok(data)
    }

    fn write(&self, path: &Path, names: &[String], trajectory: &Trajectory) -> anyhow::Result<()> {
        let mut file = chemfiles::Trajectory::open(path, 'w')?;
        for positions in trajectory.frames() {
            let mut frame = chemfiles::Frame::new();
            for (name, pos) in names.iter().zip(positions) {
                let pos_arr: [f64; 3] = (*pos / NANOMETER_PER_ANGSTROM).into();
                frame.add_atom(&chemfiles::Atom::new(name.as_str()), pos_arr, None);
            }
            file.write(&frame)?;
        }
        Ok(())
    }
}
