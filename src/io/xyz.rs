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

//! Native multi-frame XYZ reader and writer.
//!
//! Each frame is an atom count, a comment line and one `name x y z` line per atom.
//! Frames follow each other directly; blank lines between frames are skipped.

use super::{TrajectoryData, TrajectoryIO};
use crate::{Point, Trajectory};
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug)]
pub(crate) struct XyzFormat;

/// Parse a `name x y z` atom line
fn parse_atom(line: &str, line_number: usize) -> anyhow::Result<(&str, Point)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        anyhow::bail!("Malformed atom line {}: '{}'", line_number, line);
    }
    let coordinate = |i: usize| -> anyhow::Result<f64> {
        parts[i]
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid coordinate '{}' on line {}", parts[i], line_number))
    };
    Ok((parts[0], Point::new(coordinate(1)?, coordinate(2)?, coordinate(3)?)))
}

impl TrajectoryIO for XyzFormat {
    fn read(&self, path: &Path) -> anyhow::Result<TrajectoryData> {
        let file = File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;
        let mut lines = BufReader::new(file)
            .lines()
            .enumerate()
            .map(|(i, line)| line.map(|l| (i + 1, l)));

        let mut names: Vec<String> = Vec::new();
        let mut trajectory = Trajectory::default();

        while let Some(next) = lines.next() {
            let (line_number, count_line) = next?;
            if count_line.trim().is_empty() {
                continue;
            }
            let num_atoms: usize = count_line.trim().parse().map_err(|_| {
                anyhow::anyhow!(
                    "Invalid atom count '{}' on line {} in {}",
                    count_line.trim(),
                    line_number,
                    path.display()
                )
            })?;
            // comment
            lines
                .next()
                .ok_or_else(|| anyhow::anyhow!("Missing comment line in {}", path.display()))??;

            let frame_number = trajectory.len();
            let mut positions = Vec::with_capacity(num_atoms);
            for i in 0..num_atoms {
                let (line_number, line) = lines.next().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Expected {} atoms but found {} in frame {} of {}",
                        num_atoms,
                        i,
                        frame_number,
                        path.display()
                    )
                })??;
                let (name, position) = parse_atom(&line, line_number)
                    .with_context(|| format!("In {}", path.display()))?;
                if frame_number == 0 {
                    names.push(name.to_string());
                } else if names.get(i).map(String::as_str) != Some(name) {
                    anyhow::bail!(
                        "Atom {} is named '{}' in frame {} but '{}' in frame 0 of {}",
                        i,
                        name,
                        frame_number,
                        names.get(i).map_or("", String::as_str),
                        path.display()
                    );
                }
                positions.push(position);
            }
            trajectory.push(positions)?;
        }

        if trajectory.is_empty() {
            anyhow::bail!("Empty XYZ file: {}", path.display());
        }
        Ok(TrajectoryData {
            names,
            bonds: None,
            trajectory,
        })
    }

    fn write(&self, path: &Path, names: &[String], trajectory: &Trajectory) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Cannot open '{}' for writing", path.display()))?;
        let mut writer = BufWriter::new(file);
        for (i, frame) in trajectory.frames().enumerate() {
            writeln!(writer, "{}", names.len())?;
            writeln!(writer, "frame {}", i)?;
            for (name, pos) in names.iter().zip(frame) {
                writeln!(writer, "{} {} {} {}", name, pos.x, pos.y, pos.z)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
