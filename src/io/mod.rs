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

//! Format-agnostic trajectory file I/O.
//!
//! Multi-frame XYZ is always available natively. Other formats require the `chemfiles` feature.
//! All lengths are in nanometers.

#[cfg(feature = "chemfiles")]
mod chemfiles_io;
mod xyz;

use crate::topology::Topology;
use crate::Trajectory;
use std::path::Path;

/// Atom names, frames and, if the file stores them, bonds read from a trajectory file.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryData {
    /// Atom names from the first frame
    pub names: Vec<String>,
    /// Bonds stored in the file, if the format has them
    pub bonds: Option<Vec<[usize; 2]>>,
    pub trajectory: Trajectory,
}

impl TrajectoryData {
    /// Topology from the names and bonds stored in the file
    pub fn topology(&self) -> anyhow::Result<Topology> {
        let bonds = self
            .bonds
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Trajectory file holds no bonds; provide a topology"))?;
        Ok(Topology::new(self.names.iter().cloned(), bonds.iter().copied())?)
    }
}

/// Trait for reading and writing trajectory files.
pub(crate) trait TrajectoryIO: std::fmt::Debug {
    /// Read all frames from a file path.
    fn read(&self, path: &Path) -> anyhow::Result<TrajectoryData>;
    /// Write all frames to a file path, replacing any existing file.
    fn write(&self, path: &Path, names: &[String], trajectory: &Trajectory) -> anyhow::Result<()>;
}

/// Return a reader/writer for the given file path based on its extension.
/// XYZ is always available. Other formats require the `chemfiles` feature.
pub(crate) fn format_for_path(path: &Path) -> anyhow::Result<Box<dyn TrajectoryIO>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xyz") => Ok(Box::new(xyz::XyzFormat)),
        #[cfg(feature = "chemfiles")]
        Some(_) => Ok(Box::new(chemfiles_io::ChemfilesFormat)),
        #[cfg(not(feature = "chemfiles"))]
        Some(ext) => anyhow::bail!("Format '.{ext}' requires the `chemfiles` feature"),
        None => anyhow::bail!("Cannot determine format: no file extension"),
    }
}

/// Read a trajectory file, auto-detecting format.
pub fn read_trajectory(path: impl AsRef<Path>) -> anyhow::Result<TrajectoryData> {
    let path = path.as_ref();
    let data = format_for_path(path)?.read(path)?;
    log::debug!(
        "Read {} frames of {} atoms from {}",
        data.trajectory.len(),
        data.names.len(),
        path.display()
    );
    Ok(data)
}

/// Write a trajectory file, auto-detecting format.
pub fn write_trajectory(
    path: impl AsRef<Path>,
    names: &[String],
    trajectory: &Trajectory,
) -> anyhow::Result<()> {
    if names.len() != trajectory.num_atoms() && !trajectory.is_empty() {
        anyhow::bail!(
            "{} names given for frames of {} atoms",
            names.len(),
            trajectory.num_atoms()
        );
    }
    format_for_path(path.as_ref())?.write(path.as_ref(), names, trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_for_xyz() {
        assert!(format_for_path(Path::new("traj.xyz")).is_ok());
    }

    #[test]
    fn format_for_no_extension() {
        assert!(format_for_path(Path::new("noext")).is_err());
    }

    #[test]
    #[cfg(not(feature = "chemfiles"))]
    fn format_for_dcd_without_chemfiles() {
        let err = format_for_path(Path::new("traj.dcd")).err().unwrap();
        assert!(err.to_string().contains("chemfiles"));
    }

    #[test]
    fn topology_needs_bonds() {
        let data = TrajectoryData {
            names: vec!["A".into(), "B".into()],
            ..Default::default()
        };
        assert!(data.topology().is_err());
        let data = TrajectoryData {
            bonds: Some(vec![[0, 1]]),
            ..data
        };
        assert_eq!(data.topology().unwrap().bonds().len(), 1);
    }

    #[test]
    fn names_must_match_frames() {
        let dir = tempfile::tempdir().unwrap();
        let trajectory = Trajectory::new(vec![vec![crate::Point::zeros(); 3]]).unwrap();
        let names = vec!["A".to_string()];
        assert!(write_trajectory(dir.path().join("t.xyz"), &names, &trajectory).is_err());
    }
}
