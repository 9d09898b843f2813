// Copyright 2023 Mikael Lund
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

//! Sampled atomic positions and the geometry measured on them.

use crate::error::{Error, Result};
use crate::{Point, PositionVec};

/// Ordered sequence of frames, each with one position per atom index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    frames: Vec<PositionVec>,
    num_atoms: usize,
}

impl Trajectory {
    /// Create trajectory from frames that must all hold the same number of positions.
    pub fn new(frames: Vec<PositionVec>) -> Result<Self> {
        let num_atoms = frames.first().map_or(0, Vec::len);
        if let Some((i, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.len() != num_atoms)
        {
            return Err(Error::InvalidTopology(format!(
                "frame {} has {} positions but frame 0 has {}",
                i,
                frame.len(),
                num_atoms
            )));
        }
        Ok(Self { frames, num_atoms })
    }

    /// Append a frame, checking that its size matches earlier frames
    pub fn push(&mut self, frame: PositionVec) -> Result<()> {
        if self.frames.is_empty() {
            self.num_atoms = frame.len();
        } else if frame.len() != self.num_atoms {
            return Err(Error::InvalidTopology(format!(
                "frame has {} positions but trajectory expects {}",
                frame.len(),
                self.num_atoms
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if there are no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of positions in each frame
    pub const fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// Positions of the i-th frame
    pub fn frame(&self, i: usize) -> &[Point] {
        &self.frames[i]
    }

    /// Iterate over frames
    pub fn frames(&self) -> impl Iterator<Item = &[Point]> + '_ {
        self.frames.iter().map(Vec::as_slice)
    }

    /// Distances between `pairs` of atoms in every frame, instance-major within each frame
    pub fn distances<'a>(&'a self, pairs: &'a [[usize; 2]]) -> impl Iterator<Item = f64> + 'a {
        self.frames().flat_map(move |positions| {
            pairs
                .iter()
                .map(move |&[i, j]| distance(&positions[i], &positions[j]))
        })
    }

    /// Angles (radians) of `[first, vertex, last]` triples in every frame
    pub fn angles<'a>(&'a self, triplets: &'a [[usize; 3]]) -> impl Iterator<Item = f64> + 'a {
        self.frames().flat_map(move |positions| {
            triplets
                .iter()
                .map(move |&[i, j, k]| angle(&positions[i], &positions[j], &positions[k]))
        })
    }
}

/// Euclidean distance between two points
pub fn distance(a: &Point, b: &Point) -> f64 {
    (a - b).norm()
}

/// Angle (radians) at `vertex` between the vectors pointing to `first` and `last`.
///
/// Returns a value in `[0, π]`; zero-length arms give NaN.
pub fn angle(first: &Point, vertex: &Point, last: &Point) -> f64 {
    let u = first - vertex;
    let v = last - vertex;
    let cosine = u.dot(&v) / (u.norm() * v.norm());
    cosine.clamp(-1.0, 1.0).acos()
}
