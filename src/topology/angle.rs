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

//! Angles between three consecutively bonded atoms

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::Topology;

/// Angle type given by the names of `first`, `vertex` and `last`.
///
/// A triple and its reverse are the same type; the stored order always has
/// the first endpoint name lexicographically less than or equal to the last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AngleType([String; 3]);

impl AngleType {
    /// New angle type; `vertex` is the atom shared by both bonds
    pub fn new(first: &str, vertex: &str, last: &str) -> Self {
        let names = [first.to_string(), vertex.to_string(), last.to_string()];
        Self(Self::canonical(names))
    }

    fn canonical(mut names: [String; 3]) -> [String; 3] {
        if names[0] > names[2] {
            names.reverse();
        }
        names
    }

    /// Names in canonical order
    pub fn names(&self) -> &[String; 3] {
        &self.0
    }
}

impl fmt::Display for AngleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.0[0], self.0[1], self.0[2])
    }
}

/// Angle types mapped to the `[first, vertex, last]` index triples realizing them
pub type AngleTypes = BTreeMap<AngleType, Vec<[usize; 3]>>;

/// Group every angle in the topology by its angle type.
///
/// Every atom with two or more neighbours acts as a vertex and each unordered
/// pair of its neighbours is one angle. A physical angle is therefore found
/// exactly once, irrespective of the direction it is traversed.
pub fn identify_angles(topology: &Topology) -> AngleTypes {
    let graph = topology.graph();
    let mut angles = AngleTypes::new();
    for vertex in graph.vertices() {
        for (&a, &c) in graph.neighbors(vertex).iter().tuple_combinations() {
            let (first, last) = match topology.name(a).cmp(topology.name(c)) {
                std::cmp::Ordering::Greater => (c, a),
                std::cmp::Ordering::Less => (a, c),
                std::cmp::Ordering::Equal => (a.min(c), a.max(c)),
            };
            let kind = AngleType::new(
                topology.name(first),
                topology.name(vertex),
                topology.name(last),
            );
            angles.entry(kind).or_default().push([first, vertex, last]);
        }
    }
    log::debug!(
        "Found {} angle types in {} angles",
        angles.len(),
        angles.values().map(Vec::len).sum::<usize>()
    );
    angles
}
