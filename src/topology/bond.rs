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

//! Bonds between atoms and their classification into bond types

use std::collections::BTreeMap;
use std::fmt;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Topology;

/// Describes a bond between two atoms
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate, Getters)]
#[serde(transparent)]
pub struct Bond {
    /// Indices of the two atoms in the bond
    #[validate(custom(function = "super::validate_unique_indices"))]
    index: [usize; 2],
}

impl Bond {
    /// Create new bond. This function performs no sanity checks.
    pub const fn new(index: [usize; 2]) -> Self {
        Self { index }
    }
}

/// Adjacency list built from bonds.
///
/// Neighbours appear in the order the bonds were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondGraph {
    neighbors: Vec<Vec<usize>>,
}

impl BondGraph {
    pub fn from_bonds(bonds: &[Bond], num_atoms: usize) -> Self {
        let mut neighbors = vec![Vec::new(); num_atoms];
        for bond in bonds {
            let [i, j] = *bond.index();
            neighbors[i].push(j);
            neighbors[j].push(i);
        }
        Self { neighbors }
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.neighbors[index]
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn num_atoms(&self) -> usize {
        self.neighbors.len()
    }

    /// Atoms with at least two neighbours, i.e. possible angle vertices
    pub fn vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighbors
            .iter()
            .enumerate()
            .filter(|(_, n)| n.len() >= 2)
            .map(|(i, _)| i)
    }
}

/// Bond type given by an unordered pair of atom names.
///
/// The names are stored sorted so that `A-B` and `B-A` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BondType([String; 2]);

impl BondType {
    /// New bond type from two atom names in any order
    pub fn new(first: &str, second: &str) -> Self {
        let mut names = [first.to_string(), second.to_string()];
        names.sort();
        Self(names)
    }

    /// Sorted atom names
    pub fn names(&self) -> &[String; 2] {
        &self.0
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0[0], self.0[1])
    }
}

/// Bond types mapped to the index pairs realizing them
pub type BondTypes = BTreeMap<BondType, Vec<[usize; 2]>>;

/// Group every bond in the topology by its bond type.
///
/// Each edge is visited once, so the number of instances of a type equals the
/// number of physical bonds of that type.
pub fn identify_bonds(topology: &Topology) -> BondTypes {
    let mut bonds = BondTypes::new();
    for bond in topology.bonds() {
        let [i, j] = *bond.index();
        bonds
            .entry(BondType::new(topology.name(i), topology.name(j)))
            .or_default()
            .push([i, j]);
    }
    log::debug!(
        "Found {} bond types in {} bonds",
        bonds.len(),
        topology.bonds().len()
    );
    bonds
}
