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

//! Topology module for storing the named atoms and the bonds connecting them.
//!
//! The topology is the bond graph of the coarse-grained model.
//! Notably it _does not_ include positions; these live in the [`Trajectory`](crate::Trajectory).
//!
//! Bond and angle _types_ are equivalence classes of bonds and angles that share
//! the same pattern of atom names:
//!
//! - [`identify_bonds`] groups every edge by its sorted pair of names.
//! - [`identify_angles`] groups every two-edge path by its name triple, where a triple
//!   and its reverse are the same type.
//!
//! # Examples
//! ~~~
//! use cgbonds::topology::*;
//! let top = Topology::new(["A", "B", "A"], [[0, 1], [2, 1]]).unwrap();
//! let bonds = identify_bonds(&top);
//! assert_eq!(bonds.len(), 1);
//! assert_eq!(bonds[&BondType::new("B", "A")].len(), 2);
//!
//! let angles = identify_angles(&top);
//! assert_eq!(angles[&AngleType::new("A", "B", "A")], vec![[0, 1, 2]]);
//! ~~~

mod angle;
mod bond;

use std::collections::HashSet;

pub use angle::*;
pub use bond::*;
use serde::{Deserialize, Serialize};
use unordered_pair::UnorderedPair;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};

/// A named atom or coarse-grained bead.
///
/// The index refers to the position of the atom in every trajectory frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom<'a> {
    /// Atom name used to classify bonds and angles
    pub name: &'a str,
    /// Index in the coordinate arrays
    pub index: usize,
}

/// Raw, unchecked topology as read from YAML
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct RawTopology {
    #[validate(custom(function = "validate_names"))]
    atoms: Vec<String>,
    #[serde(default)]
    bonds: Vec<Bond>,
}

/// Immutable bond graph of named atoms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTopology")]
pub struct Topology {
    /// Atom names, indexed by atom index
    atoms: Vec<String>,
    /// Unique bonds
    bonds: Vec<Bond>,
    /// Adjacency list built from `bonds`
    #[serde(skip)]
    graph: BondGraph,
}

impl TryFrom<RawTopology> for Topology {
    type Error = Error;
    fn try_from(raw: RawTopology) -> Result<Self> {
        raw.validate()
            .map_err(|e| Error::InvalidTopology(e.to_string()))?;
        Self::from_parts(raw.atoms, raw.bonds)
    }
}

impl Topology {
    /// Create a topology from atom names and bonded index pairs.
    ///
    /// Will error if an atom name is empty, if a bond refers to an
    /// unknown atom or if a bond connects an atom to itself.
    /// Repeated bonds, in any direction, are kept only once.
    pub fn new<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        bonds: impl IntoIterator<Item = [usize; 2]>,
    ) -> Result<Self> {
        let atoms: Vec<String> = names.into_iter().map(Into::into).collect();
        validate_names(&atoms).map_err(|e| Error::InvalidTopology(e.to_string()))?;
        Self::from_parts(atoms, bonds.into_iter().map(Bond::new).collect())
    }

    fn from_parts(atoms: Vec<String>, bonds: Vec<Bond>) -> Result<Self> {
        let num_atoms = atoms.len();
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(bonds.len());
        for bond in bonds {
            bond.validate().map_err(|_| {
                Error::InvalidTopology(format!("bond {:?} connects an atom to itself", bond.index()))
            })?;
            if let Some(i) = bond.index().iter().find(|&&i| i >= num_atoms) {
                return Err(Error::InvalidTopology(format!(
                    "bond {:?} refers to atom {} but the topology has {} atoms",
                    bond.index(),
                    i,
                    num_atoms
                )));
            }
            let [i, j] = *bond.index();
            if seen.insert(UnorderedPair(i, j)) {
                unique.push(bond);
            } else {
                log::debug!("Ignoring repeated bond {}-{}", i, j);
            }
        }
        let graph = BondGraph::from_bonds(&unique, num_atoms);
        Ok(Self {
            atoms,
            bonds: unique,
            graph,
        })
    }

    /// Load topology from a YAML file with `atoms` and `bonds` keys.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("Cannot open '{}': {}", path.display(), e))?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Number of atoms
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Name of the atom with the given index
    pub fn name(&self, index: usize) -> &str {
        &self.atoms[index]
    }

    /// Iterate over all atoms
    pub fn atoms(&self) -> impl Iterator<Item = Atom<'_>> + '_ {
        self.atoms.iter().enumerate().map(|(index, name)| Atom {
            name: name.as_str(),
            index,
        })
    }

    /// Unique bonds
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Adjacency list of the bond graph
    pub fn graph(&self) -> &BondGraph {
        &self.graph
    }
}

/// Validate that all atoms carry a non-empty name.
fn validate_names(names: &[String]) -> core::result::Result<(), ValidationError> {
    if names.iter().any(|name| name.trim().is_empty()) {
        Err(ValidationError::new("empty atom name"))
    } else {
        Ok(())
    }
}

/// Validate that the provided atom indices are unique.
/// Used to validate that a bond does not connect one and the same atom.
fn validate_unique_indices(indices: &[usize]) -> core::result::Result<(), ValidationError> {
    if indices
        .iter()
        .enumerate()
        .any(|(i, a)| indices.iter().skip(i + 1).any(|b| a == b))
    {
        Err(ValidationError::new("non-unique atom indices"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_bonds_are_merged() {
        let top = Topology::new(["A", "B", "C"], [[0, 1], [1, 0], [1, 2], [0, 1]]).unwrap();
        assert_eq!(top.bonds().len(), 2);
        assert_eq!(top.graph().neighbors(1).len(), 2);
        assert_eq!(top.graph().neighbors(0), &[1]);
    }

    #[test]
    fn invalid_topologies() {
        assert!(matches!(
            Topology::new(["A", "B"], [[0, 2]]),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            Topology::new(["A", "B"], [[1, 1]]),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            Topology::new(["A", " "], [[0, 1]]),
            Err(Error::InvalidTopology(_))
        ));
    }

    #[test]
    fn atoms_iterator() {
        let top = Topology::new(["A", "B"], [[0, 1]]).unwrap();
        let atoms: Vec<_> = top.atoms().collect();
        assert_eq!(atoms[1], Atom { name: "B", index: 1 });
        assert_eq!(top.num_atoms(), 2);
        assert_eq!(top.name(0), "A");
    }

    #[test]
    fn deserialize_yaml() {
        let yaml = r#"
atoms: [C1, C2, C3, C1]
bonds: [[0, 1], [1, 2], [2, 3]]
"#;
        let top: Topology = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(top.num_atoms(), 4);
        assert_eq!(top.bonds().len(), 3);
        assert_eq!(top.graph().neighbors(2), &[1, 3]);
    }

    #[test]
    fn deserialize_yaml_out_of_range() {
        let yaml = r#"
atoms: [C1, C2]
bonds: [[0, 5]]
"#;
        assert!(serde_yaml::from_str::<Topology>(yaml).is_err());
    }

    #[test]
    fn unique_indices() {
        assert!(validate_unique_indices(&[0, 1, 2]).is_ok());
        assert!(validate_unique_indices(&[0, 1, 0]).is_err());
    }
}
