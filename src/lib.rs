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

//! # Harmonic bonded parameters for coarse-grained models
//!
//! Bond lengths and angles sampled in a trajectory are histogrammed per bond and
//! angle type, and a Boltzmann-inverted harmonic density is fitted to each
//! distribution. The result is a force constant and an equilibrium value per type.
//!
//! ~~~
//! use cgbonds::{topology::{BondType, Topology}, BondCalculator, Point, Trajectory};
//! let topology = Topology::new(["A", "B"], [[0, 1]]).unwrap();
//! let lengths = [0.2925, 0.2975, 0.2975, 0.3025, 0.3025, 0.3025, 0.3075, 0.3075, 0.3125];
//! let frames = (0..900)
//!     .map(|i| vec![Point::zeros(), Point::new(lengths[i % 9], 0.0, 0.0)])
//!     .collect();
//! let trajectory = Trajectory::new(frames).unwrap();
//! let calculator = BondCalculator::new(&topology, &trajectory, 300.0).unwrap();
//! let k = calculator.bond_params()[&BondType::new("A", "B")].k;
//! assert!(k > 0.0);
//! ~~~

use nalgebra::Vector3;

pub type Point = Vector3<f64>;
pub type PositionVec = Vec<Point>;

pub mod analysis;
pub mod cli;
pub mod config;
mod error;
pub mod fit;
mod histogram;
pub mod io;
pub mod topology;
mod trajectory;

pub use analysis::{AngleParameters, BondCalculator, BondParameters, TypeFailure, TypeReport};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use fit::HarmonicParameters;
pub use trajectory::*;

pub use physical_constants::{AVOGADRO_CONSTANT, BOLTZMANN_CONSTANT, MOLAR_GAS_CONSTANT};
