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

//! # Bonded parameters from a trajectory
//!
//! [`BondCalculator`] runs the full analysis: it identifies bond and angle types
//! in the topology, builds the length and angle distribution of each type and fits
//! harmonic parameters to them.
//!
//! Types are analysed independently. A type that fails, e.g. because of too few
//! samples, is left out of the parameter maps and listed in [`BondCalculator::failures`].
//! With [`AnalysisConfig::strict`] the first failure aborts the analysis instead.

mod distribution;

use std::collections::BTreeMap;
use std::fmt::Display;

use derive_getters::Getters;
use serde::Serialize;

pub use distribution::*;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::fit::{FittedShape, HarmonicParameters, Minimizer, NelderMead, ParameterFitter};
use crate::topology::{identify_angles, identify_bonds, AngleType, BondType, Topology};
use crate::Trajectory;

/// Bond type → harmonic parameters (kJ/mol/nm², nm)
pub type BondParameters = BTreeMap<BondType, HarmonicParameters>;

/// Angle type → harmonic parameters (kJ/mol/rad², rad)
pub type AngleParameters = BTreeMap<AngleType, HarmonicParameters>;

/// Geometric coordinate of a bonded type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coordinate {
    /// Distance between two bonded atoms
    Length,
    /// Angle between two bonds sharing an atom
    Angle,
}

/// Everything derived for one bond or angle type
#[derive(Debug, Clone, Getters)]
pub struct TypeReport {
    /// Number of instances in the topology
    num_instances: usize,
    /// Sampled and normalized distribution that was fitted
    distribution: Distribution,
    /// Fitted width and center
    shape: FittedShape,
    /// Force field parameters
    parameters: HarmonicParameters,
}

/// A bond or angle type for which no parameters could be derived
#[derive(Debug)]
pub struct TypeFailure {
    /// Name of the type, e.g. `A-B` or `A-B-C`
    pub kind: String,
    pub coordinate: Coordinate,
    pub error: Error,
}

/// Harmonic bond and angle parameters derived from a trajectory.
///
/// All work happens in the constructor; the results are read-only afterwards.
#[derive(Debug)]
pub struct BondCalculator {
    temperature: f64,
    bond_reports: BTreeMap<BondType, TypeReport>,
    angle_reports: BTreeMap<AngleType, TypeReport>,
    failures: Vec<TypeFailure>,
}

impl BondCalculator {
    /// Analyse with default settings at `temperature` (K)
    pub fn new(topology: &Topology, trajectory: &Trajectory, temperature: f64) -> Result<Self> {
        Self::with_config(topology, trajectory, &AnalysisConfig::new(temperature))
    }

    /// Analyse with the given settings, fitting with Nelder-Mead
    pub fn with_config(
        topology: &Topology,
        trajectory: &Trajectory,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let minimizer = NelderMead::new(config.minimizer);
        Self::with_minimizer(topology, trajectory, config, minimizer)
    }

    /// Analyse with the given settings and minimizer
    pub fn with_minimizer<M: Minimizer>(
        topology: &Topology,
        trajectory: &Trajectory,
        config: &AnalysisConfig,
        minimizer: M,
    ) -> Result<Self> {
        let estimator = DistributionEstimator::new(trajectory, config)?;
        if !trajectory.is_empty() && trajectory.num_atoms() != topology.num_atoms() {
            return Err(Error::InvalidTopology(format!(
                "topology has {} atoms but trajectory frames hold {} positions",
                topology.num_atoms(),
                trajectory.num_atoms()
            )));
        }
        log::info!(
            "Analysing {} frames of {} atoms at {} K",
            trajectory.len(),
            topology.num_atoms(),
            config.temperature
        );

        let fitter = ParameterFitter::new(minimizer);
        let mut analysis = Analysis {
            fitter: &fitter,
            temperature: config.temperature,
            strict: config.strict,
            failures: Vec::new(),
        };

        let bond_reports = analysis.run(identify_bonds(topology), Coordinate::Length, |kind, pairs| {
            estimator.calc_lengths(kind, pairs)
        })?;
        let angle_reports =
            analysis.run(identify_angles(topology), Coordinate::Angle, |kind, triplets| {
                estimator.calc_angles(kind, triplets)
            })?;

        Ok(Self {
            temperature: config.temperature,
            bond_reports,
            angle_reports,
            failures: analysis.failures,
        })
    }

    /// Temperature (K) used for the conversion to force constants
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Parameters of all successfully fitted bond types
    pub fn bond_params(&self) -> BondParameters {
        self.bond_reports
            .iter()
            .map(|(kind, report)| (kind.clone(), report.parameters))
            .collect()
    }

    /// Parameters of all successfully fitted angle types
    pub fn angle_params(&self) -> AngleParameters {
        self.angle_reports
            .iter()
            .map(|(kind, report)| (kind.clone(), report.parameters))
            .collect()
    }

    /// Details of all successfully fitted bond types
    pub const fn bond_reports(&self) -> &BTreeMap<BondType, TypeReport> {
        &self.bond_reports
    }

    /// Details of all successfully fitted angle types
    pub const fn angle_reports(&self) -> &BTreeMap<AngleType, TypeReport> {
        &self.angle_reports
    }

    /// Types for which no parameters could be derived
    pub fn failures(&self) -> &[TypeFailure] {
        &self.failures
    }
}

/// State shared while analysing bond and angle types
struct Analysis<'a, M: Minimizer> {
    fitter: &'a ParameterFitter<M>,
    temperature: f64,
    strict: bool,
    failures: Vec<TypeFailure>,
}

impl<M: Minimizer> Analysis<'_, M> {
    /// Build distribution, fit and convert for every type
    fn run<K: Ord + Display, I>(
        &mut self,
        types: BTreeMap<K, Vec<I>>,
        coordinate: Coordinate,
        distribution: impl Fn(&K, &[I]) -> Result<Distribution>,
    ) -> Result<BTreeMap<K, TypeReport>> {
        let mut reports = BTreeMap::new();
        for (kind, instances) in types {
            let result = distribution(&kind, &instances).and_then(|distribution| {
                let (shape, parameters) =
                    self.fitter
                        .parameters(&kind, &distribution, self.temperature)?;
                Ok(TypeReport {
                    num_instances: instances.len(),
                    distribution,
                    shape,
                    parameters,
                })
            });
            match result {
                Ok(report) => {
                    log::info!(
                        "{:?} {}: k = {:.3}, x0 = {:.4} ({} instances)",
                        coordinate,
                        kind,
                        report.parameters.k,
                        report.parameters.x0,
                        report.num_instances
                    );
                    reports.insert(kind, report);
                }
                Err(error) if self.strict => return Err(error),
                Err(error) => {
                    log::warn!("Skipping {:?} {}: {}", coordinate, kind, error);
                    self.failures.push(TypeFailure {
                        kind: kind.to_string(),
                        coordinate,
                        error,
                    });
                }
            }
        }
        Ok(reports)
    }
}
