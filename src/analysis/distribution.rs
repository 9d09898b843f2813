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

//! Probability distributions of bond lengths and angles.
//!
//! Angles between vectors in three dimensions are sampled with the solid-angle
//! weight sin(θ). The angle distribution is therefore divided by sin(θ) and
//! normalized again, which leaves the distribution of the bending coordinate itself.
//! Bins where sin(θ) is close to zero, i.e. near 0 and π, are dropped from the
//! corrected distribution.

use average::{Estimate, Variance};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::histogram::Histogram;
use crate::Trajectory;

/// Normalized probability density sampled at bin centers.
///
/// The density integrates to one: `Σ density · bin_width = 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    centers: Vec<f64>,
    density: Vec<f64>,
    bin_width: f64,
    /// Number of samples in the histogram range
    num_samples: usize,
    /// Mean of the samples in the histogram range
    mean: f64,
    /// Standard deviation of the samples in the histogram range
    std_dev: f64,
}

impl Distribution {
    /// Distribution from bin centers and densities of equal length
    pub(crate) fn new(centers: Vec<f64>, density: Vec<f64>, bin_width: f64) -> Self {
        debug_assert_eq!(centers.len(), density.len());
        Self {
            centers,
            density,
            bin_width,
            num_samples: 0,
            mean: f64::NAN,
            std_dev: f64::NAN,
        }
    }

    fn with_statistics(mut self, statistics: &Variance) -> Self {
        self.num_samples = statistics.len() as usize;
        self.mean = statistics.mean();
        self.std_dev = statistics.sample_variance().sqrt();
        self
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    pub const fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Number of samples that went into the histogram
    pub const fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Sample mean; NaN if not built from samples
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation; NaN if not built from samples
    pub const fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Iterator over `(bin_center, density)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.centers.iter().copied().zip(self.density.iter().copied())
    }

    /// `Σ density · bin_width`, which is one for a normalized distribution
    pub fn integral(&self) -> f64 {
        self.density.iter().sum::<f64>() * self.bin_width
    }
}

/// Builds length and angle distributions from a trajectory.
#[derive(Debug, Clone)]
pub struct DistributionEstimator<'a> {
    trajectory: &'a Trajectory,
    config: &'a AnalysisConfig,
}

impl<'a> DistributionEstimator<'a> {
    /// Estimator over `trajectory`; fails with [`Error::Config`] on invalid settings
    pub fn new(trajectory: &'a Trajectory, config: &'a AnalysisConfig) -> Result<Self> {
        config.check()?;
        Ok(Self { trajectory, config })
    }

    /// Distribution of distances between all `pairs` in all frames
    pub fn calc_lengths(&self, kind: impl ToString, pairs: &[[usize; 2]]) -> Result<Distribution> {
        let kind = kind.to_string();
        self.check_instances(&kind, pairs.len(), pairs.iter().flatten())?;
        let [min, max] = self.config.bond_domain;
        let (histogram, statistics) =
            self.sample(&kind, min, max, self.config.bond_bins, self.trajectory.distances(pairs))?;
        let (centers, density): (Vec<f64>, Vec<f64>) = histogram.density().unzip();
        let distribution =
            Distribution::new(centers, density, histogram.bin_width()).with_statistics(&statistics);
        log::debug!(
            "{}: {} lengths, mean {:.4} ± {:.4} nm",
            kind,
            distribution.num_samples(),
            distribution.mean(),
            distribution.std_dev()
        );
        Ok(distribution)
    }

    /// Distribution of angles for all `[first, vertex, last]` triplets in all frames,
    /// corrected for the sin(θ) solid-angle weight.
    pub fn calc_angles(&self, kind: impl ToString, triplets: &[[usize; 3]]) -> Result<Distribution> {
        let kind = kind.to_string();
        self.check_instances(&kind, triplets.len(), triplets.iter().flatten())?;
        let [min, max] = self.config.angle_domain;
        let (histogram, statistics) = self.sample(
            &kind,
            min,
            max,
            self.config.angle_bins,
            self.trajectory.angles(triplets),
        )?;
        let distribution = self
            .jacobian_correction(&kind, &histogram)?
            .with_statistics(&statistics);
        log::debug!(
            "{}: {} angles, mean {:.2} ± {:.2} degrees",
            kind,
            distribution.num_samples(),
            distribution.mean().to_degrees(),
            distribution.std_dev().to_degrees()
        );
        Ok(distribution)
    }

    /// Divide the raw density by |sin(θ)| and normalize again.
    ///
    /// Bins with |sin(θ)| below the threshold are left out; if they carry more than
    /// the allowed fraction of the raw probability mass, the type fails.
    fn jacobian_correction(&self, kind: &str, histogram: &Histogram) -> Result<Distribution> {
        let bin_width = histogram.bin_width();
        let threshold = self.config.sin_threshold;
        let mut excluded = 0;
        let mut excluded_mass = 0.0;
        let mut centers = Vec::with_capacity(histogram.num_bins());
        let mut density = Vec::with_capacity(histogram.num_bins());

        for (theta, raw) in histogram.density() {
            let sine = theta.sin().abs();
            if sine < threshold {
                excluded += 1;
                excluded_mass += raw * bin_width;
                continue;
            }
            centers.push(theta);
            density.push(if raw > 0.0 { raw / sine } else { 0.0 });
        }

        if excluded > 0 {
            log::debug!(
                "{}: excluded {} bins with |sin θ| < {} holding {:.4} of the mass",
                kind,
                excluded,
                threshold,
                excluded_mass
            );
        }
        if excluded_mass > self.config.max_excluded_mass {
            return Err(Error::DegenerateBins {
                kind: kind.to_string(),
                excluded,
                threshold,
                mass: excluded_mass,
            });
        }

        let integral = density.iter().sum::<f64>() * bin_width;
        if !(integral.is_finite() && integral > 0.0) {
            return Err(Error::insufficient_data(
                kind,
                "no probability mass left after the sin(θ) correction",
            ));
        }
        density.iter_mut().for_each(|p| *p /= integral);
        Ok(Distribution::new(centers, density, bin_width))
    }

    /// Histogram the values and collect sample statistics for those in range
    fn sample(
        &self,
        kind: &str,
        min: f64,
        max: f64,
        num_bins: usize,
        values: impl Iterator<Item = f64>,
    ) -> Result<(Histogram, Variance)> {
        let mut histogram = Histogram::new(min, max, num_bins);
        let mut statistics = Variance::new();
        for value in values.filter(|v| v.is_finite() && (min..=max).contains(v)) {
            histogram.add(value);
            statistics.add(value);
        }
        let num_samples = histogram.total() as usize;
        if num_samples < self.config.min_samples {
            return Err(Error::insufficient_data(
                kind,
                format!(
                    "{} samples in [{}, {}], at least {} required",
                    num_samples, min, max, self.config.min_samples
                ),
            ));
        }
        Ok((histogram, statistics))
    }

    /// Check that there is something to sample and that all indices are in range
    fn check_instances<'b>(
        &self,
        kind: &str,
        num_instances: usize,
        mut indices: impl Iterator<Item = &'b usize>,
    ) -> Result<()> {
        if num_instances == 0 {
            return Err(Error::insufficient_data(kind, "no instances"));
        }
        if self.trajectory.is_empty() {
            return Err(Error::insufficient_data(kind, "trajectory has no frames"));
        }
        let num_atoms = self.trajectory.num_atoms();
        if let Some(i) = indices.find(|&&i| i >= num_atoms) {
            return Err(Error::InvalidTopology(format!(
                "{} refers to atom {} but frames hold {} positions",
                kind, i, num_atoms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// One frame per angle with the vertex at the origin
    fn angle_trajectory(angles: impl IntoIterator<Item = f64>) -> Trajectory {
        let frames = angles
            .into_iter()
            .map(|theta| {
                vec![
                    Point::new(1.0, 0.0, 0.0),
                    Point::zeros(),
                    Point::new(theta.cos(), theta.sin(), 0.0),
                ]
            })
            .collect();
        Trajectory::new(frames).unwrap()
    }

    #[test]
    fn lengths_are_normalized() {
        // five samples in the middle of each bin from 40 to 59
        let frames = (0..100)
            .map(|i| vec![Point::zeros(), Point::new(0.2025 + 0.005 * (i % 20) as f64, 0.0, 0.0)])
            .collect();
        let trajectory = Trajectory::new(frames).unwrap();
        let config = AnalysisConfig::new(300.0);
        let distribution = DistributionEstimator::new(&trajectory, &config)
            .unwrap()
            .calc_lengths("A-B", &[[0, 1]])
            .unwrap();
        assert_eq!(distribution.len(), 200);
        assert_eq!(distribution.num_samples(), 100);
        assert_relative_eq!(distribution.bin_width(), 0.005);
        assert_relative_eq!(distribution.centers()[0], 0.0025);
        assert_relative_eq!(distribution.integral(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(distribution.mean(), 0.25, epsilon = 1e-10);
        assert_relative_eq!(distribution.density()[45], 1.0 / 0.1, epsilon = 1e-9);
        assert_relative_eq!(distribution.density()[60], 0.0);
    }

    #[test]
    fn out_of_range_lengths_are_ignored() {
        let frames = vec![vec![Point::zeros(), Point::new(2.0, 0.0, 0.0)]; 20];
        let trajectory = Trajectory::new(frames).unwrap();
        let config = AnalysisConfig::new(300.0);
        let result = DistributionEstimator::new(&trajectory, &config).unwrap().calc_lengths("A-B", &[[0, 1]]);
        assert!(matches!(result, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let trajectory = Trajectory::new(vec![vec![Point::zeros(); 2]; 10]).unwrap();
        let config = AnalysisConfig {
            bond_bins: 0,
            ..AnalysisConfig::new(300.0)
        };
        assert!(matches!(
            DistributionEstimator::new(&trajectory, &config),
            Err(Error::Config(_))
        ));
        let config = AnalysisConfig {
            angle_domain: [PI, 0.0],
            ..AnalysisConfig::new(300.0)
        };
        assert!(matches!(
            DistributionEstimator::new(&trajectory, &config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zero_instances() {
        let trajectory = Trajectory::new(vec![vec![Point::zeros(); 2]; 10]).unwrap();
        let config = AnalysisConfig::new(300.0);
        let estimator = DistributionEstimator::new(&trajectory, &config).unwrap();
        assert!(matches!(
            estimator.calc_lengths("A-B", &[]),
            Err(Error::InsufficientData { .. })
        ));
        assert!(matches!(
            estimator.calc_angles("A-B-C", &[]),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn no_frames() {
        let trajectory = Trajectory::default();
        let config = AnalysisConfig::new(300.0);
        let result = DistributionEstimator::new(&trajectory, &config).unwrap().calc_lengths("A-B", &[[0, 1]]);
        assert!(matches!(result, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn index_out_of_range() {
        let trajectory = Trajectory::new(vec![vec![Point::zeros(); 2]; 10]).unwrap();
        let config = AnalysisConfig::new(300.0);
        let result = DistributionEstimator::new(&trajectory, &config).unwrap().calc_lengths("A-B", &[[0, 2]]);
        assert!(matches!(result, Err(Error::InvalidTopology(_))));
    }

    #[test]
    fn corrected_angles_are_normalized() {
        let trajectory = angle_trajectory((0..1000).map(|i| 1.5 + 0.001 * i as f64));
        let config = AnalysisConfig::new(300.0);
        let distribution = DistributionEstimator::new(&trajectory, &config)
            .unwrap()
            .calc_angles("A-B-C", &[[0, 1, 2]])
            .unwrap();
        assert_relative_eq!(distribution.integral(), 1.0, epsilon = 1e-10);
        assert_eq!(distribution.num_samples(), 1000);
        // bins near 0, π and 2π are dropped
        assert!(distribution.len() < 200);
        assert!(distribution
            .centers()
            .iter()
            .all(|theta| theta.sin().abs() >= config.sin_threshold));
        // all mass lies in the bins covering [1.5, 2.5)
        let mass: f64 = distribution
            .iter()
            .filter(|(theta, _)| (1.4..2.6).contains(theta))
            .map(|(_, p)| p * distribution.bin_width())
            .sum();
        assert_relative_eq!(mass, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn angles_near_zero_are_degenerate() {
        let trajectory = angle_trajectory((0..500).map(|i| 0.0001 * i as f64));
        let config = AnalysisConfig::new(300.0);
        let result = DistributionEstimator::new(&trajectory, &config).unwrap().calc_angles("A-B-C", &[[0, 1, 2]]);
        match result {
            Err(Error::DegenerateBins { excluded, mass, .. }) => {
                assert!(excluded > 0);
                assert_relative_eq!(mass, 1.0, epsilon = 1e-10);
            }
            other => panic!("expected DegenerateBins, got {other:?}"),
        }
    }

    #[test]
    fn linear_angles_are_degenerate() {
        let trajectory = angle_trajectory(std::iter::repeat(PI).take(50));
        let config = AnalysisConfig::new(300.0);
        let result = DistributionEstimator::new(&trajectory, &config).unwrap().calc_angles("A-B-C", &[[0, 1, 2]]);
        assert!(matches!(result, Err(Error::DegenerateBins { .. })));
    }
}
