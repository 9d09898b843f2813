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

//! # Harmonic parameters by Boltzmann inversion
//!
//! A coordinate sampled at temperature `T` in the harmonic potential
//! `u(x) = k (x − x₀)²` is normally distributed with variance `σ² = k_BT / 2k`.
//! With the width `w = 2σ` the normalized density reads
//!
//! g(x; w, x₀) = (w √(π/2))⁻¹ exp(−2 (x − x₀)² / w²)
//!
//! so that a fitted width gives the force constant `k = 2 k_BT / w²`.

mod simplex;

use derive_getters::Getters;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub use simplex::*;

use crate::analysis::Distribution;
use crate::error::{Error, Result};
use crate::{AVOGADRO_CONSTANT, BOLTZMANN_CONSTANT};

const KILO_JOULE_PER_JOULE: f64 = 1e-3;

/// Normalized Boltzmann-inverted harmonic density, `g(x; w, x₀)`.
pub fn harmonic_density(x: f64, width: f64, center: f64) -> f64 {
    (-2.0 * (x - center).powi(2) / (width * width)).exp()
        / (width * (std::f64::consts::PI / 2.0).sqrt())
}

/// Width and center of a fitted harmonic density, before unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Getters)]
pub struct FittedShape {
    /// Width, `w = 2σ`
    width: f64,
    /// Center, `x₀`
    center: f64,
    /// Sum of squared residuals at the optimum
    residual: f64,
}

impl FittedShape {
    /// Force constant and equilibrium value at `temperature` (K).
    ///
    /// The force constant is `2 k_B T N_A / w²` in kJ/mol per squared coordinate unit.
    pub fn to_force_field_parameters(&self, temperature: f64) -> HarmonicParameters {
        let thermal_energy =
            BOLTZMANN_CONSTANT * AVOGADRO_CONSTANT * KILO_JOULE_PER_JOULE * temperature;
        HarmonicParameters {
            k: 2.0 * thermal_energy / self.width.powi(2),
            x0: self.center,
        }
    }
}

/// Harmonic force field parameters.
///
/// For bonds, `k` is in kJ/mol/nm² and `x0` in nm;
/// for angles, `k` is in kJ/mol/rad² and `x0` in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicParameters {
    /// Force constant
    pub k: f64,
    /// Equilibrium value
    pub x0: f64,
}

impl HarmonicParameters {
    pub fn is_finite(&self) -> bool {
        self.k.is_finite() && self.x0.is_finite()
    }
}

/// Fits [`harmonic_density`] to a [`Distribution`] by least squares.
#[derive(Debug, Clone, Default)]
pub struct ParameterFitter<M: Minimizer = NelderMead> {
    minimizer: M,
}

impl<M: Minimizer> ParameterFitter<M> {
    pub const fn new(minimizer: M) -> Self {
        Self { minimizer }
    }

    /// Starting point: a tenth of the sampled range as width and the mode as center
    pub fn initial_guess(distribution: &Distribution) -> Option<(f64, f64)> {
        let (min, max) = distribution
            .centers()
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let (mode, _) = distribution
            .iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
        Some(((max - min) / 10.0, mode))
    }

    /// Fit width and center to the distribution of `kind`.
    ///
    /// Fails if the samples have no spread, if the minimizer does not converge
    /// or if the optimum is non-physical.
    pub fn fit(&self, kind: impl ToString, distribution: &Distribution) -> Result<FittedShape> {
        let kind = kind.to_string();
        let spread = distribution.std_dev();
        if spread.is_finite() && spread <= f64::EPSILON * distribution.mean().abs().max(1.0) {
            return Err(Error::insufficient_data(&kind, "zero variance"));
        }
        let (width, center) = Self::initial_guess(distribution)
            .ok_or_else(|| Error::insufficient_data(&kind, "empty distribution"))?;

        let objective = |p: &Vector2<f64>| {
            distribution
                .iter()
                .map(|(x, y)| (harmonic_density(x, p[0], p[1]) - y).powi(2))
                .sum::<f64>()
        };
        let minimum = self
            .minimizer
            .minimize(objective, Vector2::new(width, center))
            .map_err(|e| Error::fit_convergence(&kind, e.to_string()))?;

        let (width, center) = (minimum.x[0], minimum.x[1]);
        if !(width.is_finite() && width > 0.0 && center.is_finite()) {
            return Err(Error::fit_convergence(
                &kind,
                format!("non-physical shape with w = {width}, x0 = {center}"),
            ));
        }
        log::debug!(
            "{}: w = {:.6}, x0 = {:.6} after {} iterations (residual {:.3e})",
            kind,
            width,
            center,
            minimum.iterations,
            minimum.value
        );
        Ok(FittedShape {
            width,
            center,
            residual: minimum.value,
        })
    }

    /// Fit and convert to force field parameters at `temperature` (K)
    pub fn parameters(
        &self,
        kind: impl ToString,
        distribution: &Distribution,
        temperature: f64,
    ) -> Result<(FittedShape, HarmonicParameters)> {
        let kind = kind.to_string();
        let shape = self.fit(&kind, distribution)?;
        let parameters = shape.to_force_field_parameters(temperature);
        if !parameters.is_finite() {
            return Err(Error::fit_convergence(
                &kind,
                format!("non-finite parameters k = {}, x0 = {}", parameters.k, parameters.x0),
            ));
        }
        Ok((shape, parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Distribution sampled exactly from the harmonic density
    fn exact_distribution(width: f64, center: f64) -> Distribution {
        let bin_width = 0.005;
        let centers: Vec<f64> = (0..200).map(|i| (i as f64 + 0.5) * bin_width).collect();
        let density = centers
            .iter()
            .map(|&x| harmonic_density(x, width, center))
            .collect();
        Distribution::new(centers, density, bin_width)
    }

    #[test]
    fn density_is_normalized() {
        let dx = 1e-4;
        let integral: f64 = (0..20000)
            .map(|i| harmonic_density(i as f64 * dx, 0.1, 1.0) * dx)
            .sum();
        assert_relative_eq!(integral, 1.0, epsilon = 1e-6);
        assert_relative_eq!(
            harmonic_density(1.0, 0.1, 1.0),
            1.0 / (0.1 * (std::f64::consts::PI / 2.0).sqrt())
        );
    }

    #[test]
    fn initial_guess_uses_mode_and_range() {
        let distribution = exact_distribution(0.05, 0.3025);
        let (w, x0) = ParameterFitter::<NelderMead>::initial_guess(&distribution).unwrap();
        assert_relative_eq!(w, 0.0995, epsilon = 1e-12);
        assert_relative_eq!(x0, 0.3025, epsilon = 1e-12);
    }

    #[test]
    fn recovers_exact_shape() {
        let distribution = exact_distribution(0.04, 0.3);
        let shape = ParameterFitter::<NelderMead>::default()
            .fit("A-B", &distribution)
            .unwrap();
        assert_relative_eq!(*shape.width(), 0.04, epsilon = 1e-5);
        assert_relative_eq!(*shape.center(), 0.3, epsilon = 1e-5);
        assert!(*shape.residual() < 1e-8);
    }

    #[test]
    fn force_constant_from_width() {
        let shape = FittedShape {
            width: 0.02,
            center: 0.15,
            residual: 0.0,
        };
        let parameters = shape.to_force_field_parameters(300.0);
        // 2 R T / w² with R = 8.314462618 J/mol/K
        let expected = 2.0 * 8.314462618e-3 * 300.0 / 0.02_f64.powi(2);
        assert_relative_eq!(parameters.k, expected, max_relative = 1e-6);
        assert_relative_eq!(parameters.x0, 0.15);
    }

    #[test]
    fn empty_distribution() {
        let distribution = Distribution::new(vec![], vec![], 0.1);
        let result = ParameterFitter::<NelderMead>::default().fit("A-B", &distribution);
        assert!(matches!(result, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn rigid_bond_has_zero_variance() {
        let frames = vec![vec![crate::Point::zeros(), crate::Point::new(0.3, 0.0, 0.0)]; 100];
        let trajectory = crate::Trajectory::new(frames).unwrap();
        let config = crate::AnalysisConfig::new(300.0);
        let distribution = crate::analysis::DistributionEstimator::new(&trajectory, &config)
            .unwrap()
            .calc_lengths("A-B", &[[0, 1]])
            .unwrap();
        assert_relative_eq!(distribution.std_dev(), 0.0);
        let result = ParameterFitter::<NelderMead>::default().fit("A-B", &distribution);
        match result {
            Err(Error::InsufficientData { detail, .. }) => assert_eq!(detail, "zero variance"),
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn non_convergence_is_reported() {
        let distribution = exact_distribution(0.04, 0.3);
        let settings = SimplexSettings {
            max_iterations: 2,
            ..Default::default()
        };
        let result = ParameterFitter::new(NelderMead::new(settings)).fit("A-B", &distribution);
        assert!(matches!(result, Err(Error::FitConvergence { .. })));
    }

    /// Minimizer returning a fixed, non-physical point
    struct Broken;

    impl Minimizer for Broken {
        fn minimize<const N: usize>(
            &self,
            _objective: impl Fn(&nalgebra::SVector<f64, N>) -> f64,
            initial: nalgebra::SVector<f64, N>,
        ) -> std::result::Result<Minimum<N>, MinimizeError> {
            Ok(Minimum {
                x: -initial,
                value: 0.0,
                iterations: 1,
            })
        }
    }

    #[test]
    fn negative_width_is_rejected() {
        let distribution = exact_distribution(0.04, 0.3);
        let result = ParameterFitter::new(Broken).parameters("A-B", &distribution, 300.0);
        assert!(matches!(result, Err(Error::FitConvergence { .. })));
    }
}
