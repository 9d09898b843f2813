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

//! Derivative-free minimization with the Nelder-Mead simplex method of `argmin`.

use argmin::core::{
    CostFunction, Executor, State, TerminationReason, TerminationStatus,
};
use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Errors from a [`Minimizer`]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MinimizeError {
    /// Iteration limit reached before the simplex converged
    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),
    /// The objective is not finite at the starting point
    #[error("objective is not finite at the initial guess")]
    NonFiniteStart,
    /// The best point found has a non-finite objective
    #[error("objective is not finite at the minimum")]
    NonFiniteMinimum,
    /// The solver stopped for another reason or failed
    #[error("solver failed: {0}")]
    Solver(String),
}

/// Location and value of a minimum
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum<const N: usize> {
    /// Parameters at the minimum
    pub x: SVector<f64, N>,
    /// Objective at the minimum
    pub value: f64,
    /// Number of iterations used
    pub iterations: usize,
}

/// Unconstrained minimizer of a scalar objective function.
pub trait Minimizer {
    /// Minimize `objective`, starting from `initial`
    fn minimize<const N: usize>(
        &self,
        objective: impl Fn(&SVector<f64, N>) -> f64,
        initial: SVector<f64, N>,
    ) -> Result<Minimum<N>, MinimizeError>;
}

const fn default_max_iterations() -> usize {
    5000
}

const fn default_sd_tolerance() -> f64 {
    1e-10
}

const fn default_initial_step() -> f64 {
    0.05
}

/// Settings for [`NelderMead`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimplexSettings {
    /// Largest number of iterations
    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1))]
    pub max_iterations: usize,
    /// Converged when the standard deviation of the objective over the simplex is below this
    #[serde(default = "default_sd_tolerance")]
    #[validate(range(exclusive_min = 0.0))]
    pub sd_tolerance: f64,
    /// Relative size of the initial simplex
    #[serde(default = "default_initial_step")]
    #[validate(range(exclusive_min = 0.0))]
    pub initial_step: f64,
}

impl Default for SimplexSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            sd_tolerance: default_sd_tolerance(),
            initial_step: default_initial_step(),
        }
    }
}

/// Objective wrapped as an `argmin` cost function.
///
/// Non-finite values are reported as +∞ so that the simplex moves away from them.
struct Objective<F, const N: usize> {
    function: F,
}

impl<F: Fn(&SVector<f64, N>) -> f64, const N: usize> CostFunction for Objective<F, N> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let value = (self.function)(&SVector::from_column_slice(param));
        Ok(if value.is_finite() {
            value
        } else {
            f64::INFINITY
        })
    }
}

/// Nelder-Mead simplex minimizer with standard coefficients.
///
/// The method is deterministic: the same objective and starting point
/// always give the same result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NelderMead {
    settings: SimplexSettings,
}

impl NelderMead {
    /// Step used for zero-valued starting parameters
    const ZERO_STEP: f64 = 0.00025;

    pub const fn new(settings: SimplexSettings) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &SimplexSettings {
        &self.settings
    }

    /// Starting point plus one vertex per coordinate, displaced by the relative step
    fn initial_simplex<const N: usize>(&self, initial: &SVector<f64, N>) -> Vec<Vec<f64>> {
        let mut simplex = Vec::with_capacity(N + 1);
        simplex.push(initial.as_slice().to_vec());
        for i in 0..N {
            let mut vertex = initial.as_slice().to_vec();
            vertex[i] = if vertex[i] != 0.0 {
                vertex[i] * (1.0 + self.settings.initial_step)
            } else {
                Self::ZERO_STEP
            };
            simplex.push(vertex);
        }
        simplex
    }
}

impl Minimizer for NelderMead {
    fn minimize<const N: usize>(
        &self,
        objective: impl Fn(&SVector<f64, N>) -> f64,
        initial: SVector<f64, N>,
    ) -> Result<Minimum<N>, MinimizeError> {
        if !objective(&initial).is_finite() {
            return Err(MinimizeError::NonFiniteStart);
        }
        let solver = argmin::solver::neldermead::NelderMead::new(self.initial_simplex(&initial))
            .with_sd_tolerance(self.settings.sd_tolerance)
            .map_err(|e| MinimizeError::Solver(e.to_string()))?;
        let problem = Objective::<_, N> {
            function: objective,
        };
        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.settings.max_iterations as u64))
            .run()
            .map_err(|e| MinimizeError::Solver(e.to_string()))?;

        let state = result.state();
        let iterations = state.get_iter() as usize;
        match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {}
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                return Err(MinimizeError::MaxIterations(self.settings.max_iterations))
            }
            status => return Err(MinimizeError::Solver(format!("{status:?}"))),
        }
        let value = state.get_best_cost();
        let x = state
            .get_best_param()
            .map(|p| SVector::from_column_slice(p))
            .ok_or(MinimizeError::NonFiniteMinimum)?;
        if !value.is_finite() {
            return Err(MinimizeError::NonFiniteMinimum);
        }
        log::trace!("Simplex converged after {} iterations", iterations);
        Ok(Minimum {
            x,
            value,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector1, Vector2};

    #[test]
    fn quadratic_bowl() {
        let minimum = NelderMead::default()
            .minimize(
                |x: &Vector2<f64>| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2),
                Vector2::new(1.0, 1.0),
            )
            .unwrap();
        assert_relative_eq!(minimum.x[0], 3.0, epsilon = 1e-3);
        assert_relative_eq!(minimum.x[1], -1.0, epsilon = 1e-3);
        assert!(minimum.value < 1e-6);
        assert!(minimum.iterations > 0);
    }

    #[test]
    fn one_dimension() {
        let minimum = NelderMead::default()
            .minimize(|x: &Vector1<f64>| (x[0] - 0.5).powi(2), Vector1::new(2.0))
            .unwrap();
        assert_relative_eq!(minimum.x[0], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn initial_simplex_steps() {
        let simplex = NelderMead::default().initial_simplex(&Vector2::new(2.0, 0.0));
        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[0], vec![2.0, 0.0]);
        assert_relative_eq!(simplex[1][0], 2.1);
        assert_relative_eq!(simplex[2][1], 0.00025);
    }

    #[test]
    fn iteration_limit() {
        let settings = SimplexSettings {
            max_iterations: 3,
            ..Default::default()
        };
        let result = NelderMead::new(settings).minimize(
            |x: &Vector2<f64>| (x[0] - 30.0).powi(2) + (x[1] - 20.0).powi(2),
            Vector2::new(1.0, 1.0),
        );
        assert_eq!(result, Err(MinimizeError::MaxIterations(3)));
    }

    #[test]
    fn non_finite_start() {
        let result =
            NelderMead::default().minimize(|x: &Vector1<f64>| 1.0 / x[0], Vector1::new(0.0));
        assert_eq!(result, Err(MinimizeError::NonFiniteStart));
    }

    #[test]
    fn non_finite_region_is_avoided() {
        // log diverges for x <= 0; minimum of x - ln(x) is at x = 1
        let minimum = NelderMead::default()
            .minimize(|x: &Vector1<f64>| x[0] - x[0].ln(), Vector1::new(0.1))
            .unwrap();
        assert_relative_eq!(minimum.x[0], 1.0, epsilon = 1e-3);
    }
}
