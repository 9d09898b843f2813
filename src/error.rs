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

//! Error types for the bonded parameter analysis.
//!
//! Errors are scoped to a single bond or angle type wherever possible so that
//! one failing type does not spoil the parameters of the others.

use thiserror::Error;

/// Errors that can occur while deriving bonded parameters.
#[derive(Debug, Error)]
pub enum Error {
    /// The topology graph is malformed, e.g. a bond refers to an unknown atom.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Too few instances or samples to build a meaningful histogram.
    #[error("insufficient data for {kind}: {detail}")]
    InsufficientData {
        /// Bond or angle type that failed
        kind: String,
        /// Description of what is missing
        detail: String,
    },

    /// Too much probability mass in bins where sin(θ) vanishes.
    #[error(
        "degenerate angle bins for {kind}: {excluded} bins with |sin θ| < {threshold} hold {mass:.3} of the probability mass"
    )]
    DegenerateBins {
        /// Angle type that failed
        kind: String,
        /// Number of excluded bins
        excluded: usize,
        /// Sine threshold used for exclusion
        threshold: f64,
        /// Fraction of the raw probability mass in the excluded bins
        mass: f64,
    },

    /// The minimizer did not converge or produced a non-physical shape.
    #[error("fit did not converge for {kind}: {detail}")]
    FitConvergence {
        /// Bond or angle type that failed
        kind: String,
        /// Description of the failure
        detail: String,
    },

    /// Invalid analysis settings.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates an [`InsufficientData`](Error::InsufficientData) error.
    pub fn insufficient_data(kind: impl ToString, detail: impl Into<String>) -> Self {
        Self::InsufficientData {
            kind: kind.to_string(),
            detail: detail.into(),
        }
    }

    /// Creates a [`FitConvergence`](Error::FitConvergence) error.
    pub fn fit_convergence(kind: impl ToString, detail: impl Into<String>) -> Self {
        Self::FitConvergence {
            kind: kind.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(errors.to_string())
    }
}

/// Result type used by the analysis.
pub type Result<T> = std::result::Result<T, Error>;
