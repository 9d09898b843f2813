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

//! Settings for the bonded parameter analysis.
//!
//! All fields except the temperature have defaults, so the shortest valid YAML is
//! ~~~ yaml
//! temperature: 300.0
//! ~~~

use std::f64::consts::PI;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::fit::SimplexSettings;

fn default_bond_domain() -> [f64; 2] {
    [0.0, 1.0]
}

fn default_angle_domain() -> [f64; 2] {
    [0.0, 2.0 * PI]
}

const fn default_bins() -> usize {
    200
}

const fn default_min_samples() -> usize {
    10
}

const fn default_sin_threshold() -> f64 {
    0.05
}

const fn default_max_excluded_mass() -> f64 {
    0.5
}

/// Analysis settings, typically read from the `analysis` section of the input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Builder)]
#[serde(deny_unknown_fields)]
#[builder(derive(Debug))]
pub struct AnalysisConfig {
    /// Temperature (K)
    #[validate(range(exclusive_min = 0.0))]
    pub temperature: f64,
    /// Histogram range for bond lengths (nm)
    #[serde(default = "default_bond_domain")]
    #[builder(default = "default_bond_domain()")]
    #[validate(custom(function = "validate_domain"))]
    pub bond_domain: [f64; 2],
    /// Number of bins for bond lengths
    #[serde(default = "default_bins")]
    #[builder(default = "default_bins()")]
    #[validate(range(min = 2))]
    pub bond_bins: usize,
    /// Histogram range for angles (radians)
    #[serde(default = "default_angle_domain")]
    #[builder(default = "default_angle_domain()")]
    #[validate(custom(function = "validate_domain"))]
    pub angle_domain: [f64; 2],
    /// Number of bins for angles
    #[serde(default = "default_bins")]
    #[builder(default = "default_bins()")]
    #[validate(range(min = 2))]
    pub angle_bins: usize,
    /// Minimum number of in-range samples needed for a histogram
    #[serde(default = "default_min_samples")]
    #[builder(default = "default_min_samples()")]
    #[validate(range(min = 1))]
    pub min_samples: usize,
    /// Angle bins with |sin(θ)| below this value are excluded
    #[serde(default = "default_sin_threshold")]
    #[builder(default = "default_sin_threshold()")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub sin_threshold: f64,
    /// Largest fraction of probability mass allowed in excluded angle bins
    #[serde(default = "default_max_excluded_mass")]
    #[builder(default = "default_max_excluded_mass()")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_excluded_mass: f64,
    /// Nelder-Mead settings
    #[serde(default)]
    #[builder(default)]
    #[validate(nested)]
    pub minimizer: SimplexSettings,
    /// Abort on the first failing bond or angle type
    #[serde(default)]
    #[builder(default)]
    pub strict: bool,
}

impl AnalysisConfig {
    /// Default settings at the given temperature (K)
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            bond_domain: default_bond_domain(),
            bond_bins: default_bins(),
            angle_domain: default_angle_domain(),
            angle_bins: default_bins(),
            min_samples: default_min_samples(),
            sin_threshold: default_sin_threshold(),
            max_excluded_mass: default_max_excluded_mass(),
            minimizer: SimplexSettings::default(),
            strict: false,
        }
    }

    /// Check all settings, mapping failures to [`Error::Config`](crate::Error::Config)
    pub fn check(&self) -> crate::Result<()> {
        Ok(self.validate()?)
    }
}

fn validate_domain(domain: &[f64; 2]) -> Result<(), ValidationError> {
    let [min, max] = *domain;
    if min.is_finite() && max.is_finite() && max > min {
        Ok(())
    } else {
        Err(ValidationError::new("domain must be [min, max] with min < max"))
    }
}
