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

//! Command line interface of the `cgbonds` binary.
//!
//! The input file is YAML:
//! ~~~ yaml
//! trajectory: traj.xyz   # relative to the input file
//! topology:              # optional if the trajectory file stores bonds
//!   atoms: [A, B, A]
//!   bonds: [[0, 1], [1, 2]]
//! analysis:
//!   temperature: 300.0
//! ~~~

use crate::{
    analysis::{BondCalculator, TypeReport},
    config::AnalysisConfig,
    io::read_trajectory,
    topology::Topology,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pretty_env_logger::env_logger::DEFAULT_FILTER_ENV;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Subcommand)]
enum Commands {
    /// Derive harmonic bond and angle parameters from a trajectory
    #[clap(arg_required_else_help = true)]
    Run {
        /// Input file in YAML format
        #[clap(long, short = 'i')]
        input: PathBuf,
    },
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// Verbose output. See more with e.g. RUST_LOG=Trace
    #[clap(long, short = 'v', action)]
    pub verbose: bool,
    /// Output file in YAML format
    #[clap(long, short = 'o', default_value = "output.yaml")]
    pub output: PathBuf,
}

/// Content of the input file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    /// Trajectory file; relative paths are resolved against the input file
    pub trajectory: PathBuf,
    /// Bond graph; taken from the trajectory file if absent
    #[serde(default)]
    pub topology: Option<Topology>,
    pub analysis: AnalysisConfig,
}

impl Input {
    /// Load input file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open input file {}", path.display()))?;
        let mut input: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Invalid input file {}", path.display()))?;
        if input.trajectory.is_relative() {
            if let Some(dir) = path.parent() {
                input.trajectory = dir.join(&input.trajectory);
            }
        }
        Ok(input)
    }
}

/// Parameters of one type as written to the output file
#[derive(Debug, Serialize)]
struct TypeOutput {
    k: f64,
    x0: f64,
    instances: usize,
    samples: usize,
    mean: f64,
    std_dev: f64,
}

impl From<&TypeReport> for TypeOutput {
    fn from(report: &TypeReport) -> Self {
        Self {
            k: report.parameters().k,
            x0: report.parameters().x0,
            instances: *report.num_instances(),
            samples: report.distribution().num_samples(),
            mean: report.distribution().mean(),
            std_dev: report.distribution().std_dev(),
        }
    }
}

pub fn do_main() -> Result<()> {
    let args = Args::parse();
    if std::env::var(DEFAULT_FILTER_ENV).is_err() {
        std::env::set_var(
            DEFAULT_FILTER_ENV,
            if args.verbose { "Debug" } else { "Info" },
        );
    }
    pretty_env_logger::init();

    let mut yaml_output = std::fs::File::create(&args.output)
        .with_context(|| format!("Cannot create {}", args.output.display()))?;

    match args.command {
        Commands::Run { input } => {
            run(&input, &mut yaml_output)?;
        }
    }
    Ok(())
}

/// Helper function to serialize data to an existing YAML stream
fn write_yaml<T: serde::Serialize>(
    data: &T,
    output: &mut impl Write,
    key: Option<&str>,
) -> Result<()> {
    match key {
        Some(key) => {
            let mut wrapper = BTreeMap::new();
            wrapper.insert(key.to_string(), data);
            let yaml = serde_yaml::to_string(&wrapper)?;
            output.write_all(yaml.as_bytes())?;
        }
        None => {
            let yaml = serde_yaml::to_string(data)?;
            output.write_all(yaml.as_bytes())?;
        }
    }
    Ok(())
}

/// Analyse the trajectory given in `input` and write parameters as YAML to `yaml_output`
pub fn run(input: &Path, yaml_output: &mut impl Write) -> Result<()> {
    let input = Input::from_file(input)?;
    let data = read_trajectory(&input.trajectory)?;
    let topology = match input.topology {
        Some(topology) => {
            if !data.names.is_empty() && data.names.len() == topology.num_atoms() {
                topology
                    .atoms()
                    .filter(|atom| data.names[atom.index] != atom.name)
                    .for_each(|atom| {
                        log::warn!(
                            "Atom {} is '{}' in the topology but '{}' in the trajectory",
                            atom.index,
                            atom.name,
                            data.names[atom.index]
                        )
                    });
            }
            topology
        }
        None => data.topology()?,
    };

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!(
        "Fitting bonded parameters over {} frames",
        data.trajectory.len()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let calculator = BondCalculator::with_config(&topology, &data.trajectory, &input.analysis);
    spinner.finish_and_clear();
    let calculator = calculator?;

    let bonds: BTreeMap<String, TypeOutput> = calculator
        .bond_reports()
        .iter()
        .map(|(kind, report)| (kind.to_string(), report.into()))
        .collect();
    let angles: BTreeMap<String, TypeOutput> = calculator
        .angle_reports()
        .iter()
        .map(|(kind, report)| (kind.to_string(), report.into()))
        .collect();
    let failures: BTreeMap<String, String> = calculator
        .failures()
        .iter()
        .map(|failure| (failure.kind.clone(), failure.error.to_string()))
        .collect();
    let units = BTreeMap::from([
        ("bond_k", "kJ/mol/nm²"),
        ("bond_x0", "nm"),
        ("angle_k", "kJ/mol/rad²"),
        ("angle_x0", "rad"),
    ]);

    write_yaml(&calculator.temperature(), yaml_output, Some("temperature"))?;
    write_yaml(&units, yaml_output, Some("units"))?;
    write_yaml(&bonds, yaml_output, Some("bonds"))?;
    write_yaml(&angles, yaml_output, Some("angles"))?;
    write_yaml(&failures, yaml_output, Some("failures"))?;

    log::info!(
        "Fitted {} bond and {} angle types; {} failed",
        bonds.len(),
        angles.len(),
        failures.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_command() {
        let args = Args::try_parse_from(["cgbonds", "-v", "-o", "out.yaml", "run", "-i", "in.yaml"])
            .unwrap();
        assert!(args.verbose);
        assert_eq!(args.output, PathBuf::from("out.yaml"));
        let Commands::Run { input } = args.command;
        assert_eq!(input, PathBuf::from("in.yaml"));
    }

    #[test]
    fn default_output() {
        let args = Args::try_parse_from(["cgbonds", "run", "--input", "in.yaml"]).unwrap();
        assert!(!args.verbose);
        assert_eq!(args.output, PathBuf::from("output.yaml"));
    }

    #[test]
    fn input_paths_are_relative_to_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.yaml");
        std::fs::write(
            &path,
            "trajectory: traj.xyz\ntopology:\n  atoms: [A, B]\n  bonds: [[0, 1]]\nanalysis:\n  temperature: 300.0\n",
        )
        .unwrap();
        let input = Input::from_file(&path).unwrap();
        assert_eq!(input.trajectory, dir.path().join("traj.xyz"));
        assert_eq!(input.topology.unwrap().num_atoms(), 2);
        assert_eq!(input.analysis, AnalysisConfig::new(300.0));
    }

    #[test]
    fn unknown_input_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.yaml");
        std::fs::write(&path, "trajectory: t.xyz\nanalysis: {temperature: 300}\nframes: 3\n").unwrap();
        assert!(Input::from_file(&path).is_err());
    }
}
