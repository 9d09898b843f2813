//! Shared utilities for integration tests.
//!
//! Synthetic trajectories with known length and angle distributions, plus a
//! helper for running the `cgbonds` CLI binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use cgbonds::{topology::Topology, Point, Trajectory};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Path to the compiled `cgbonds` binary.
pub fn cgbonds_binary() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_BIN_EXE_cgbonds"));
    if !path.exists() {
        path = PathBuf::from("target/debug/cgbonds");
    }
    path
}

/// Run cgbonds with the given input and output files and assert success.
pub fn run_cgbonds(input: &Path, output: &Path) {
    let status = Command::new(cgbonds_binary())
        .arg("-o")
        .arg(output)
        .arg("run")
        .arg("-i")
        .arg(input)
        .status()
        .expect("failed to execute cgbonds binary");
    assert!(status.success(), "cgbonds exited with status: {status}");
}

/// Random point on the unit sphere
pub fn random_unit_vector(rng: &mut impl Rng) -> Point {
    const RADIUS_SQUARED: f64 = 0.5 * 0.5;
    loop {
        let p = Point::new(
            rng.gen::<f64>() - 0.5,
            rng.gen::<f64>() - 0.5,
            rng.gen::<f64>() - 0.5,
        );
        let norm_squared = p.norm_squared();
        if norm_squared <= RADIUS_SQUARED {
            return p / norm_squared.sqrt();
        }
    }
}

/// Independent A-B dimers with normally distributed bond lengths and random orientations.
pub fn dimer_trajectory(
    num_dimers: usize,
    num_frames: usize,
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> (Topology, Trajectory) {
    let names = (0..num_dimers).flat_map(|_| ["A", "B"]);
    let bonds = (0..num_dimers).map(|i| [2 * i, 2 * i + 1]);
    let topology = Topology::new(names, bonds).unwrap();

    let mut rng = StdRng::seed_from_u64(seed);
    let length = Normal::new(mean, std_dev).unwrap();
    let frames = (0..num_frames)
        .map(|_| {
            (0..num_dimers)
                .flat_map(|i| {
                    let first = Point::new(2.0 * i as f64, 0.0, 0.0);
                    let second = first + random_unit_vector(&mut rng) * length.sample(&mut rng);
                    [first, second]
                })
                .collect()
        })
        .collect();
    (topology, Trajectory::new(frames).unwrap())
}

/// A-B-C molecule where C is placed uniformly on a sphere around B.
///
/// The raw angle distribution is proportional to sin(θ).
pub fn uniform_angle_trajectory(num_frames: usize, seed: u64) -> (Topology, Trajectory) {
    let topology = Topology::new(["A", "B", "C"], [[0, 1], [1, 2]]).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let frames = (0..num_frames)
        .map(|_| {
            vec![
                Point::new(0.0, 0.0, 0.3),
                Point::zeros(),
                random_unit_vector(&mut rng) * 0.3,
            ]
        })
        .collect();
    (topology, Trajectory::new(frames).unwrap())
}
