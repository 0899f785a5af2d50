//! Seeded synthetic classification data
//!
//! Gaussian class clusters, balanced across classes. Used by tests, doc
//! examples, and the `synth` CLI command so nothing in the crate requires
//! data files on disk.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Dataset;

/// Spread of each cluster around its center
const CLUSTER_STDDEV: f32 = 0.75;

/// Standard normal sample via Box-Muller
fn normal(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Generate a balanced Gaussian-cluster classification dataset
///
/// Example `i` belongs to class `i % n_classes`; its features are the class
/// center plus seeded Gaussian noise. The same seed always produces the same
/// dataset.
pub fn synthetic_classification(
    n_examples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> Dataset {
    assert!(n_classes >= 1, "need at least one class");
    assert!(n_features >= 1, "need at least one feature");

    let mut rng = StdRng::seed_from_u64(seed);

    let centers = Array2::from_shape_fn((n_classes, n_features), |_| rng.gen_range(-3.0..3.0));

    let labels = Array1::from_shape_fn(n_examples, |i| i % n_classes);
    let features = Array2::from_shape_fn((n_examples, n_features), |(i, j)| {
        centers[[i % n_classes, j]] + CLUSTER_STDDEV * normal(&mut rng)
    });

    // Lengths agree by construction
    Dataset { features, labels }
}
