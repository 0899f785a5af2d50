//! Dropout regularization

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Layer;

/// Inverted dropout: active in training mode only
///
/// Each activation is zeroed with probability `p` and survivors are scaled
/// by `1 / (1 - p)`, so the expected activation is unchanged. Evaluation
/// mode is the identity. The mask RNG is seeded, so a fixed seed gives a
/// fixed mask sequence.
pub struct Dropout {
    p: f32,
    rng: StdRng,
    mask: Option<Array2<f32>>,
}

impl Dropout {
    /// Create a dropout layer with drop probability `p` in [0, 1)
    pub fn new(p: f32, seed: u64) -> Self {
        Self {
            p,
            rng: StdRng::seed_from_u64(seed),
            mask: None,
        }
    }
}

impl Layer for Dropout {
    fn forward(&mut self, input: &Array2<f32>, training: bool) -> Array2<f32> {
        if !training || self.p == 0.0 {
            if training {
                // p == 0: backward passes gradients through unchanged
                self.mask = None;
            }
            return input.to_owned();
        }

        let scale = 1.0 / (1.0 - self.p);
        let p = self.p;
        let rng = &mut self.rng;
        let mask = Array2::from_shape_fn(input.raw_dim(), |_| {
            if rng.gen::<f32>() < p {
                0.0
            } else {
                scale
            }
        });
        let out = input * &mask;
        self.mask = Some(mask);
        out
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        match self.mask.take() {
            Some(mask) => grad_output * &mask,
            None => grad_output.to_owned(),
        }
    }

    fn name(&self) -> &'static str {
        "Dropout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_eval_is_identity() {
        let mut drop = Dropout::new(0.5, 0);
        let x = Array2::from_elem((4, 4), 2.0);
        assert_eq!(drop.forward(&x, false), x);
    }

    #[test]
    fn test_zero_probability_is_identity_in_training() {
        let mut drop = Dropout::new(0.0, 0);
        let x = Array2::from_elem((4, 4), 2.0);
        assert_eq!(drop.forward(&x, true), x);
        assert_eq!(drop.backward(&x), x);
    }

    #[test]
    fn test_training_zeroes_and_scales() {
        let mut drop = Dropout::new(0.5, 7);
        let x = Array2::from_elem((20, 20), 1.0);
        let out = drop.forward(&x, true);

        let zeros = out.iter().filter(|&&v| v == 0.0).count();
        let scaled = out.iter().filter(|&&v| (v - 2.0).abs() < 1e-6).count();
        assert_eq!(zeros + scaled, 400);
        // With p = 0.5 over 400 draws both outcomes occur
        assert!(zeros > 0 && scaled > 0);
    }

    #[test]
    fn test_backward_reuses_forward_mask() {
        let mut drop = Dropout::new(0.5, 3);
        let x = Array2::from_elem((6, 6), 1.0);
        let out = drop.forward(&x, true);
        let dx = drop.backward(&Array2::from_elem((6, 6), 1.0));
        // Gradient is zero exactly where the forward output was zeroed
        assert_eq!(out, dx);
    }

    #[test]
    fn test_same_seed_same_masks() {
        let x = Array2::from_elem((8, 8), 1.0);
        let mut a = Dropout::new(0.3, 11);
        let mut b = Dropout::new(0.3, 11);
        assert_eq!(a.forward(&x, true), b.forward(&x, true));
    }
}
