//! Stochastic gradient descent

use ndarray::ArrayD;

use super::Optimizer;
use crate::model::ParamMut;

/// SGD with optional momentum
///
/// Velocity buffers are allocated lazily on the first step, one per
/// parameter position.
pub struct Sgd {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<ArrayD<f32>>>,
}

impl Sgd {
    /// Create a new SGD optimizer; `momentum` of 0 disables the velocity term
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }

    fn ensure_state(&mut self, n: usize) {
        if self.velocities.len() < n {
            self.velocities.resize(n, None);
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [ParamMut<'_>]) {
        self.ensure_state(params.len());

        for (i, param) in params.iter_mut().enumerate() {
            if self.momentum > 0.0 {
                let velocity = self.velocities[i]
                    .get_or_insert_with(|| ArrayD::zeros(param.grad.raw_dim()));

                // v = momentum * v - lr * grad; param += v
                velocity.mapv_inplace(|v| v * self.momentum);
                velocity.scaled_add(-self.lr, &param.grad);
                param.data.scaled_add(1.0, velocity);
            } else {
                param.data.scaled_add(-self.lr, &param.grad);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::test_support::descend_quadratic;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_plain_sgd_descends_quadratic() {
        let mut opt = Sgd::new(0.1, 0.0);
        let end = descend_quadratic(&mut opt, 5.0, 50);
        assert!(end.abs() < 1e-3, "ended at {end}");
    }

    #[test]
    fn test_momentum_sgd_descends_quadratic() {
        let mut opt = Sgd::new(0.05, 0.9);
        let end = descend_quadratic(&mut opt, 5.0, 200);
        assert!(end.abs() < 1e-2, "ended at {end}");
    }

    #[test]
    fn test_single_step_update() {
        let mut opt = Sgd::new(0.5, 0.0);
        // One step from x = 1 with grad 2x: x' = 1 - 0.5 * 2 = 0
        let end = descend_quadratic(&mut opt, 1.0, 1);
        assert_abs_diff_eq!(end, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lr_accessors() {
        let mut opt = Sgd::new(0.1, 0.0);
        assert_eq!(opt.lr(), 0.1);
        opt.set_lr(0.02);
        assert_eq!(opt.lr(), 0.02);
    }
}
