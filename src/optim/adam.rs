//! Adam optimizer

use ndarray::{ArrayD, Zip};

use super::Optimizer;
use crate::model::ParamMut;

/// Adam with bias-corrected first and second moment estimates
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    t: i32,
    moments: Vec<Option<(ArrayD<f32>, ArrayD<f32>)>>,
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            eps,
            t: 0,
            moments: Vec::new(),
        }
    }

    /// Adam with the standard betas and epsilon
    pub fn with_defaults(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    fn ensure_state(&mut self, n: usize) {
        if self.moments.len() < n {
            self.moments.resize(n, None);
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [ParamMut<'_>]) {
        self.ensure_state(params.len());
        self.t += 1;

        let (beta1, beta2) = (self.beta1, self.beta2);
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        for (i, param) in params.iter_mut().enumerate() {
            let (m, v) = self.moments[i].get_or_insert_with(|| {
                (
                    ArrayD::zeros(param.grad.raw_dim()),
                    ArrayD::zeros(param.grad.raw_dim()),
                )
            });

            Zip::from(&mut *m)
                .and(&param.grad)
                .for_each(|m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            Zip::from(&mut *v)
                .and(&param.grad)
                .for_each(|v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

            let lr = self.lr;
            let eps = self.eps;
            Zip::from(&mut param.data)
                .and(&*m)
                .and(&*v)
                .for_each(|d, &m, &v| {
                    let m_hat = m / bias1;
                    let v_hat = v / bias2;
                    *d -= lr * m_hat / (v_hat.sqrt() + eps);
                });
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

    #[test]
    fn test_adam_descends_quadratic() {
        let mut opt = Adam::with_defaults(0.1);
        let end = descend_quadratic(&mut opt, 5.0, 500);
        assert!(end.abs() < 1e-2, "ended at {end}");
    }

    #[test]
    fn test_first_step_size_is_about_lr() {
        // With bias correction the first Adam step has magnitude ~lr
        let mut opt = Adam::with_defaults(0.1);
        let end = descend_quadratic(&mut opt, 5.0, 1);
        assert!((5.0 - end - 0.1).abs() < 1e-3, "ended at {end}");
    }

    #[test]
    fn test_lr_accessors() {
        let mut opt = Adam::with_defaults(0.01);
        assert_eq!(opt.lr(), 0.01);
        opt.set_lr(0.5);
        assert_eq!(opt.lr(), 0.5);
    }
}
