//! Optimization algorithms
//!
//! Optimizers update parameter tensors in place from their accumulated
//! gradients, via the [`ParamMut`] views the model hands out. Per-parameter
//! state (velocities, moments) is keyed by position in the parameter list,
//! which the model keeps in a fixed order.

mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use crate::model::ParamMut;

/// Trait for optimization algorithms
pub trait Optimizer {
    /// Perform a single update step over all parameters
    fn step(&mut self, params: &mut [ParamMut<'_>]);

    /// Zero out all accumulated gradients
    fn zero_grad(&mut self, params: &mut [ParamMut<'_>]) {
        for param in params.iter_mut() {
            param.grad.fill(0.0);
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}

#[cfg(test)]
pub(crate) mod test_support {
    use ndarray::ArrayD;

    use super::{Optimizer, ParamMut};

    /// Drive an optimizer down f(x) = x^2 from x0 and return the endpoint
    pub(crate) fn descend_quadratic(opt: &mut dyn Optimizer, x0: f32, steps: usize) -> f32 {
        let mut data = ArrayD::from_elem(ndarray::IxDyn(&[1]), x0);
        let mut grad = ArrayD::zeros(data.raw_dim());

        for _ in 0..steps {
            grad.assign(&(&data * 2.0));
            let mut params = vec![ParamMut {
                data: data.view_mut(),
                grad: grad.view_mut(),
            }];
            opt.step(&mut params);
        }
        data.iter().copied().next().unwrap()
    }
}
