//! Batch normalization over a feature axis

use ndarray::{Array1, Array2, Axis};

use super::{Layer, ParamMut};

/// Per-feature batch normalization with learned scale and shift
///
/// Training mode normalizes with batch statistics and updates running
/// estimates; evaluation mode normalizes with the running estimates. The
/// train/eval distinction is the only behavioral difference.
pub struct BatchNorm1d {
    gamma: Array1<f32>,
    beta: Array1<f32>,
    grad_gamma: Array1<f32>,
    grad_beta: Array1<f32>,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
    momentum: f32,
    eps: f32,
    cache: Option<Cache>,
}

struct Cache {
    x_hat: Array2<f32>,
    inv_std: Array1<f32>,
}

impl BatchNorm1d {
    /// Create a layer normalizing `dim` features
    pub fn new(dim: usize) -> Self {
        Self {
            gamma: Array1::ones(dim),
            beta: Array1::zeros(dim),
            grad_gamma: Array1::zeros(dim),
            grad_beta: Array1::zeros(dim),
            running_mean: Array1::zeros(dim),
            running_var: Array1::ones(dim),
            momentum: 0.1,
            eps: 1e-5,
            cache: None,
        }
    }

    /// Running mean estimate used in evaluation mode
    pub fn running_mean(&self) -> &Array1<f32> {
        &self.running_mean
    }

    /// Running variance estimate used in evaluation mode
    pub fn running_var(&self) -> &Array1<f32> {
        &self.running_var
    }
}

impl Layer for BatchNorm1d {
    fn forward(&mut self, input: &Array2<f32>, training: bool) -> Array2<f32> {
        if !training {
            let inv_std = self.running_var.mapv(|v| 1.0 / (v + self.eps).sqrt());
            return (input - &self.running_mean) * &inv_std * &self.gamma + &self.beta;
        }

        let n = input.nrows() as f32;
        let mean = input.sum_axis(Axis(0)) / n;
        let centered = input - &mean;
        let var = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;
        let inv_std = var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        let x_hat = centered * &inv_std;

        self.running_mean = &self.running_mean * (1.0 - self.momentum) + &mean * self.momentum;
        self.running_var = &self.running_var * (1.0 - self.momentum) + &var * self.momentum;

        let out = &x_hat * &self.gamma + &self.beta;
        self.cache = Some(Cache { x_hat, inv_std });
        out
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        let Cache { x_hat, inv_std } = self
            .cache
            .take()
            .expect("BatchNorm1d::backward without a training-mode forward");

        let n = grad_output.nrows() as f32;
        let grad_beta = grad_output.sum_axis(Axis(0));
        let grad_gamma = (grad_output * &x_hat).sum_axis(Axis(0));

        let coef = &self.gamma * &inv_std / n;
        let dx = (grad_output * n - &grad_beta - &x_hat * &grad_gamma) * &coef;

        self.grad_gamma += &grad_gamma;
        self.grad_beta += &grad_beta;
        dx
    }

    fn params(&mut self) -> Vec<ParamMut<'_>> {
        vec![
            ParamMut {
                data: self.gamma.view_mut().into_dyn(),
                grad: self.grad_gamma.view_mut().into_dyn(),
            },
            ParamMut {
                data: self.beta.view_mut().into_dyn(),
                grad: self.grad_beta.view_mut().into_dyn(),
            },
        ]
    }

    fn num_params(&self) -> usize {
        self.gamma.len() + self.beta.len()
    }

    fn name(&self) -> &'static str {
        "BatchNorm1d"
    }
}
