//! Fully-connected layer

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use super::{Layer, ParamMut};

/// Affine transform `y = x W + b` with He-uniform weight init
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
    grad_weight: Array2<f32>,
    grad_bias: Array1<f32>,
    input: Option<Array2<f32>>,
}

impl Linear {
    /// Create a layer mapping `in_dim` features to `out_dim`
    pub fn new(in_dim: usize, out_dim: usize, rng: &mut StdRng) -> Self {
        let bound = (6.0 / in_dim as f32).sqrt();
        Self {
            weight: Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-bound..bound)),
            bias: Array1::zeros(out_dim),
            grad_weight: Array2::zeros((in_dim, out_dim)),
            grad_bias: Array1::zeros(out_dim),
            input: None,
        }
    }

    /// Weight matrix, shape `(in_dim, out_dim)`
    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    /// Bias vector, shape `(out_dim,)`
    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }
}

impl Layer for Linear {
    fn forward(&mut self, input: &Array2<f32>, training: bool) -> Array2<f32> {
        if training {
            self.input = Some(input.to_owned());
        }
        input.dot(&self.weight) + &self.bias
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        let input = self
            .input
            .take()
            .expect("Linear::backward without a training-mode forward");

        self.grad_weight += &input.t().dot(grad_output);
        self.grad_bias += &grad_output.sum_axis(Axis(0));
        grad_output.dot(&self.weight.t())
    }

    fn params(&mut self) -> Vec<ParamMut<'_>> {
        vec![
            ParamMut {
                data: self.weight.view_mut().into_dyn(),
                grad: self.grad_weight.view_mut().into_dyn(),
            },
            ParamMut {
                data: self.bias.view_mut().into_dyn(),
                grad: self.grad_bias.view_mut().into_dyn(),
            },
        ]
    }

    fn num_params(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    fn name(&self) -> &'static str {
        "Linear"
    }
}
