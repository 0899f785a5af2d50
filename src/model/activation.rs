//! Nonlinearities

use ndarray::Array2;

use super::Layer;

/// Rectified linear unit
#[derive(Default)]
pub struct Relu {
    mask: Option<Array2<f32>>,
}

impl Relu {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for Relu {
    fn forward(&mut self, input: &Array2<f32>, training: bool) -> Array2<f32> {
        if training {
            self.mask = Some(input.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }));
        }
        input.mapv(|v| v.max(0.0))
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        let mask = self
            .mask
            .take()
            .expect("Relu::backward without a training-mode forward");
        grad_output * &mask
    }

    fn name(&self) -> &'static str {
        "Relu"
    }
}
