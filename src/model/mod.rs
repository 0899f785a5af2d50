//! Feed-forward classifier with manual backward passes
//!
//! The model is a fixed composition: flatten (done by the data provider) →
//! linear → batch norm → ReLU → dropout → linear, producing per-class
//! logits. There is no autograd tape; each [`Layer`] caches what its own
//! backward pass needs during the training-mode forward.
//!
//! The model has exactly two states, training and evaluation, toggled by the
//! trainer and evaluator. The mode affects dropout sampling and which
//! normalization statistics are used, nothing else.

mod activation;
mod batch_norm;
mod dropout;
mod linear;

pub use activation::Relu;
pub use batch_norm::BatchNorm1d;
pub use dropout::Dropout;
pub use linear::Linear;

use ndarray::{Array2, ArrayViewMutD};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TrainConfig;

/// Mutable view of one parameter tensor and its accumulated gradient
///
/// The seam between layers and optimizers: layers hand these out in a fixed
/// order, optimizers update `data` in place from `grad`.
pub struct ParamMut<'a> {
    pub data: ArrayViewMutD<'a, f32>,
    pub grad: ArrayViewMutD<'a, f32>,
}

/// One differentiable stage of the model
///
/// `forward` in training mode caches whatever `backward` needs; `backward`
/// consumes that cache, accumulates parameter gradients, and returns the
/// gradient with respect to its input. Calling `backward` without a
/// preceding training-mode `forward` is a contract violation and panics.
pub trait Layer {
    /// Compute the layer output for a batch
    fn forward(&mut self, input: &Array2<f32>, training: bool) -> Array2<f32>;

    /// Propagate gradients, accumulating into parameter gradients
    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32>;

    /// Parameter tensors in a fixed order; empty for stateless layers
    fn params(&mut self) -> Vec<ParamMut<'_>> {
        Vec::new()
    }

    /// Number of trainable scalars
    fn num_params(&self) -> usize {
        0
    }

    /// Layer name for display
    fn name(&self) -> &'static str;
}

/// The multi-layer perceptron classifier
///
/// # Example
///
/// ```
/// use ensayar::{Mlp, TrainConfig};
/// use ndarray::Array2;
///
/// let config = TrainConfig::new().with_input_dim(4).with_hidden_dim(8).with_n_classes(3);
/// let mut model = Mlp::new(&config);
///
/// let logits = model.forward(&Array2::zeros((2, 4)));
/// assert_eq!(logits.shape(), &[2, 3]);
/// ```
pub struct Mlp {
    fc1: Linear,
    norm: BatchNorm1d,
    act: Relu,
    drop: Dropout,
    fc2: Linear,
    training: bool,
}

impl Mlp {
    /// Build the model from a configuration, seeding weight init and dropout
    pub fn new(config: &TrainConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let fc1 = Linear::new(config.input_dim, config.hidden_dim, &mut rng);
        let fc2 = Linear::new(config.hidden_dim, config.n_classes, &mut rng);
        Self {
            fc1,
            norm: BatchNorm1d::new(config.hidden_dim),
            act: Relu::new(),
            drop: Dropout::new(config.dropout, config.seed.wrapping_add(1)),
            fc2,
            training: true,
        }
    }

    /// Switch to training mode
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Switch to evaluation mode
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Whether the model is in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    fn layers(&self) -> [&dyn Layer; 5] {
        [&self.fc1, &self.norm, &self.act, &self.drop, &self.fc2]
    }

    fn layers_mut(&mut self) -> [&mut dyn Layer; 5] {
        [
            &mut self.fc1,
            &mut self.norm,
            &mut self.act,
            &mut self.drop,
            &mut self.fc2,
        ]
    }

    /// Compute per-class logits for a batch of flattened inputs
    pub fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        let training = self.training;
        let mut out = input.to_owned();
        for layer in self.layers_mut() {
            out = layer.forward(&out, training);
        }
        out
    }

    /// Backpropagate a logit gradient through every layer
    pub fn backward(&mut self, grad_logits: &Array2<f32>) {
        let mut grad = grad_logits.to_owned();
        for layer in self.layers_mut().into_iter().rev() {
            grad = layer.backward(&grad);
        }
    }

    /// All parameter tensors, in layer order
    pub fn params(&mut self) -> Vec<ParamMut<'_>> {
        self.layers_mut()
            .into_iter()
            .flat_map(|layer| layer.params())
            .collect()
    }

    /// Total number of trainable scalars
    pub fn num_params(&self) -> usize {
        self.layers().iter().map(|layer| layer.num_params()).sum()
    }
}
