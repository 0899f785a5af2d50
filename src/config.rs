//! Training configuration
//!
//! [`TrainConfig`] is the immutable record of one run's hyperparameters.
//! It is created once, validated up front, logged verbatim into the tracking
//! run, and never mutated during training.

use serde::{Deserialize, Serialize};

/// Which optimizer the trainer constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Stochastic gradient descent with momentum
    Sgd,
    /// Adam with bias-corrected moment estimates
    Adam,
}

/// Errors from configuration validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("epochs must be at least 1")]
    ZeroEpochs,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("slice_size must be at least 2 to allow a train/valid split")]
    SliceTooSmall,

    #[error("learning_rate must be finite and positive, got {0}")]
    InvalidLearningRate(f32),

    #[error("dropout must lie in [0, 1), got {0}")]
    InvalidDropout(f32),

    #[error("valid_fraction must lie in (0, 1), got {0}")]
    InvalidValidFraction(f32),

    #[error("momentum must lie in [0, 1), got {0}")]
    InvalidMomentum(f32),

    #[error("input_dim must be at least 1")]
    ZeroInputDim,

    #[error("hidden_dim must be at least 1")]
    ZeroHiddenDim,

    #[error("n_classes must be at least 2, got {0}")]
    TooFewClasses(usize),
}

/// Hyperparameters for one training run
///
/// # Example
///
/// ```
/// use ensayar::{OptimizerKind, TrainConfig};
///
/// let config = TrainConfig::new()
///     .with_epochs(1)
///     .with_batch_size(128)
///     .with_slice_size(10_000)
///     .with_valid_fraction(0.2)
///     .with_optimizer(OptimizerKind::Adam);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of passes over the training partition
    pub epochs: usize,
    /// Examples per training step
    pub batch_size: usize,
    /// Step size for the optimizer
    pub learning_rate: f32,
    /// Dropout probability in the hidden layer (training mode only)
    pub dropout: f32,
    /// Number of examples sampled from the full dataset for this run
    pub slice_size: usize,
    /// Fraction of the slice held out for validation
    pub valid_fraction: f32,
    /// Width of the flattened model input
    pub input_dim: usize,
    /// Width of the hidden layer
    pub hidden_dim: usize,
    /// Number of output classes
    pub n_classes: usize,
    /// Optimizer the trainer constructs
    pub optimizer: OptimizerKind,
    /// Momentum for SGD (ignored by Adam)
    pub momentum: f32,
    /// Seed for weight init, dropout masks, and the data split
    pub seed: u64,
    /// Print a progress line every N steps; 0 silences progress output
    pub log_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 128,
            learning_rate: 1e-3,
            dropout: 0.2,
            slice_size: 10_000,
            valid_fraction: 0.2,
            input_dim: 784,
            hidden_dim: 64,
            n_classes: 10,
            optimizer: OptimizerKind::Adam,
            momentum: 0.9,
            seed: 42,
            log_every: 100,
        }
    }
}

impl TrainConfig {
    /// Create a configuration with defaults sized for Fashion-MNIST style data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    #[must_use]
    pub fn with_dropout(mut self, p: f32) -> Self {
        self.dropout = p;
        self
    }

    #[must_use]
    pub fn with_slice_size(mut self, slice_size: usize) -> Self {
        self.slice_size = slice_size;
        self
    }

    #[must_use]
    pub fn with_valid_fraction(mut self, fraction: f32) -> Self {
        self.valid_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_input_dim(mut self, dim: usize) -> Self {
        self.input_dim = dim;
        self
    }

    #[must_use]
    pub fn with_hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    #[must_use]
    pub fn with_n_classes(mut self, n: usize) -> Self {
        self.n_classes = n;
        self
    }

    #[must_use]
    pub fn with_optimizer(mut self, kind: OptimizerKind) -> Self {
        self.optimizer = kind;
        self
    }

    #[must_use]
    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_log_every(mut self, every: usize) -> Self {
        self.log_every = every;
        self
    }

    /// Check every field for out-of-range values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::ZeroEpochs);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.slice_size < 2 {
            return Err(ConfigError::SliceTooSmall);
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::InvalidDropout(self.dropout));
        }
        if !self.valid_fraction.is_finite()
            || self.valid_fraction <= 0.0
            || self.valid_fraction >= 1.0
        {
            return Err(ConfigError::InvalidValidFraction(self.valid_fraction));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ConfigError::InvalidMomentum(self.momentum));
        }
        if self.input_dim == 0 {
            return Err(ConfigError::ZeroInputDim);
        }
        if self.hidden_dim == 0 {
            return Err(ConfigError::ZeroHiddenDim);
        }
        if self.n_classes < 2 {
            return Err(ConfigError::TooFewClasses(self.n_classes));
        }
        Ok(())
    }
}
