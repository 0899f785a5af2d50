//! The training loop
//!
//! [`Trainer`] owns the model, optimizer, and loss function for one run and
//! drives the epoch/step loop, forwarding metric records to the tracking
//! run as it goes.

mod trainer;

pub use trainer::{TrainError, TrainResult, Trainer};

/// Metric keys the trainer logs
pub mod keys {
    /// Mean loss of the step's training batch
    pub const TRAIN_LOSS: &str = "train/loss";
    /// 1-indexed epoch the step belongs to
    pub const EPOCH: &str = "epoch";
    /// Cumulative count of training examples seen
    pub const EXAMPLES: &str = "examples";
    /// Mean loss over the full validation pass
    pub const VALID_LOSS: &str = "valid/loss";
    /// Validation accuracy fraction
    pub const VALID_ACCURACY: &str = "valid/accuracy";
}
