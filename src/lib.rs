//! Instrumented MLP training with experiment tracking
//!
//! This crate demonstrates how to wire a small image-classification training
//! loop into an experiment-tracking layer: a run is initialized with its
//! configuration, every training step logs a scalar metric record, and every
//! epoch logs a validation summary.
//!
//! The pieces:
//! - **`data`**: batching loaders over an in-memory dataset (IDX files or a
//!   synthetic generator)
//! - **`model`**: a feed-forward classifier (linear → batch norm → ReLU →
//!   dropout → linear) with manual backward passes
//! - **`optim`**: SGD and Adam behind an [`Optimizer`] trait
//! - **`eval`**: full-pass validation loss and accuracy
//! - **`train`**: the epoch/step loop that forwards metrics to the tracker
//! - **`tracking`**: the run handle and its pluggable storage backends
//!
//! # Example
//!
//! ```
//! use ensayar::data::synthetic_classification;
//! use ensayar::tracking::storage::InMemoryBackend;
//! use ensayar::{Run, TrainConfig, Trainer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrainConfig::new()
//!     .with_epochs(1)
//!     .with_batch_size(16)
//!     .with_slice_size(80)
//!     .with_input_dim(8)
//!     .with_hidden_dim(8)
//!     .with_n_classes(3)
//!     .with_log_every(0);
//!
//! let dataset = synthetic_classification(100, 8, 3, config.seed);
//! let (train, valid) = dataset.split(
//!     config.batch_size,
//!     config.slice_size,
//!     config.valid_fraction,
//!     config.seed,
//! )?;
//!
//! let backend = InMemoryBackend::new();
//! let mut run = Run::init("demo", &config, backend.clone())?;
//! let mut trainer = Trainer::new(config)?;
//!
//! let result = trainer.fit(&train, &valid, &mut run)?;
//! assert!(result.final_accuracy >= 0.0 && result.final_accuracy <= 1.0);
//!
//! // One record per training step, plus one validation record per epoch.
//! assert_eq!(run.records_logged(), train.num_batches() as u64 + 1);
//! run.finish()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod eval;
pub mod loss;
pub mod model;
pub mod optim;
pub mod tracking;
pub mod train;

pub use config::{ConfigError, OptimizerKind, TrainConfig};
pub use data::{get_dataloaders, Batch, DataError, DataLoader, Dataset};
pub use eval::{EvalError, EvalReport, Evaluator};
pub use loss::CrossEntropyLoss;
pub use model::Mlp;
pub use optim::{Adam, Optimizer, Sgd};
pub use tracking::{MetricRecord, Run, RunStatus, TrackingError};
pub use train::{TrainError, TrainResult, Trainer};
