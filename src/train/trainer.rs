//! Trainer orchestration

use std::time::Instant;

use super::keys;
use crate::config::{ConfigError, OptimizerKind, TrainConfig};
use crate::data::{Batch, DataLoader};
use crate::eval::{EvalError, Evaluator};
use crate::loss::CrossEntropyLoss;
use crate::model::Mlp;
use crate::optim::{Adam, Optimizer, Sgd};
use crate::tracking::storage::TrackingBackend;
use crate::tracking::{MetricRecord, Run, TrackingError};

/// Errors that abort a training run
///
/// There is no retry or recovery: whatever fails first propagates out of
/// [`Trainer::fit`] and the run is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("training partition is empty")]
    EmptyTrainingSet,

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

/// Final metrics of a completed training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainResult {
    /// Number of epochs executed
    pub epochs_run: usize,
    /// Mean training loss of the last epoch
    pub final_train_loss: f32,
    /// Validation loss after the last epoch
    pub final_valid_loss: f32,
    /// Validation accuracy after the last epoch
    pub final_accuracy: f32,
    /// Lowest validation loss over all epochs
    pub best_valid_loss: f32,
    /// Total training examples consumed
    pub examples_seen: u64,
    /// Wall-clock training time
    pub elapsed_secs: f64,
}

/// Drives the train/validate loop for one configuration
///
/// Construction builds the model, optimizer, and loss function from the
/// configuration. [`fit`](Trainer::fit) then runs the epochs: every training
/// step logs `train/loss`, `epoch`, and `examples`; every epoch end runs a
/// full validation pass and logs `valid/loss` and `valid/accuracy`.
///
/// # Example
///
/// ```
/// use ensayar::data::synthetic_classification;
/// use ensayar::tracking::storage::InMemoryBackend;
/// use ensayar::{Run, TrainConfig, Trainer};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TrainConfig::new()
///     .with_epochs(2)
///     .with_batch_size(10)
///     .with_slice_size(50)
///     .with_input_dim(4)
///     .with_hidden_dim(8)
///     .with_n_classes(2)
///     .with_log_every(0);
///
/// let dataset = synthetic_classification(50, 4, 2, config.seed);
/// let (train, valid) =
///     dataset.split(config.batch_size, config.slice_size, config.valid_fraction, config.seed)?;
///
/// let mut run = Run::init("demo", &config, InMemoryBackend::new())?;
/// let mut trainer = Trainer::new(config)?;
/// let result = trainer.fit(&train, &valid, &mut run)?;
///
/// assert_eq!(result.epochs_run, 2);
/// run.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct Trainer {
    model: Mlp,
    optimizer: Box<dyn Optimizer>,
    loss_fn: CrossEntropyLoss,
    evaluator: Evaluator,
    config: TrainConfig,
    examples_seen: u64,
}

impl Trainer {
    /// Build a trainer from a validated configuration
    pub fn new(config: TrainConfig) -> Result<Self, TrainError> {
        config.validate()?;

        let model = Mlp::new(&config);
        let optimizer: Box<dyn Optimizer> = match config.optimizer {
            OptimizerKind::Sgd => Box::new(Sgd::new(config.learning_rate, config.momentum)),
            OptimizerKind::Adam => Box::new(Adam::with_defaults(config.learning_rate)),
        };

        Ok(Self {
            model,
            optimizer,
            loss_fn: CrossEntropyLoss,
            evaluator: Evaluator::new(),
            config,
            examples_seen: 0,
        })
    }

    /// The run's configuration
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// The model being trained
    pub fn model(&self) -> &Mlp {
        &self.model
    }

    /// Cumulative count of training examples consumed
    pub fn examples_seen(&self) -> u64 {
        self.examples_seen
    }

    /// Train for the configured number of epochs
    ///
    /// Emits one metric record per training step and one validation record
    /// per epoch into `run`, so a full fit logs exactly
    /// `epochs * train.num_batches() + epochs` records.
    pub fn fit<B: TrackingBackend>(
        &mut self,
        train: &DataLoader,
        valid: &DataLoader,
        run: &mut Run<B>,
    ) -> Result<TrainResult, TrainError> {
        if train.is_empty() {
            return Err(TrainError::EmptyTrainingSet);
        }

        let start = Instant::now();
        let steps_per_epoch = train.num_batches();
        let mut final_train_loss = 0.0f32;
        let mut final_valid_loss = 0.0f32;
        let mut final_accuracy = 0.0f32;
        let mut best_valid_loss = f32::INFINITY;

        for epoch in 1..=self.config.epochs {
            self.model.train();
            let mut loss_sum = 0.0f32;

            for (step, batch) in train.iter().enumerate() {
                let loss = self.train_step(&batch);
                loss_sum += loss;
                self.examples_seen += batch.size() as u64;

                run.log(
                    MetricRecord::new()
                        .with(keys::TRAIN_LOSS, f64::from(loss))
                        .with(keys::EPOCH, epoch as f64)
                        .with(keys::EXAMPLES, self.examples_seen as f64),
                )?;

                if self.config.log_every > 0 && (step + 1) % self.config.log_every == 0 {
                    println!(
                        "epoch {epoch} step {:>4}/{steps_per_epoch} | loss {loss:.4}",
                        step + 1
                    );
                }
            }

            final_train_loss = loss_sum / steps_per_epoch as f32;

            let report = self.evaluator.evaluate(&mut self.model, valid)?;
            run.log(
                MetricRecord::new()
                    .with(keys::VALID_LOSS, f64::from(report.loss))
                    .with(keys::VALID_ACCURACY, f64::from(report.accuracy)),
            )?;

            final_valid_loss = report.loss;
            final_accuracy = report.accuracy;
            best_valid_loss = best_valid_loss.min(report.loss);

            if self.config.log_every > 0 {
                println!(
                    "epoch {epoch} | train loss {final_train_loss:.4} | valid loss {:.4} | accuracy {:.2}%",
                    report.loss,
                    report.accuracy * 100.0
                );
            }
        }

        Ok(TrainResult {
            epochs_run: self.config.epochs,
            final_train_loss,
            final_valid_loss,
            final_accuracy,
            best_valid_loss,
            examples_seen: self.examples_seen,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Forward, loss, backward, update for one batch
    fn train_step(&mut self, batch: &Batch) -> f32 {
        let logits = self.model.forward(&batch.inputs);
        let (loss, grad_logits) = self.loss_fn.forward(&logits, &batch.labels);

        {
            let mut params = self.model.params();
            self.optimizer.zero_grad(&mut params);
        }
        self.model.backward(&grad_logits);
        {
            let mut params = self.model.params();
            self.optimizer.step(&mut params);
        }

        loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{synthetic_classification, Dataset};
    use crate::tracking::storage::InMemoryBackend;

    fn config() -> TrainConfig {
        TrainConfig::new()
            .with_epochs(2)
            .with_batch_size(10)
            .with_slice_size(60)
            .with_valid_fraction(0.25)
            .with_input_dim(5)
            .with_hidden_dim(8)
            .with_n_classes(3)
            .with_dropout(0.1)
            .with_log_every(0)
    }

    fn loaders(config: &TrainConfig) -> (crate::data::DataLoader, crate::data::DataLoader) {
        let dataset: Dataset =
            synthetic_classification(60, config.input_dim, config.n_classes, config.seed);
        dataset
            .split(
                config.batch_size,
                config.slice_size,
                config.valid_fraction,
                config.seed,
            )
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let bad = TrainConfig::new().with_epochs(0);
        assert!(matches!(Trainer::new(bad), Err(TrainError::Config(_))));
    }

    #[test]
    fn test_record_count_matches_contract() {
        let config = config();
        let (train, valid) = loaders(&config);
        let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
        let mut trainer = Trainer::new(config.clone()).unwrap();

        trainer.fit(&train, &valid, &mut run).unwrap();

        let expected = config.epochs * train.num_batches() + config.epochs;
        assert_eq!(run.records_logged(), expected as u64);
    }

    #[test]
    fn test_examples_counter_is_cumulative_sum_of_batch_sizes() {
        let config = config();
        let (train, valid) = loaders(&config);
        let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
        let mut trainer = Trainer::new(config.clone()).unwrap();

        let result = trainer.fit(&train, &valid, &mut run).unwrap();
        assert_eq!(
            result.examples_seen,
            (config.epochs * train.num_examples()) as u64
        );

        let sizes: Vec<u64> = train.iter().map(|b| b.size() as u64).collect();
        let mut previous = 0.0;
        let mut running = 0u64;
        let mut batch_sizes = sizes.iter().copied().cycle();
        for record in run.records() {
            let Some(examples) = record.values.get(keys::EXAMPLES) else {
                continue; // validation record
            };
            running += batch_sizes.next().unwrap();
            assert!(examples >= previous, "examples count decreased");
            assert_eq!(examples, running as f64);
            previous = examples;
        }
    }

    #[test]
    fn test_epoch_key_is_one_indexed() {
        let config = config();
        let (train, valid) = loaders(&config);
        let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
        let mut trainer = Trainer::new(config.clone()).unwrap();
        trainer.fit(&train, &valid, &mut run).unwrap();

        let epochs: Vec<f64> = run
            .records()
            .iter()
            .filter_map(|r| r.values.get(keys::EPOCH))
            .collect();
        assert_eq!(epochs.first(), Some(&1.0));
        assert_eq!(epochs.last(), Some(&(config.epochs as f64)));
    }

    #[test]
    fn test_validation_records_have_bounded_values() {
        let config = config();
        let (train, valid) = loaders(&config);
        let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
        let mut trainer = Trainer::new(config.clone()).unwrap();
        trainer.fit(&train, &valid, &mut run).unwrap();

        let valid_records: Vec<_> = run
            .records()
            .iter()
            .filter(|r| r.values.get(keys::VALID_LOSS).is_some())
            .collect();
        assert_eq!(valid_records.len(), config.epochs);

        for record in valid_records {
            let loss = record.values.get(keys::VALID_LOSS).unwrap();
            let acc = record.values.get(keys::VALID_ACCURACY).unwrap();
            assert!(loss >= 0.0 && loss.is_finite());
            assert!((0.0..=1.0).contains(&acc));
        }
    }

    #[test]
    fn test_fixed_seed_reproduces_final_accuracy() {
        let config = config();
        let (train, valid) = loaders(&config);

        let run_once = || {
            let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
            let mut trainer = Trainer::new(config.clone()).unwrap();
            trainer.fit(&train, &valid, &mut run).unwrap()
        };

        let a = run_once();
        let b = run_once();
        assert_eq!(a.final_accuracy, b.final_accuracy);
        assert_eq!(a.final_valid_loss, b.final_valid_loss);
        assert_eq!(a.final_train_loss, b.final_train_loss);
    }

    #[test]
    fn test_training_learns_separable_clusters() {
        let config = config()
            .with_epochs(30)
            .with_dropout(0.0)
            .with_learning_rate(0.01);
        let (train, valid) = loaders(&config);
        let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
        let mut trainer = Trainer::new(config).unwrap();

        let result = trainer.fit(&train, &valid, &mut run).unwrap();
        // Well-separated Gaussian clusters are easy; anything below chance
        // means the loop is broken.
        assert!(
            result.final_accuracy > 0.5,
            "accuracy {}",
            result.final_accuracy
        );
        assert!(result.best_valid_loss <= result.final_valid_loss + 1e-6);
    }

    #[test]
    fn test_empty_training_partition_is_rejected() {
        let config = config();
        let (_, valid) = loaders(&config);
        let empty = crate::data::DataLoader::new(
            ndarray::Array2::zeros((0, 5)),
            ndarray::Array1::from(Vec::<usize>::new()),
            10,
        );
        let mut run = Run::init("t", &config, InMemoryBackend::new()).unwrap();
        let mut trainer = Trainer::new(config).unwrap();

        assert!(matches!(
            trainer.fit(&empty, &valid, &mut run),
            Err(TrainError::EmptyTrainingSet)
        ));
    }
}
