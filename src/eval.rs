//! Full-pass validation
//!
//! The evaluator switches the model to evaluation mode (no dropout, running
//! normalization statistics, no gradient caches) and accumulates loss and
//! argmax accuracy over every batch of the validation partition.

use ndarray::ArrayView1;

use crate::data::DataLoader;
use crate::loss::CrossEntropyLoss;
use crate::model::Mlp;

/// Errors from evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("validation partition is empty")]
    EmptyValidationSet,
}

/// Aggregate result of one validation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Mean loss over all validation examples
    pub loss: f32,
    /// Fraction of examples whose argmax prediction matches the label
    pub accuracy: f32,
    /// Number of examples evaluated
    pub examples: usize,
}

/// Index of the largest logit in a row
fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// Computes validation loss and accuracy for a trained model
///
/// Deterministic given fixed model weights and data order: evaluation mode
/// samples nothing and mutates nothing but the model's mode flag.
#[derive(Default)]
pub struct Evaluator {
    loss_fn: CrossEntropyLoss,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            loss_fn: CrossEntropyLoss,
        }
    }

    /// Run a full pass over `loader` and aggregate loss and accuracy
    ///
    /// Loss is weighted by batch size, so the partial final batch does not
    /// skew the mean.
    pub fn evaluate(&self, model: &mut Mlp, loader: &DataLoader) -> Result<EvalReport, EvalError> {
        if loader.is_empty() {
            return Err(EvalError::EmptyValidationSet);
        }

        model.eval();

        let mut total_loss = 0.0f64;
        let mut correct = 0usize;
        let mut examples = 0usize;

        for batch in loader.iter() {
            let logits = model.forward(&batch.inputs);
            let (loss, _) = self.loss_fn.forward(&logits, &batch.labels);

            total_loss += f64::from(loss) * batch.size() as f64;
            examples += batch.size();

            for (row, &label) in logits.rows().into_iter().zip(batch.labels.iter()) {
                if argmax(row) == label {
                    correct += 1;
                }
            }
        }

        Ok(EvalReport {
            loss: (total_loss / examples as f64) as f32,
            accuracy: correct as f32 / examples as f32,
            examples,
        })
    }
}
