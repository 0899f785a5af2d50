//! Softmax cross-entropy loss
//!
//! One forward call returns both the mean batch loss and the logit gradient
//! `(softmax − onehot) / batch_size`, which the trainer feeds straight into
//! the model's backward pass.

use ndarray::{Array1, Array2, ArrayView1};

/// Floor under probabilities before taking the log
const LOG_FLOOR: f32 = 1e-10;

/// Cross-entropy over per-class logits and integer labels
///
/// # Example
///
/// ```
/// use ensayar::CrossEntropyLoss;
/// use ndarray::{array, Array1};
///
/// let loss_fn = CrossEntropyLoss;
/// let logits = array![[5.0, 0.0, 0.0]];
/// let labels = Array1::from(vec![0usize]);
///
/// let (loss, grad) = loss_fn.forward(&logits, &labels);
/// assert!(loss > 0.0 && loss < 0.1);
/// assert_eq!(grad.shape(), logits.shape());
/// ```
#[derive(Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Numerically stable softmax of one logit row
    pub(crate) fn softmax_row(row: ArrayView1<'_, f32>) -> Array1<f32> {
        let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp: Array1<f32> = row.mapv(|v| (v - max).exp());
        let sum = exp.sum();
        exp / sum
    }

    /// Mean loss over the batch and the gradient with respect to the logits
    ///
    /// Labels must be valid class indices for the logit width.
    pub fn forward(&self, logits: &Array2<f32>, labels: &Array1<usize>) -> (f32, Array2<f32>) {
        let n = logits.nrows();
        assert_eq!(n, labels.len(), "logit rows and labels must match");
        assert!(n > 0, "cannot compute loss over an empty batch");

        let mut grad = Array2::zeros(logits.raw_dim());
        let mut total = 0.0;

        for (i, (row, &label)) in logits.rows().into_iter().zip(labels.iter()).enumerate() {
            assert!(
                label < logits.ncols(),
                "label {label} out of range for {} classes",
                logits.ncols()
            );

            let probs = Self::softmax_row(row);
            total -= (probs[label] + LOG_FLOOR).ln();

            let scale = 1.0 / n as f32;
            for (j, &p) in probs.iter().enumerate() {
                let onehot = if j == label { 1.0 } else { 0.0 };
                grad[[i, j]] = (p - onehot) * scale;
            }
        }

        (total / n as f32, grad)
    }
}
