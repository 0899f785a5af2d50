//! Batch data structures and the batching loader

use ndarray::{s, Array1, Array2};

/// A batch of flattened inputs and their class labels
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Input features, one example per row
    pub inputs: Array2<f32>,
    /// One class index per row of `inputs`
    pub labels: Array1<usize>,
}

impl Batch {
    /// Create a new batch
    pub fn new(inputs: Array2<f32>, labels: Array1<usize>) -> Self {
        Self { inputs, labels }
    }

    /// Number of examples in the batch
    pub fn size(&self) -> usize {
        self.labels.len()
    }
}

/// Yields a fixed sequence of batches over one data partition
///
/// The final batch is partial when the partition size is not a multiple of
/// the batch size. Iteration order never changes after construction.
#[derive(Debug, Clone)]
pub struct DataLoader {
    features: Array2<f32>,
    labels: Array1<usize>,
    batch_size: usize,
}

impl DataLoader {
    pub(crate) fn new(features: Array2<f32>, labels: Array1<usize>, batch_size: usize) -> Self {
        debug_assert_eq!(features.nrows(), labels.len());
        debug_assert!(batch_size > 0);
        Self {
            features,
            labels,
            batch_size,
        }
    }

    /// Total number of examples in the partition
    pub fn num_examples(&self) -> usize {
        self.labels.len()
    }

    /// Number of batches one pass yields, counting a partial final batch
    pub fn num_batches(&self) -> usize {
        self.num_examples().div_ceil(self.batch_size)
    }

    /// Width of a flattened example
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Highest class index plus one
    pub fn n_classes(&self) -> usize {
        self.labels.iter().max().map_or(0, |&m| m + 1)
    }

    /// Whether the partition holds no examples
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate the partition in fixed order
    pub fn iter(&self) -> impl Iterator<Item = Batch> + '_ {
        let n = self.num_examples();
        (0..self.num_batches()).map(move |i| {
            let start = i * self.batch_size;
            let end = (start + self.batch_size).min(n);
            Batch::new(
                self.features.slice(s![start..end, ..]).to_owned(),
                self.labels.slice(s![start..end]).to_owned(),
            )
        })
    }
}
