//! Data provider: in-memory datasets and batching loaders
//!
//! The training loop consumes two batch streams (train and validation). This
//! module produces them: [`get_dataloaders`] reads an IDX dataset directory,
//! slices off `slice_size` examples, shuffles once with a fixed seed, and
//! splits by `valid_fraction`. [`synthetic_classification`] builds a seeded
//! in-memory dataset for demos and tests.

pub mod idx;
mod loader;
mod synthetic;

pub use loader::{Batch, DataLoader};
pub use synthetic::synthetic_classification;

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seed used for the split shuffle when the caller does not supply one
const DEFAULT_SPLIT_SEED: u64 = 42;

/// Errors from dataset loading and splitting
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset file not found: {0}")]
    MissingFile(PathBuf),

    #[error("bad IDX magic in {path}: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("malformed IDX payload in {0}")]
    Malformed(PathBuf),

    #[error("image count {images} does not match label count {labels}")]
    LengthMismatch { images: usize, labels: usize },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("split of {slice} examples at fraction {fraction} leaves an empty partition")]
    DegenerateSplit { slice: usize, fraction: f32 },
}

/// An in-memory classification dataset
///
/// Rows of `features` are flattened examples; `labels` holds one class index
/// per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Array1<usize>,
}

impl Dataset {
    /// Build a dataset, checking that features and labels agree in length
    pub fn new(features: Array2<f32>, labels: Array1<usize>) -> Result<Self, DataError> {
        if features.nrows() != labels.len() {
            return Err(DataError::LengthMismatch {
                images: features.nrows(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    /// Read a dataset from an IDX directory (Fashion-MNIST file layout)
    pub fn from_idx_dir(dir: &Path) -> Result<Self, DataError> {
        let features = idx::read_images(&dir.join("train-images-idx3-ubyte"))?;
        let labels = idx::read_labels(&dir.join("train-labels-idx1-ubyte"))?;
        Self::new(features, labels)
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset holds no examples
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Width of a flattened example
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Highest class index plus one
    pub fn n_classes(&self) -> usize {
        self.labels.iter().max().map_or(0, |&m| m + 1)
    }

    /// Slice, shuffle, and split into (train, validation) loaders
    ///
    /// Takes the first `slice_size` examples (clamped to the dataset length),
    /// shuffles them once with `seed`, and assigns
    /// `round(slice * valid_fraction)` examples to validation. The loaders
    /// iterate in fixed order afterwards, so repeated passes see the same
    /// batch sequence.
    pub fn split(
        &self,
        batch_size: usize,
        slice_size: usize,
        valid_fraction: f32,
        seed: u64,
    ) -> Result<(DataLoader, DataLoader), DataError> {
        if self.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        if batch_size == 0 {
            return Err(DataError::ZeroBatchSize);
        }

        let slice = slice_size.min(self.len());
        let n_valid = (slice as f32 * valid_fraction).round() as usize;
        if n_valid == 0 || n_valid >= slice {
            return Err(DataError::DegenerateSplit {
                slice,
                fraction: valid_fraction,
            });
        }

        let mut indices: Vec<usize> = (0..slice).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        let (valid_idx, train_idx) = indices.split_at(n_valid);

        let take = |idx: &[usize]| {
            (
                self.features.select(Axis(0), idx),
                self.labels.select(Axis(0), idx),
            )
        };
        let (train_x, train_y) = take(train_idx);
        let (valid_x, valid_y) = take(valid_idx);

        Ok((
            DataLoader::new(train_x, train_y, batch_size),
            DataLoader::new(valid_x, valid_y, batch_size),
        ))
    }
}

/// Load an IDX dataset directory and split it into batch streams
///
/// Returns `(train loader, validation loader)`. The shuffle that precedes the
/// split uses a fixed seed, so two calls with the same arguments yield the
/// same partitions in the same order.
pub fn get_dataloaders(
    data_dir: &Path,
    batch_size: usize,
    slice_size: usize,
    valid_fraction: f32,
) -> Result<(DataLoader, DataLoader), DataError> {
    let dataset = Dataset::from_idx_dir(data_dir)?;
    dataset.split(batch_size, slice_size, valid_fraction, DEFAULT_SPLIT_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tiny_dataset(n: usize) -> Dataset {
        let features = Array2::from_shape_fn((n, 4), |(i, j)| (i * 4 + j) as f32);
        let labels = Array1::from_shape_fn(n, |i| i % 3);
        Dataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_dataset_rejects_length_mismatch() {
        let features = array![[1.0, 2.0], [3.0, 4.0]];
        let labels = Array1::from(vec![0usize]);
        assert!(matches!(
            Dataset::new(features, labels),
            Err(DataError::LengthMismatch { images: 2, labels: 1 })
        ));
    }

    #[test]
    fn test_n_classes_from_labels() {
        let ds = tiny_dataset(9);
        assert_eq!(ds.n_classes(), 3);
        assert_eq!(ds.n_features(), 4);
        assert_eq!(ds.len(), 9);
    }

    #[test]
    fn test_split_partition_sizes() {
        let ds = tiny_dataset(100);
        let (train, valid) = ds.split(10, 100, 0.2, 0).unwrap();
        assert_eq!(train.num_examples(), 80);
        assert_eq!(valid.num_examples(), 20);
        assert_eq!(train.num_batches(), 8);
        assert_eq!(valid.num_batches(), 2);
    }

    #[test]
    fn test_split_rounds_valid_count() {
        // 50 * 0.25 = 12.5 -> 13 validation examples
        let ds = tiny_dataset(60);
        let (train, valid) = ds.split(8, 50, 0.25, 0).unwrap();
        assert_eq!(valid.num_examples(), 13);
        assert_eq!(train.num_examples(), 37);
    }

    #[test]
    fn test_split_clamps_slice_to_dataset() {
        let ds = tiny_dataset(40);
        let (train, valid) = ds.split(8, 1000, 0.25, 0).unwrap();
        assert_eq!(train.num_examples() + valid.num_examples(), 40);
    }

    #[test]
    fn test_split_is_deterministic() {
        let ds = tiny_dataset(50);
        let (a_train, _) = ds.split(8, 50, 0.2, 7).unwrap();
        let (b_train, _) = ds.split(8, 50, 0.2, 7).unwrap();

        let a: Vec<Batch> = a_train.iter().collect();
        let b: Vec<Batch> = b_train.iter().collect();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.inputs, y.inputs);
            assert_eq!(x.labels, y.labels);
        }
    }

    #[test]
    fn test_split_differs_across_seeds() {
        let ds = tiny_dataset(50);
        let (a_train, _) = ds.split(50, 50, 0.2, 1).unwrap();
        let (b_train, _) = ds.split(50, 50, 0.2, 2).unwrap();

        let a = a_train.iter().next().unwrap();
        let b = b_train.iter().next().unwrap();
        assert_ne!(a.labels, b.labels);
    }

    #[test]
    fn test_split_rejects_degenerate_fraction() {
        let ds = tiny_dataset(10);
        // round(10 * 0.01) == 0 validation examples
        assert!(matches!(
            ds.split(2, 10, 0.01, 0),
            Err(DataError::DegenerateSplit { .. })
        ));
    }

    #[test]
    fn test_split_rejects_zero_batch_size() {
        let ds = tiny_dataset(10);
        assert!(matches!(ds.split(0, 10, 0.2, 0), Err(DataError::ZeroBatchSize)));
    }

    #[test]
    fn test_get_dataloaders_missing_dir() {
        let err = get_dataloaders(Path::new("/nonexistent"), 8, 100, 0.2);
        assert!(matches!(err, Err(DataError::MissingFile(_))));
    }
}
