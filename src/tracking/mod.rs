//! Experiment tracking
//!
//! A [`Run`] is one tracked training session: initialized with a project
//! name and the run's configuration, fed [`MetricRecord`]s in call order,
//! and finished exactly once. Persistence goes through the pluggable
//! [`TrackingBackend`](storage::TrackingBackend) trait.
//!
//! The run handle is an explicit context object passed through the trainer;
//! there is no process-wide session.
//!
//! # Example
//!
//! ```
//! use ensayar::tracking::storage::InMemoryBackend;
//! use ensayar::{MetricRecord, Run};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryBackend::new();
//! let mut run = Run::init("demo", &serde_json::json!({"lr": 0.001}), backend.clone())?;
//!
//! run.log(MetricRecord::new().with("train/loss", 0.9))?;
//! run.log(MetricRecord::new().with("train/loss", 0.4))?;
//! assert_eq!(run.records_logged(), 2);
//!
//! let id = run.id().to_string();
//! run.finish()?;
//!
//! use ensayar::tracking::storage::TrackingBackend;
//! let saved = backend.load_run(&id)?;
//! assert_eq!(saved.records[1].step, 1);
//! # Ok(())
//! # }
//! ```

pub mod storage;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use storage::{LoggedRecord, RunRecord, TrackingBackend, TrackingStorageError};

/// Status of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is actively recording
    Active,
    /// Run completed and was persisted
    Completed,
    /// Run was abandoned after an error
    Failed,
}

/// Errors from tracking operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("configuration is not serializable: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    #[error("refusing to log an empty metric record")]
    EmptyRecord,

    #[error("storage error: {0}")]
    Storage(#[from] TrackingStorageError),
}

/// A named set of scalar values logged at one point in time
///
/// Keys are free-form strings; the trainer uses `train/loss`, `epoch`,
/// `examples`, `valid/loss`, and `valid/accuracy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(flatten)]
    values: BTreeMap<String, f64>,
}

impl MetricRecord {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Add one value in place
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Number of values in the record
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate keys and values in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A single tracked training session
///
/// Created by [`Run::init`], consumed by [`Run::finish`] or [`Run::fail`].
/// Records accumulate in memory and are written through the backend once at
/// the end of the run.
#[derive(Debug)]
pub struct Run<B: TrackingBackend> {
    record: RunRecord,
    backend: B,
}

impl<B: TrackingBackend> Run<B> {
    /// Start a run under `project`, capturing the configuration verbatim
    pub fn init(
        project: &str,
        config: &impl Serialize,
        backend: B,
    ) -> Result<Self, TrackingError> {
        let config = serde_json::to_value(config).map_err(TrackingError::InvalidConfig)?;
        let start_time_ms = now_ms();
        let run_id = format!("run-{start_time_ms:x}-{:04x}", rand::random::<u16>());

        Ok(Self {
            record: RunRecord {
                run_id,
                project: project.to_string(),
                status: RunStatus::Active,
                config,
                records: Vec::new(),
                start_time_ms,
                end_time_ms: None,
            },
            backend,
        })
    }

    /// Unique identifier of the run
    pub fn id(&self) -> &str {
        &self.record.run_id
    }

    /// Project the run belongs to
    pub fn project(&self) -> &str {
        &self.record.project
    }

    /// Current status; `Active` for as long as the handle exists
    pub fn status(&self) -> RunStatus {
        self.record.status
    }

    /// Number of records logged so far
    pub fn records_logged(&self) -> u64 {
        self.record.records.len() as u64
    }

    /// Records logged so far, in log order
    pub fn records(&self) -> &[LoggedRecord] {
        &self.record.records
    }

    /// Append a metric record
    ///
    /// Call order defines the logged sequence: each record receives the next
    /// step index, starting at 0.
    pub fn log(&mut self, values: MetricRecord) -> Result<(), TrackingError> {
        if values.is_empty() {
            return Err(TrackingError::EmptyRecord);
        }
        let step = self.record.records.len() as u64;
        self.record.records.push(LoggedRecord { step, values });
        Ok(())
    }

    /// Mark the run completed and persist it through the backend
    pub fn finish(self) -> Result<(), TrackingError> {
        self.close(RunStatus::Completed)
    }

    /// Mark the run failed and persist what was logged before the error
    pub fn fail(self) -> Result<(), TrackingError> {
        self.close(RunStatus::Failed)
    }

    fn close(mut self, status: RunStatus) -> Result<(), TrackingError> {
        self.record.status = status;
        self.record.end_time_ms = Some(now_ms());
        self.backend.save_run(&self.record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::storage::{InMemoryBackend, TrackingBackend};
    use super::*;

    #[test]
    fn test_metric_record_builder() {
        let record = MetricRecord::new()
            .with("train/loss", 0.5)
            .with("epoch", 1.0);

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("train/loss"), Some(0.5));
        assert_eq!(record.get("epoch"), Some(1.0));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_metric_record_insert_in_place() {
        let mut record = MetricRecord::new();
        record.insert("train/loss", 0.25);
        record.insert("epoch", 1.0);
        record.insert("train/loss", 0.125);

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("train/loss"), Some(0.125));
        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["epoch", "train/loss"]);
    }

    #[test]
    fn test_metric_record_serializes_flat() {
        let record = MetricRecord::new().with("valid/accuracy", 0.9);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"valid/accuracy":0.9}"#);
    }

    #[test]
    fn test_run_lifecycle() {
        let backend = InMemoryBackend::new();
        let mut run = Run::init("proj", &serde_json::json!({"lr": 0.1}), backend.clone()).unwrap();
        assert_eq!(run.status(), RunStatus::Active);
        assert_eq!(run.project(), "proj");

        run.log(MetricRecord::new().with("loss", 1.0)).unwrap();
        run.log(MetricRecord::new().with("loss", 0.5)).unwrap();
        assert_eq!(run.records_logged(), 2);

        let id = run.id().to_string();
        run.finish().unwrap();

        let saved = backend.load_run(&id).unwrap();
        assert_eq!(saved.status, RunStatus::Completed);
        assert_eq!(saved.records.len(), 2);
        assert!(saved.end_time_ms.is_some());
        assert_eq!(saved.config["lr"], 0.1);
    }

    #[test]
    fn test_log_assigns_sequential_steps() {
        let mut run = Run::init("proj", &(), InMemoryBackend::new()).unwrap();
        for _ in 0..5 {
            run.log(MetricRecord::new().with("v", 0.0)).unwrap();
        }
        let steps: Vec<u64> = run.records().iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_record_is_rejected() {
        let mut run = Run::init("proj", &(), InMemoryBackend::new()).unwrap();
        assert!(matches!(
            run.log(MetricRecord::new()),
            Err(TrackingError::EmptyRecord)
        ));
        assert_eq!(run.records_logged(), 0);
    }

    #[test]
    fn test_fail_persists_partial_history() {
        let backend = InMemoryBackend::new();
        let mut run = Run::init("proj", &(), backend.clone()).unwrap();
        run.log(MetricRecord::new().with("loss", 2.0)).unwrap();

        let id = run.id().to_string();
        run.fail().unwrap();

        let saved = backend.load_run(&id).unwrap();
        assert_eq!(saved.status, RunStatus::Failed);
        assert_eq!(saved.records.len(), 1);
    }

    #[test]
    fn test_unfinished_run_is_not_persisted() {
        let backend = InMemoryBackend::new();
        let id = {
            let run = Run::init("proj", &(), backend.clone()).unwrap();
            run.id().to_string()
        };
        assert!(backend.load_run(&id).is_err());
    }
}
