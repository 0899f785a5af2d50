//! Tracking storage backends
//!
//! Provides the [`TrackingBackend`] trait, a JSON file-based implementation
//! for persisting runs to disk, and a shared in-memory implementation for
//! tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{MetricRecord, RunStatus};

/// Errors from tracking storage operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run not found: {0}")]
    RunNotFound(String),
}

/// Result alias for tracking storage operations
pub type Result<T> = std::result::Result<T, TrackingStorageError>;

/// One metric record with its position in the logged sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedRecord {
    /// Zero-based position in the run's record sequence
    pub step: u64,
    /// The logged values
    pub values: MetricRecord,
}

/// Serializable snapshot of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub project: String,
    pub status: RunStatus,
    /// Configuration captured verbatim at init
    pub config: serde_json::Value,
    /// Every record logged during the run, in log order
    pub records: Vec<LoggedRecord>,
    pub start_time_ms: u64,
    pub end_time_ms: Option<u64>,
}

/// Trait for tracking storage backends
pub trait TrackingBackend {
    /// Save a run snapshot
    fn save_run(&mut self, run: &RunRecord) -> Result<()>;

    /// Load a run by its ID
    fn load_run(&self, run_id: &str) -> Result<RunRecord>;

    /// List all stored runs, ordered by run ID
    fn list_runs(&self) -> Result<Vec<RunRecord>>;

    /// Delete a run by its ID
    fn delete_run(&mut self, run_id: &str) -> Result<()>;
}

/// JSON file-based tracking backend
///
/// Stores each run as `{run_id}.json` in a directory, created on first
/// save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Create a backend rooted at `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl TrackingBackend for JsonFileBackend {
    fn save_run(&mut self, run: &RunRecord) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(run)?;
        fs::write(self.run_path(&run.run_id), json)?;
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Err(TrackingStorageError::RunNotFound(run_id.to_string()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn list_runs(&self) -> Result<Vec<RunRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let json = fs::read_to_string(&path)?;
                runs.push(serde_json::from_str(&json)?);
            }
        }
        runs.sort_by(|a: &RunRecord, b: &RunRecord| a.run_id.cmp(&b.run_id));
        Ok(runs)
    }

    fn delete_run(&mut self, run_id: &str) -> Result<()> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Err(TrackingStorageError::RunNotFound(run_id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

/// In-memory tracking backend for tests
///
/// Clones share one underlying map, so a clone handed to a [`Run`](super::Run)
/// can be inspected after the run consumed its copy. Single-threaded, like
/// the training loop itself.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    runs: Rc<RefCell<BTreeMap<String, RunRecord>>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackingBackend for InMemoryBackend {
    fn save_run(&mut self, run: &RunRecord) -> Result<()> {
        self.runs
            .borrow_mut()
            .insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        self.runs
            .borrow()
            .get(run_id)
            .cloned()
            .ok_or_else(|| TrackingStorageError::RunNotFound(run_id.to_string()))
    }

    fn list_runs(&self) -> Result<Vec<RunRecord>> {
        Ok(self.runs.borrow().values().cloned().collect())
    }

    fn delete_run(&mut self, run_id: &str) -> Result<()> {
        self.runs
            .borrow_mut()
            .remove(run_id)
            .map(|_| ())
            .ok_or_else(|| TrackingStorageError::RunNotFound(run_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run(id: &str) -> RunRecord {
        RunRecord {
            run_id: id.to_string(),
            project: "test".to_string(),
            status: RunStatus::Completed,
            config: serde_json::json!({"batch_size": 32}),
            records: vec![LoggedRecord {
                step: 0,
                values: MetricRecord::new().with("train/loss", 1.5),
            }],
            start_time_ms: 1_000,
            end_time_ms: Some(2_000),
        }
    }

    #[test]
    fn test_json_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path());

        let run = sample_run("run-1");
        backend.save_run(&run).unwrap();

        let loaded = backend.load_run("run-1").unwrap();
        assert_eq!(loaded, run);
    }

    #[test]
    fn test_json_backend_list_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path());
        backend.save_run(&sample_run("run-b")).unwrap();
        backend.save_run(&sample_run("run-a")).unwrap();

        let ids: Vec<String> = backend
            .list_runs()
            .unwrap()
            .into_iter()
            .map(|r| r.run_id)
            .collect();
        assert_eq!(ids, vec!["run-a", "run-b"]);
    }

    #[test]
    fn test_json_backend_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path());
        backend.save_run(&sample_run("run-1")).unwrap();

        backend.delete_run("run-1").unwrap();
        assert!(matches!(
            backend.load_run("run-1"),
            Err(TrackingStorageError::RunNotFound(_))
        ));
        assert!(matches!(
            backend.delete_run("run-1"),
            Err(TrackingStorageError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_json_backend_list_missing_dir_is_empty() {
        let backend = JsonFileBackend::new("/nonexistent/runs");
        assert!(backend.list_runs().unwrap().is_empty());
    }

    #[test]
    fn test_in_memory_clones_share_state() {
        let mut a = InMemoryBackend::new();
        let b = a.clone();

        a.save_run(&sample_run("run-1")).unwrap();
        assert!(b.load_run("run-1").is_ok());
        assert_eq!(b.list_runs().unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_missing_run() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.load_run("nope"),
            Err(TrackingStorageError::RunNotFound(_))
        ));
    }
}
