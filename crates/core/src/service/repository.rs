//! Persistence of finished runs.
//!
//! Runs are not needed again for correctness once they finish; they are kept
//! for the history listing only. [`JsonRunRepository`] writes one pretty JSON
//! file per run, replacing it atomically through a temporary file.

use ac_protocol::{GenerationRun, RunSummary};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("run {0} is still generating and cannot be stored")]
    Unfinished(Uuid),

    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode run {run_id}: {source}")]
    Encode {
        run_id: Uuid,
        source: serde_json::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// On-disk record of one finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRun {
    pub owner: String,
    /// Epoch milliseconds.
    pub saved_at: i64,
    pub run: GenerationRun,
}

impl StoredRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run.id,
            owner: self.owner.clone(),
            project_name: self.run.project_name.clone(),
            total_tokens_used: self.run.total_tokens_used,
            failed_steps: self.run.failed_step_count(),
            saved_at: self.saved_at,
        }
    }
}

pub trait RunRepository: Send + Sync {
    fn save(&self, owner: &str, run: &GenerationRun) -> Result<RunSummary, RepositoryError>;

    fn load(&self, run_id: Uuid) -> Result<StoredRun, RepositoryError>;

    /// Summaries of all stored runs, newest first.
    fn list(&self) -> Result<Vec<RunSummary>, RepositoryError>;
}

pub struct JsonRunRepository {
    dir: PathBuf,
}

impl JsonRunRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, run_id: Uuid) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    fn read(path: &Path) -> Result<StoredRun, RepositoryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| RepositoryError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl RunRepository for JsonRunRepository {
    fn save(&self, owner: &str, run: &GenerationRun) -> Result<RunSummary, RepositoryError> {
        if run.is_generating {
            return Err(RepositoryError::Unfinished(run.id));
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| RepositoryError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let stored = StoredRun {
            owner: owner.to_string(),
            saved_at: chrono::Utc::now().timestamp_millis(),
            run: run.clone(),
        };
        let json = serde_json::to_vec_pretty(&stored).map_err(|source| RepositoryError::Encode {
            run_id: run.id,
            source,
        })?;

        let io_err = |source| RepositoryError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        file.write_all(&json).map_err(io_err)?;

        let target = self.path_for(run.id);
        file.persist(&target).map_err(|e| RepositoryError::Io {
            path: target.clone(),
            source: e.error,
        })?;

        debug!(run_id = %run.id, path = %target.display(), "run stored");
        Ok(stored.summary())
    }

    fn load(&self, run_id: Uuid) -> Result<StoredRun, RepositoryError> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Err(RepositoryError::NotFound(run_id));
        }
        Self::read(&path)
    }

    fn list(&self) -> Result<Vec<RunSummary>, RepositoryError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| RepositoryError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RepositoryError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(stored) => summaries.push(stored.summary()),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable run file"),
            }
        }

        summaries.sort_by(|a, b| {
            b.saved_at
                .cmp(&a.saved_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_protocol::{GenerationStep, Role, StepStatus};
    use tempfile::tempdir;

    fn finished_run(name: &str) -> GenerationRun {
        let mut run = GenerationRun::new(name, "desc", 10);
        let mut step = GenerationStep::pending(Role::Architect);
        step.status = StepStatus::Failed;
        step.output = Some("Error: x".to_string());
        step.tokens_used = Some(0);
        run.steps.push(step);
        run.generated_code = Some("// Project".to_string());
        run.is_generating = false;
        run
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let repo = JsonRunRepository::new(dir.path().join("runs"));
        let run = finished_run("shop");

        let summary = repo.save("alice", &run).unwrap();
        assert_eq!(summary.run_id, run.id);
        assert_eq!(summary.failed_steps, 1);

        let stored = repo.load(run.id).unwrap();
        assert_eq!(stored.owner, "alice");
        assert_eq!(stored.run, run);
    }

    #[test]
    fn test_unfinished_run_rejected() {
        let dir = tempdir().unwrap();
        let repo = JsonRunRepository::new(dir.path());
        let run = GenerationRun::new("shop", "desc", 10);
        assert!(matches!(
            repo.save("alice", &run),
            Err(RepositoryError::Unfinished(_))
        ));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let repo = JsonRunRepository::new(dir.path().join("nothing-here"));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_foreign_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let repo = JsonRunRepository::new(dir.path());
        repo.save("alice", &finished_run("one")).unwrap();
        repo.save("bob", &finished_run("two")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let summaries = repo.list().unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].saved_at >= summaries[1].saved_at);
    }

    #[test]
    fn test_load_unknown_run() {
        let dir = tempdir().unwrap();
        let repo = JsonRunRepository::new(dir.path());
        assert!(matches!(
            repo.load(Uuid::new_v4()),
            Err(RepositoryError::NotFound(_))
        ));
    }
}
