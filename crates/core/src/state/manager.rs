//! Run manager for coordinating generation runs across owners.
//!
//! The RunManager spawns each run in a background task and keeps a registry
//! of active runs. Every owner (a session or user key) has one store that
//! its runs write into; starting a new run for an owner cancels the owner's
//! previous run, and the run-id guard in the store drops any write the
//! cancelled run still attempts.

use crate::engine::{EngineError, GenerationEngine};
use crate::state::store::{InMemoryRunStore, RunStore};
use ac_protocol::GenerationRun;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

struct RunEntry {
    owner: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<Result<GenerationRun, EngineError>>>,
}

/// Registry view of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub owner: String,
    pub cancelled: bool,
    pub finished: bool,
}

/// Manages all generation runs.
pub struct RunManager {
    engine: Arc<GenerationEngine>,

    /// Registry of runs, indexed by run id.
    runs: Arc<Mutex<HashMap<Uuid, RunEntry>>>,

    /// One observable store per owner.
    stores: Arc<Mutex<HashMap<String, Arc<InMemoryRunStore>>>>,
}

impl RunManager {
    pub fn new(engine: Arc<GenerationEngine>) -> Self {
        Self {
            engine,
            runs: Arc::new(Mutex::new(HashMap::new())),
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The store `owner`'s runs write into, created on first use.
    pub async fn store(&self, owner: &str) -> Arc<InMemoryRunStore> {
        let mut stores = self.stores.lock().await;
        stores
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(InMemoryRunStore::default()))
            .clone()
    }

    /// Validate and start a run for `owner` in the background.
    ///
    /// The run id is returned once the run is registered. Validation and
    /// configuration errors are returned here and leave the owner's current
    /// run untouched.
    ///
    /// The run is published to the owner's store before its task is spawned,
    /// so a superseded run can never replace it there. Finished runs of the
    /// same owner are dropped from the registry; `wait` on them beforehand to
    /// collect their outcome.
    pub async fn start_run(
        &self,
        owner: &str,
        project_name: &str,
        project_description: &str,
    ) -> Result<Uuid, EngineError> {
        let run = self.engine.prepare(project_name, project_description)?;
        let run_id = run.id;
        let store = self.store(owner).await;
        let cancel = CancellationToken::new();

        let mut runs = self.runs.lock().await;
        runs.retain(|id, entry| {
            if entry.owner != owner {
                return true;
            }
            if is_finished(entry) {
                debug!(run_id = %id, owner, "pruning finished run");
                return false;
            }
            if !entry.cancel.is_cancelled() {
                info!(run_id = %id, superseded_by = %run_id, owner, "superseding active run");
                entry.cancel.cancel();
            }
            true
        });

        store.start_run(&run);

        let engine = Arc::clone(&self.engine);
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            engine
                .execute_started(run, store.as_ref() as &dyn RunStore, &task_cancel)
                .await
        });

        runs.insert(
            run_id,
            RunEntry {
                owner: owner.to_string(),
                cancel,
                handle: Some(handle),
            },
        );
        debug!(run_id = %run_id, owner, "run registered");
        Ok(run_id)
    }

    /// Cancel a run if it is still active and drop it from the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not found.
    pub async fn remove_run(&self, run_id: Uuid) -> Result<()> {
        self.cancel_run(run_id).await?;
        self.runs.lock().await.remove(&run_id);
        debug!(run_id = %run_id, "run removed");
        Ok(())
    }

    /// Cancel a run and clear its owner's store if it still shows that run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not found.
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<()> {
        let owner = {
            let runs = self.runs.lock().await;
            let entry = runs
                .get(&run_id)
                .ok_or_else(|| anyhow!("Run {} not found", run_id))?;
            entry.cancel.cancel();
            entry.owner.clone()
        };

        let store = self.store(&owner).await;
        if store.current_run_id() == run_id && store.snapshot().is_generating {
            store.reset();
        }
        info!(run_id = %run_id, owner = %owner, "run cancelled");
        Ok(())
    }

    /// Current state of a run, while it is still its owner's current run.
    pub async fn get_run(&self, run_id: Uuid) -> Option<GenerationRun> {
        let owner = {
            let runs = self.runs.lock().await;
            runs.get(&run_id)?.owner.clone()
        };
        let snapshot = self.store(&owner).await.snapshot();
        (snapshot.id == run_id).then_some(snapshot)
    }

    /// All registered runs.
    pub async fn list_runs(&self) -> Vec<RunInfo> {
        let runs = self.runs.lock().await;
        runs.iter()
            .map(|(id, entry)| RunInfo {
                run_id: *id,
                owner: entry.owner.clone(),
                cancelled: entry.cancel.is_cancelled(),
                finished: is_finished(entry),
            })
            .collect()
    }

    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }

    /// Wait for a run's task and return its outcome. The run is removed from
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not found, was already awaited, or its
    /// task panicked.
    pub async fn wait(&self, run_id: Uuid) -> Result<Result<GenerationRun, EngineError>> {
        let handle = {
            let mut runs = self.runs.lock().await;
            let entry = runs
                .remove(&run_id)
                .ok_or_else(|| anyhow!("Run {} not found", run_id))?;
            entry
                .handle
                .ok_or_else(|| anyhow!("Run {} was already awaited", run_id))?
        };
        handle
            .await
            .map_err(|e| anyhow!("Run {} task failed: {}", run_id, e))
    }
}

fn is_finished(entry: &RunEntry) -> bool {
    entry.handle.as_ref().map_or(true, JoinHandle::is_finished)
}
