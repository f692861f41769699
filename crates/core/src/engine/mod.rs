//! Step sequencer.
//!
//! The GenerationEngine runs one generation run: it invokes the generation
//! client once per role in [`Role::ALL`] order, records each step's
//! transitions in a [`RunStore`], and assembles the final artifact.
//!
//! Per-step failures are contained. A failed role is recorded and the next
//! role still runs, so every run ends with all five steps terminal. Only
//! validation, configuration and cancellation stop a run.

use crate::generation::prompts::role_task;
use crate::generation::tokens::{estimate_run_tokens, ESTIMATE_MULTIPLIER};
use crate::generation::{GenerationClient, GenerationError};
use crate::state::step::{apply_update, TransitionError};
use crate::state::store::RunStore;
use ac_protocol::{GenerationRun, GenerationStep, Role, StepStatus, StepUpdate};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that stop a run. Per-step generation failures are not among them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Empty project name or description; no run was created.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Backends are missing credentials or URLs; no run was created.
    #[error("{0}")]
    Configuration(GenerationError),

    /// The run was abandoned; the store was left as it was.
    /// `tokens_used` covers the steps finished before the token fired.
    #[error("generation cancelled")]
    Cancelled { tokens_used: u64 },

    #[error("inconsistent step state: {0}")]
    Transition(#[from] TransitionError),
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The main generation engine.
pub struct GenerationEngine {
    client: Arc<GenerationClient>,
    estimate_multiplier: u64,
}

impl GenerationEngine {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self {
            client,
            estimate_multiplier: ESTIMATE_MULTIPLIER,
        }
    }

    pub fn with_estimate_multiplier(mut self, multiplier: u64) -> Self {
        self.estimate_multiplier = multiplier;
        self
    }

    pub fn client(&self) -> &Arc<GenerationClient> {
        &self.client
    }

    /// Validate the request and build the run without touching any store.
    ///
    /// The returned run carries its id, so callers can register it before
    /// execution starts.
    pub fn prepare(
        &self,
        project_name: &str,
        project_description: &str,
    ) -> Result<GenerationRun, EngineError> {
        let project_name = project_name.trim();
        let project_description = project_description.trim();

        if project_name.is_empty() {
            return Err(EngineError::Validation(
                "projectName must not be empty".to_string(),
            ));
        }
        if project_description.is_empty() {
            return Err(EngineError::Validation(
                "projectDescription must not be empty".to_string(),
            ));
        }

        self.client
            .ensure_configured()
            .map_err(EngineError::Configuration)?;

        let estimated = estimate_run_tokens(project_description, self.estimate_multiplier);
        Ok(GenerationRun::new(
            project_name,
            project_description,
            estimated,
        ))
    }

    /// Publish a prepared run to `store` and execute it to completion.
    ///
    /// Returns the finished run. A token cancelled before the call leaves the
    /// store untouched; later cancellation keeps whatever was written before
    /// the token fired.
    pub async fn execute(
        &self,
        run: GenerationRun,
        store: &dyn RunStore,
        cancel: &CancellationToken,
    ) -> Result<GenerationRun, EngineError> {
        if cancel.is_cancelled() {
            info!(run_id = %run.id, "run cancelled before start");
            return Err(EngineError::Cancelled { tokens_used: 0 });
        }
        store.start_run(&run);
        self.execute_started(run, store, cancel).await
    }

    /// Execute a run the caller already published with
    /// [`RunStore::start_run`].
    pub async fn execute_started(
        &self,
        mut run: GenerationRun,
        store: &dyn RunStore,
        cancel: &CancellationToken,
    ) -> Result<GenerationRun, EngineError> {
        let run_id = run.id;
        run.is_generating = true;
        info!(
            run_id = %run_id,
            project = %run.project_name,
            estimated_tokens = run.estimated_tokens,
            "generation run started"
        );

        let context = format!(
            "Project: {}\nDescription: {}",
            run.project_name, run.project_description
        );

        for role in Role::ALL {
            if cancel.is_cancelled() {
                info!(run_id = %run_id, role = %role, "run cancelled before step");
                return Err(EngineError::Cancelled {
                    tokens_used: run.step_token_sum(),
                });
            }

            let step = GenerationStep::pending(role);
            let step_id = step.id;
            run.steps.push(step.clone());
            store.append_step(run_id, step);

            let started = StepUpdate::started(now_millis());
            Self::record(&mut run, step_id, &started)?;
            store.update_step(run_id, step_id, &started);
            debug!(run_id = %run_id, role = %role, "step started");

            let previous = run.completed_outputs();
            let task = role_task(role, &run.project_name);
            let result = self
                .client
                .generate(role, &task, Some(&context), &previous, cancel)
                .await;

            let finished = match result {
                Ok(generation) => {
                    debug!(
                        run_id = %run_id,
                        role = %role,
                        backend = %generation.backend,
                        tokens_used = generation.tokens_used,
                        "step completed"
                    );
                    StepUpdate::completed(generation.text, generation.tokens_used, now_millis())
                }
                Err(GenerationError::Cancelled) => {
                    info!(run_id = %run_id, role = %role, "run cancelled during step");
                    return Err(EngineError::Cancelled {
                        tokens_used: run.step_token_sum(),
                    });
                }
                Err(e) => {
                    warn!(run_id = %run_id, role = %role, reason = e.reason(), error = %e, "step failed");
                    StepUpdate::failed(e.to_string(), now_millis())
                }
            };

            Self::record(&mut run, step_id, &finished)?;
            store.update_step(run_id, step_id, &finished);
            run.total_tokens_used = run.step_token_sum();
        }

        let code = assemble_generated_code(&run);
        run.generated_code = Some(code.clone());
        run.is_generating = false;
        store.finish(run_id, code);

        info!(
            run_id = %run_id,
            total_tokens_used = run.total_tokens_used,
            failed_steps = run.failed_step_count(),
            "generation run finished"
        );
        Ok(run)
    }

    /// [`Self::prepare`] followed by [`Self::execute`].
    pub async fn run(
        &self,
        project_name: &str,
        project_description: &str,
        store: &dyn RunStore,
        cancel: &CancellationToken,
    ) -> Result<GenerationRun, EngineError> {
        let run = self.prepare(project_name, project_description)?;
        self.execute(run, store, cancel).await
    }

    fn record(
        run: &mut GenerationRun,
        step_id: uuid::Uuid,
        update: &StepUpdate,
    ) -> Result<(), EngineError> {
        let step = run.step_mut(step_id).ok_or(TransitionError::Illegal {
            from: StepStatus::Pending,
            to: update.status.unwrap_or(StepStatus::Pending),
        })?;
        apply_update(step, update)?;
        Ok(())
    }
}

/// Concatenate every step's output under a header with the run metadata.
///
/// Failed steps contribute their error text, marked `[FAILED]`.
pub fn assemble_generated_code(run: &GenerationRun) -> String {
    let mut code = String::new();
    let _ = writeln!(code, "// Project: {}", run.project_name);
    for (i, line) in run.project_description.lines().enumerate() {
        if i == 0 {
            let _ = writeln!(code, "// Description: {line}");
        } else {
            let _ = writeln!(code, "//   {line}");
        }
    }
    let _ = writeln!(code, "// Total tokens used: {}", run.total_tokens_used);

    for step in &run.steps {
        let marker = if step.status == StepStatus::Failed {
            " [FAILED]"
        } else {
            ""
        };
        let _ = write!(
            code,
            "\n// ===== {} ({}){} =====\n{}\n",
            step.name,
            step.role,
            marker,
            step.output.as_deref().unwrap_or("").trim_end()
        );
    }

    code
}
